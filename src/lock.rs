//! File-based advisory locking for the raw log (fs2).
//!
//! - Shared: read-only openers (dump). Many may coexist.
//! - Exclusive: the single writer (fixtures::StoreWriter).
//!
//! Лок берётся на сам файл лога, а не на отдельный LOCK-файл: read-only
//! открытие не должно создавать новых файлов в каталоге данных.
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    /// Хэндл залоченного файла (для чтения/mmap/записи под локом).
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Try to lock an already opened file. Returns Err if a conflicting lock is held,
/// never blocks: a dump must not hang behind a live writer.
pub fn try_lock_file(file: File, path: &Path, mode: LockMode) -> Result<LockGuard> {
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(&file)
            .with_context(|| format!("try_lock_shared failed: {}", path.display()))?,
        LockMode::Exclusive => FileExt::try_lock_exclusive(&file)
            .with_context(|| format!("try_lock_exclusive failed: {}", path.display()))?,
    }
    Ok(LockGuard { file })
}
