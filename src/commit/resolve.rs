//! commit/resolve — разрешение целевой версии в декодированный и проиндексированный CommitInfo.

use log::{debug, warn};

use crate::error::{DumpError, Result};
use crate::raw::RawStore;

use super::{commit_key, decode_latest, latest_key, CommitIndex, CommitInfo};

/// Результат разрешения: целевая версия, запись как есть и индекс по модулям.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub target: u64,
    pub info: CommitInfo,
    pub index: CommitIndex,
}

impl ResolvedCommit {
    /// Модули, объявленные записью, в сортированном порядке.
    pub fn module_names(&self) -> Vec<String> {
        self.index.names()
    }
}

/// Прочитать s/latest.
///
/// Ok(None) — маркера нет, либо он не декодируется (с предупреждением): вызывающий код
/// переходит на запасной источник latest-версии.
pub fn read_latest_marker<S: RawStore>(store: &S) -> Result<Option<u64>> {
    let Some(raw) = store.get(latest_key())? else {
        debug!("latest-version marker is absent");
        return Ok(None);
    };
    match decode_latest(&raw) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("latest-version marker is not decodable ({}), ignoring it", e);
            Ok(None)
        }
    }
}

/// Найти и декодировать запись коммита для версии `target`.
pub fn resolve_commit<S: RawStore>(store: &S, target: u64) -> Result<ResolvedCommit> {
    let raw = store
        .get(&commit_key(target))?
        .ok_or(DumpError::VersionNotFound(target))?;

    let info = CommitInfo::decode(&raw).map_err(|e| DumpError::CorruptCommitRecord {
        version: target,
        reason: e.to_string(),
    })?;

    // Запись под ключом s/<V> обязана описывать версию V.
    if info.version != target {
        return Err(DumpError::CorruptCommitRecord {
            version: target,
            reason: format!("record declares version {}", info.version),
        });
    }

    let index = info
        .index()
        .map_err(|module| DumpError::DuplicateModuleInCommit {
            version: target,
            module,
        })?;

    debug!(
        "resolved commit record for version {}: {} module(s)",
        target,
        index.len()
    );
    Ok(ResolvedCommit {
        target,
        info,
        index,
    })
}
