//! raw/log — LogStore: append-only лог пар ключ/значение в <dataDir>/data/application.log.
//!
//! Формат файла: [MAGIC8 "SDLOG001"][ver u32 = 1][reserved u32] + последовательность кадров
//! (см. record.rs). Открытие = replay всех кадров в in-memory индекс (last write wins,
//! DELETE удаляет ключ). Частичный хвост игнорируется; RW-открытие обрезает его.
//!
//! Режимы:
//! - open_ro: shared-лок на файле лога, mmap, replay. Ничего не создаёт и не пишет.
//! - open_rw: exclusive-лок, создаёт файл при отсутствии, дописывает в конец.

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::consts::{
    LOG_FILE, LOG_FORMAT_VERSION, LOG_HDR_SIZE, LOG_MAGIC, LOG_REC_DELETE, LOG_REC_PUT,
};
use crate::lock::{try_lock_file, LockGuard, LockMode};
use crate::metrics::{record_raw_records_replayed, record_raw_tail_skipped};

use super::record::{read_next_record, write_record};
use super::{RawStore, RawStoreMut};

pub struct LogStore {
    path: PathBuf,
    index: HashMap<Vec<u8>, Vec<u8>>,
    lock: LockGuard,
    readonly: bool,
    /// Позиция конца последней валидной записи (точка дописывания).
    end: u64,
}

impl LogStore {
    #[inline]
    pub fn log_path(data_dir: &Path) -> PathBuf {
        data_dir.join(LOG_FILE)
    }

    /// Открыть существующий лог только на чтение.
    pub fn open_ro(data_dir: &Path) -> Result<Self> {
        let path = Self::log_path(data_dir);
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("open raw log {}", path.display()))?;
        let lock = try_lock_file(file, &path, LockMode::Shared)?;

        let len = lock.file().metadata()?.len();
        if len < LOG_HDR_SIZE as u64 {
            return Err(anyhow!(
                "raw log too short ({} B, header is {} B): {}",
                len,
                LOG_HDR_SIZE,
                path.display()
            ));
        }

        let mmap = unsafe {
            Mmap::map(lock.file()).map_err(|e| anyhow!("raw log mmap {}: {}", path.display(), e))?
        };
        check_header(&mmap, &path)?;
        let (index, end) = replay(&mmap, &path)?;
        drop(mmap);

        debug!(
            "raw log opened read-only: {} ({} keys, {} B)",
            path.display(),
            index.len(),
            end
        );

        Ok(Self {
            path,
            index,
            lock,
            readonly: true,
            end: end as u64,
        })
    }

    /// Открыть (или создать) лог на запись. Каталог создаётся при необходимости.
    pub fn open_rw(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("create data dir {}", data_dir.display()))?;
        let path = Self::log_path(data_dir);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("open raw log {}", path.display()))?;
        let mut lock = try_lock_file(file, &path, LockMode::Exclusive)?;

        let len = lock.file().metadata()?.len();
        if len == 0 {
            let f = lock.file_mut();
            write_file_header(f)?;
            f.sync_all()?;
            return Ok(Self {
                path,
                index: HashMap::new(),
                lock,
                readonly: false,
                end: LOG_HDR_SIZE as u64,
            });
        }

        let mut buf = Vec::with_capacity(len as usize);
        {
            let f = lock.file_mut();
            f.seek(SeekFrom::Start(0))?;
            f.read_to_end(&mut buf)?;
        }
        check_header(&buf, &path)?;
        let (index, end) = replay(&buf, &path)?;

        // Частичный хвост от прерванной записи — обрезаем, чтобы дописывать с валидной границы.
        if (end as u64) < len {
            warn!(
                "raw log {}: truncating partial tail ({} B)",
                path.display(),
                len - end as u64
            );
            lock.file().set_len(end as u64)?;
        }

        Ok(Self {
            path,
            index,
            lock,
            readonly: false,
            end: end as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Размер валидной части файла лога в байтах.
    pub fn log_bytes(&self) -> u64 {
        self.end
    }

    pub fn sync(&mut self) -> Result<()> {
        if self.readonly {
            return Ok(());
        }
        self.lock.file_mut().sync_all()?;
        Ok(())
    }

    /// Явное закрытие: для writer’а — fsync, затем снятие лока.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    fn append(&mut self, rec_type: u8, key: &[u8], value: &[u8]) -> Result<()> {
        if self.readonly {
            return Err(anyhow!("raw log {} is opened read-only", self.path.display()));
        }
        let end = self.end;
        let f = self.lock.file_mut();
        f.seek(SeekFrom::Start(end))?;
        let n = write_record(f, rec_type, key, value)?;
        self.end += n;
        Ok(())
    }
}

impl RawStore for LogStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.index.get(key).cloned())
    }

    fn scan_stream<F>(&self, prefix: Option<&[u8]>, mut cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]),
    {
        match prefix {
            None => {
                for (k, v) in &self.index {
                    cb(k, v);
                }
            }
            Some(pref) => {
                for (k, v) in &self.index {
                    if k.starts_with(pref) {
                        cb(k, v);
                    }
                }
            }
        }
        Ok(())
    }
}

impl RawStoreMut for LogStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(LOG_REC_PUT, key, value)?;
        self.index.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        if !self.index.contains_key(key) {
            return Ok(());
        }
        self.append(LOG_REC_DELETE, key, &[])?;
        self.index.remove(key);
        Ok(())
    }
}

// ---------- helpers ----------

fn write_file_header<W: Write>(w: &mut W) -> Result<()> {
    let mut hdr = [0u8; LOG_HDR_SIZE];
    hdr[..8].copy_from_slice(LOG_MAGIC);
    LittleEndian::write_u32(&mut hdr[8..12], LOG_FORMAT_VERSION);
    LittleEndian::write_u32(&mut hdr[12..16], 0);
    w.write_all(&hdr)?;
    Ok(())
}

fn check_header(buf: &[u8], path: &Path) -> Result<()> {
    if buf.len() < LOG_HDR_SIZE || &buf[..8] != LOG_MAGIC {
        return Err(anyhow!("bad raw log magic at {}", path.display()));
    }
    let ver = LittleEndian::read_u32(&buf[8..12]);
    if ver != LOG_FORMAT_VERSION {
        return Err(anyhow!(
            "unsupported raw log version {} at {} (expected {})",
            ver,
            path.display(),
            LOG_FORMAT_VERSION
        ));
    }
    Ok(())
}

/// Проиграть все кадры после заголовка. Возвращает индекс и позицию конца валидной части.
fn replay(buf: &[u8], path: &Path) -> Result<(HashMap<Vec<u8>, Vec<u8>>, usize)> {
    let mut index: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    let mut pos = LOG_HDR_SIZE;
    let mut records = 0u64;

    while let Some((rec, next)) =
        read_next_record(buf, pos).with_context(|| format!("replay raw log {}", path.display()))?
    {
        if rec.is_delete() {
            index.remove(rec.key);
        } else {
            index.insert(rec.key.to_vec(), rec.value.to_vec());
        }
        records += 1;
        pos = next;
    }

    record_raw_records_replayed(records);
    if pos < buf.len() {
        record_raw_tail_skipped((buf.len() - pos) as u64);
        debug!(
            "raw log {}: ignoring partial tail of {} B",
            path.display(),
            buf.len() - pos
        );
    }
    Ok((index, pos))
}
