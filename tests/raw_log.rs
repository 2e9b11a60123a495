// tests/raw_log.rs
//
// Raw log на диске:
// - частичный хвост игнорируется RO-открытием и обрезается RW-открытием;
// - CRC mismatch в середине лога — ошибка открытия;
// - shared-лок читателя и exclusive-лок writer’а взаимно исключают друг друга;
// - занятый writer’ом store даёт StoreOpenFailure в конвейере дампа.
//
// Запуск:
//   cargo test --test raw_log -- --nocapture

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use StoreDump::cli::exec;
use StoreDump::consts::{LOG_HDR_SIZE, LOG_REC_HDR_SIZE};
use StoreDump::raw::RawStoreMut;
use StoreDump::{DumpConfig, DumpError, LogStore, RawStore, StoreWriter};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("sdtest-raw-{prefix}-{pid}-{t}-{id}"))
}

fn data_dir(root: &PathBuf) -> PathBuf {
    root.join("data")
}

// ---------- tests ----------

#[test]
fn partial_tail_is_ignored_then_truncated() -> Result<()> {
    let root = unique_root("tail");
    {
        let mut log = LogStore::open_rw(&data_dir(&root))?;
        log.put(b"k1", b"v1")?;
        log.put(b"k2", b"v2")?;
        log.delete(b"k1")?;
        log.close()?;
    }
    let log_path = LogStore::log_path(&data_dir(&root));
    let clean_len = fs::metadata(&log_path)?.len();

    // Оборванный заголовок следующей записи.
    {
        let mut f = OpenOptions::new().append(true).open(&log_path)?;
        f.write_all(&[1, 0, 0, 0, 9, 0])?;
        f.sync_all()?;
    }

    {
        let ro = LogStore::open_ro(&data_dir(&root))?;
        assert!(ro.is_readonly());
        assert_eq!(ro.get(b"k1")?, None);
        assert_eq!(ro.get(b"k2")?, Some(b"v2".to_vec()));
        assert_eq!(ro.log_bytes(), clean_len);
    }
    // RO ничего не трогает на диске
    assert_eq!(fs::metadata(&log_path)?.len(), clean_len + 6);

    {
        let mut rw = LogStore::open_rw(&data_dir(&root))?;
        assert_eq!(fs::metadata(&log_path)?.len(), clean_len);
        rw.put(b"k3", b"v3")?;
        rw.close()?;
    }
    let ro = LogStore::open_ro(&data_dir(&root))?;
    assert_eq!(ro.len(), 2);
    assert_eq!(ro.get(b"k3")?, Some(b"v3".to_vec()));

    drop(ro);
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn crc_corruption_is_detected() -> Result<()> {
    let root = unique_root("crc");
    {
        let mut log = LogStore::open_rw(&data_dir(&root))?;
        log.put(b"key", b"value")?;
        log.put(b"other", b"x")?;
        log.close()?;
    }
    let log_path = LogStore::log_path(&data_dir(&root));
    let mut bytes = fs::read(&log_path)?;
    // первый байт значения первой записи
    let off = LOG_HDR_SIZE + LOG_REC_HDR_SIZE + b"key".len();
    bytes[off] ^= 0xFF;
    fs::write(&log_path, &bytes)?;

    let err = LogStore::open_ro(&data_dir(&root)).err().expect("corrupt log must not open");
    assert!(format!("{:#}", err).contains("CRC mismatch"), "got: {:#}", err);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn bad_magic_is_rejected() -> Result<()> {
    let root = unique_root("magic");
    fs::create_dir_all(data_dir(&root))?;
    fs::write(
        LogStore::log_path(&data_dir(&root)),
        b"NOTALOG!\x01\x00\x00\x00\x00\x00\x00\x00",
    )?;
    assert!(LogStore::open_ro(&data_dir(&root)).is_err());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn reader_and_writer_locks_conflict() -> Result<()> {
    let root = unique_root("locks");
    {
        let mut w = StoreWriter::create(&root)?;
        w.mount("bank")?;
        w.set("bank", b"a", b"1")?;
        w.commit()?;
        w.close()?;
    }

    {
        let _r1 = LogStore::open_ro(&data_dir(&root))?;
        // несколько читателей допустимы
        let _r2 = LogStore::open_ro(&data_dir(&root))?;
        assert!(
            LogStore::open_rw(&data_dir(&root)).is_err(),
            "writer must not lock while readers hold the log"
        );
    }

    let writer = LogStore::open_rw(&data_dir(&root))?;
    assert!(LogStore::open_ro(&data_dir(&root)).is_err());

    let mut out = Vec::new();
    let err = exec(&root, None, &DumpConfig::default(), &mut out)
        .expect_err("dump must fail while a writer holds the store");
    assert!(matches!(
        err.downcast_ref::<DumpError>(),
        Some(DumpError::StoreOpenFailure { .. })
    ));
    assert!(out.is_empty());

    writer.close()?;
    assert!(LogStore::open_ro(&data_dir(&root)).is_ok());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn missing_log_file_is_open_failure() -> Result<()> {
    let root = unique_root("no-log");
    fs::create_dir_all(data_dir(&root))?;

    let mut out = Vec::new();
    let err = exec(&root, None, &DumpConfig::default(), &mut out).expect_err("no log file");
    assert!(matches!(
        err.downcast_ref::<DumpError>(),
        Some(DumpError::StoreOpenFailure { .. })
    ));
    // RO-открытие ничего не создаёт
    assert!(!LogStore::log_path(&data_dir(&root)).exists());

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
