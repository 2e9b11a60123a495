// tests/versioned_history.rs
//
// Случайная история записей (oorandom) по нескольким модулям и версиям.
// Для каждой версии V проверяем:
// - дамп V содержит ровно записи модели на V (поздние set/delete невидимы);
// - scan- и index-обнаружение дают одинаковый набор модулей;
// - повторное разрешение той же версии даёт идентичный результат.
//
// Запуск:
//   cargo test --test versioned_history -- --nocapture

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use oorandom::Rand32;

use StoreDump::commit::resolve_commit;
use StoreDump::discover::{scan_modules, Discovery};
use StoreDump::tree::Entry;
use StoreDump::{inspect, DiscoveryMode, DumpConfig, LogStore, StoreWriter};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("sdtest-hist-{prefix}-{pid}-{t}-{id}"))
}

type Model = BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

const MODULES: [&str; 3] = ["acc", "bank", "gov"];
const VERSIONS: u64 = 12;

fn random_key(rng: &mut Rand32) -> Vec<u8> {
    // часть ключей с непечатаемыми байтами
    let len = 1 + rng.rand_range(0..6) as usize;
    (0..len)
        .map(|_| {
            if rng.rand_range(0..5) == 0 {
                rng.rand_range(0..32) as u8
            } else {
                b'a' + rng.rand_range(0..8) as u8
            }
        })
        .collect()
}

/// Построить store и вернуть модель содержимого на каждой версии.
fn build_history(root: &PathBuf, seed: u64) -> Result<BTreeMap<u64, Model>> {
    let mut rng = Rand32::new(seed);
    let mut w = StoreWriter::create(root)?;
    let mut live: Model = BTreeMap::new();
    let mut history = BTreeMap::new();

    for m in MODULES {
        w.mount(m)?;
        live.insert(m.to_string(), BTreeMap::new());
    }

    for _ in 0..VERSIONS {
        let ops = rng.rand_range(1..20);
        for _ in 0..ops {
            let m = MODULES[rng.rand_range(0..MODULES.len() as u32) as usize];
            let key = random_key(&mut rng);
            let model = live.get_mut(m).expect("mounted");
            if rng.rand_range(0..4) == 0 {
                w.delete(m, &key)?;
                model.remove(&key);
            } else {
                let val: Vec<u8> = (0..rng.rand_range(0..8)).map(|_| rng.rand_u32() as u8).collect();
                w.set(m, &key, &val)?;
                model.insert(key, val);
            }
        }
        let v = w.commit()?;
        history.insert(v, live.clone());
    }
    w.close()?;
    Ok(history)
}

// ---------- tests ----------

#[test]
fn every_version_dumps_exactly_its_model() -> Result<()> {
    let root = unique_root("model");
    let history = build_history(&root, 0x5EED_0001)?;
    let store = LogStore::open_ro(&root.join("data"))?;
    let cfg = DumpConfig::default();

    for (v, model) in &history {
        let report = inspect(&store, Some(*v), &cfg)?;
        assert_eq!(report.target, *v);
        assert_eq!(report.latest, VERSIONS);
        assert!(report.assembly.skipped.is_empty());

        for (m, expected) in model {
            let snap = report
                .assembly
                .get(m)
                .unwrap_or_else(|| panic!("module {m} missing at v{v}"));
            let got: BTreeMap<Vec<u8>, Vec<u8>> = snap
                .view
                .iter()
                .map(|e| (e.key.clone(), e.value.clone()))
                .collect();
            assert_eq!(&got, expected, "module {m} at version {v}");

            // порядок обхода — по возрастанию ключа
            let keys: Vec<&Vec<u8>> = snap.view.iter().map(|e| &e.key).collect();
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn scan_and_index_discovery_agree() -> Result<()> {
    let root = unique_root("discovery");
    let history = build_history(&root, 0x5EED_0002)?;
    let store = LogStore::open_ro(&root.join("data"))?;

    let scanned = scan_modules(&store)?;
    assert_eq!(scanned, MODULES.to_vec());

    for v in history.keys() {
        let commit = resolve_commit(&store, *v)?;
        let indexed = Discovery::Index(&commit.index).modules(&store)?;
        assert_eq!(indexed, scanned, "discovery differs at version {v}");

        let by_scan = inspect(
            &store,
            Some(*v),
            &DumpConfig::default().with_discovery(DiscoveryMode::Scan),
        )?;
        let by_index = inspect(
            &store,
            Some(*v),
            &DumpConfig::default().with_discovery(DiscoveryMode::Index),
        )?;
        assert_eq!(by_scan.modules, by_index.modules);
        assert_eq!(by_scan.discovery, DiscoveryMode::Scan);
        assert_eq!(by_index.discovery, DiscoveryMode::Index);
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn resolving_twice_is_idempotent() -> Result<()> {
    let root = unique_root("idempotent");
    build_history(&root, 0x5EED_0003)?;
    let store = LogStore::open_ro(&root.join("data"))?;
    let cfg = DumpConfig::default();

    for v in [1, VERSIONS / 2, VERSIONS] {
        assert_eq!(resolve_commit(&store, v)?, resolve_commit(&store, v)?);

        let a = inspect(&store, Some(v), &cfg)?;
        let b = inspect(&store, Some(v), &cfg)?;
        assert_eq!(a.commit, b.commit);
        assert_eq!(a.modules, b.modules);
        for m in &a.modules {
            let ea: Vec<Entry> = a
                .assembly
                .get(m)
                .map(|s| s.view.iter().cloned().collect())
                .unwrap_or_default();
            let eb: Vec<Entry> = b
                .assembly
                .get(m)
                .map(|s| s.view.iter().cloned().collect())
                .unwrap_or_default();
            assert_eq!(ea, eb);
        }
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
