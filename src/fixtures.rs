//! fixtures — StoreWriter: построение store с известным содержимым.
//!
//! Writer держит рабочее состояние каждого смонтированного модуля в памяти и на
//! commit() записывает в raw store:
//! - дерево каждого модуля (узлы + корень версии) под `s/k:<module>/`;
//! - CommitInfo под `s/<version>`;
//! - latest-маркер `s/latest`.
//!
//! Инструмент дампа сам ничего не пишет; writer нужен тестам и пользователям
//! библиотеки, которым надо собрать store-образец.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::commit::{commit_key, encode_latest, latest_key, CommitId, CommitInfo, StoreInfo, Timestamp};
use crate::consts::{DATA_SUBDIR, NS_SEPARATOR};
use crate::discover::module_prefix;
use crate::raw::{LogStore, PrefixStore, RawStoreMut};
use crate::tree::{commit_tree, prune_version, Leaf};

/// key -> (value, версия последней записи ключа)
type Working = BTreeMap<Vec<u8>, (Vec<u8>, u64)>;

pub struct StoreWriter<S: RawStoreMut = LogStore> {
    store: S,
    modules: BTreeMap<String, Working>,
    version: u64,
    write_marker: bool,
}

impl StoreWriter<LogStore> {
    /// Создать новый store в `<root>/data`. Существующий непустой лог — ошибка.
    pub fn create(root: &Path) -> Result<Self> {
        let data_dir = root.join(DATA_SUBDIR);
        let log = LogStore::open_rw(&data_dir)?;
        if !log.is_empty() {
            return Err(anyhow!(
                "raw log {} already has data",
                log.path().display()
            ));
        }
        Ok(Self::with_store(log))
    }

    /// fsync и снятие exclusive-лока.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

impl<S: RawStoreMut> StoreWriter<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            modules: BTreeMap::new(),
            version: 0,
            write_marker: true,
        }
    }

    /// Последняя закоммиченная версия (0 — ещё не было commit).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Писать ли `s/latest` на commit (по умолчанию да).
    pub fn set_write_marker(&mut self, on: bool) {
        self.write_marker = on;
    }

    pub fn mount(&mut self, module: &str) -> Result<()> {
        if module.is_empty() || module.as_bytes().contains(&NS_SEPARATOR) {
            return Err(anyhow!("invalid module name {:?}", module));
        }
        self.modules.entry(module.to_string()).or_default();
        Ok(())
    }

    pub fn unmount(&mut self, module: &str) -> bool {
        self.modules.remove(module).is_some()
    }

    pub fn set(&mut self, module: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let pending = self.version + 1;
        let w = self.working_mut(module)?;
        w.insert(key.to_vec(), (value.to_vec(), pending));
        Ok(())
    }

    pub fn delete(&mut self, module: &str, key: &[u8]) -> Result<()> {
        let w = self.working_mut(module)?;
        w.remove(key);
        Ok(())
    }

    /// Зафиксировать новую версию всех смонтированных модулей.
    pub fn commit(&mut self) -> Result<u64> {
        let version = self.version + 1;
        let mut store_infos = Vec::with_capacity(self.modules.len());

        for (module, working) in &self.modules {
            let leaves: Vec<Leaf> = working
                .iter()
                .map(|(k, (v, ver))| (k.clone(), v.clone(), *ver))
                .collect();
            let mut scoped = PrefixStore::new(&mut self.store, module_prefix(module));
            let root = commit_tree(&mut scoped, version, &leaves)
                .with_context(|| format!("commit tree of module {:?}", module))?;
            store_infos.push(StoreInfo {
                name: module.clone(),
                commit_id: CommitId::new(version, root),
            });
        }

        let info = CommitInfo {
            version,
            store_infos,
            timestamp: Some(now_timestamp()),
        };
        self.store.put(&commit_key(version), &info.encode())?;
        if self.write_marker {
            self.store.put(latest_key(), &encode_latest(version))?;
        }

        self.version = version;
        debug!(
            "committed version {} ({} module(s))",
            version,
            info.store_infos.len()
        );
        Ok(version)
    }

    /// Удалить корень дерева модуля на версии (узлы остаются).
    pub fn prune(&mut self, module: &str, version: u64) -> Result<()> {
        let mut scoped = PrefixStore::new(&mut self.store, module_prefix(module));
        prune_version(&mut scoped, version)
    }

    /// Записать произвольный raw-ключ в обход модулей.
    pub fn put_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store.put(key, value)
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn working_mut(&mut self, module: &str) -> Result<&mut Working> {
        self.modules
            .get_mut(module)
            .ok_or_else(|| anyhow!("module {:?} is not mounted", module))
    }
}

fn now_timestamp() -> Timestamp {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp {
        seconds: d.as_secs() as i64,
        nanos: d.subsec_nanos() as i32,
    }
}
