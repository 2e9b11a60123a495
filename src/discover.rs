//! discover — какие модули есть в store.
//!
//! Две взаимозаменяемые стратегии за одним enum:
//! - Scan: обход всех raw-ключей `s/k:<module>/...` (линейно по числу ключей, не зависит от версии);
//! - Index: имена из CommitInfo целевой версии (одно чтение, версия должна быть известна).
//!
//! Результат всегда дедуплицирован и отсортирован: нативный порядок обхода raw store
//! не определён (HashMap), сортировка делается здесь, на границе map → sequence.

use std::collections::BTreeSet;

use log::trace;

use crate::commit::CommitIndex;
use crate::consts::{NS_MODULE_TAG, NS_SEPARATOR, NS_STORE};
use crate::error::Result;
use crate::raw::RawStore;

#[derive(Debug, Clone, Copy)]
pub enum Discovery<'a> {
    Scan,
    Index(&'a CommitIndex),
}

impl Discovery<'_> {
    pub fn modules<S: RawStore>(&self, store: &S) -> Result<Vec<String>> {
        match self {
            Discovery::Scan => scan_modules(store),
            Discovery::Index(index) => Ok(index.names()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Discovery::Scan => "scan",
            Discovery::Index(_) => "index",
        }
    }
}

/// Префикс raw-ключей модуля: `s/k:<module>/`. Должен побайтно совпадать с тем,
/// что использовался при записи.
pub fn module_prefix(module: &str) -> Vec<u8> {
    let mut p = Vec::with_capacity(NS_STORE.len() + NS_MODULE_TAG.len() + module.len() + 1);
    p.extend_from_slice(NS_STORE);
    p.extend_from_slice(NS_MODULE_TAG);
    p.extend_from_slice(module.as_bytes());
    p.push(NS_SEPARATOR);
    p
}

/// Извлечь имя модуля из raw-ключа. Ключи не из пространства модулей (в т.ч. слишком
/// короткие, commit-записи, latest-маркер) дают None.
pub fn module_from_key(key: &[u8]) -> Option<&str> {
    let rest = key.strip_prefix(NS_STORE)?;
    let segment = match rest.iter().position(|&b| b == NS_SEPARATOR) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let name = segment.strip_prefix(NS_MODULE_TAG)?;
    if name.is_empty() {
        return None;
    }
    std::str::from_utf8(name).ok()
}

/// Scan-стратегия: полный обход ключей под `s/`.
pub fn scan_modules<S: RawStore>(store: &S) -> Result<Vec<String>> {
    let mut found: BTreeSet<String> = BTreeSet::new();
    store.scan_stream(Some(NS_STORE), |k, _v| match module_from_key(k) {
        Some(m) => {
            if !found.contains(m) {
                found.insert(m.to_string());
            }
        }
        None => trace!("scan: skipping non-module key {:?}", String::from_utf8_lossy(k)),
    })?;
    Ok(found.into_iter().collect())
}
