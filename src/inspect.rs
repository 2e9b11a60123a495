//! inspect — полный конвейер одного прогона поверх открытого raw store:
//! latest → target → CommitInfo → список модулей → сборка видов.
//!
//! Ничего не выводит: результат (Inspection) печатается отдельно (dump.rs), поэтому
//! любая фатальная ошибка происходит до первой строки с записями.

use log::{debug, info, warn};

use crate::commit::{read_latest_marker, resolve_commit, CommitIndex, ResolvedCommit};
use crate::config::{DiscoveryMode, DumpConfig};
use crate::discover::{module_prefix, scan_modules, Discovery};
use crate::error::{DumpError, Result};
use crate::raw::{PrefixStore, RawStore};
use crate::snapshot::{assemble, Assembly};
use crate::tree;

#[derive(Debug)]
pub struct Inspection {
    /// Фактически использованная стратегия (Scan или Index, не Auto).
    pub discovery: DiscoveryMode,
    pub latest: u64,
    pub target: u64,
    /// Обнаруженные модули, отсортированы.
    pub modules: Vec<String>,
    pub commit: ResolvedCommit,
    pub assembly: Assembly,
}

/// Latest без маркера: максимум корней деревьев по модулям, иначе 0.
pub fn fallback_latest<S: RawStore>(store: &S, modules: &[String]) -> Result<u64> {
    let mut latest = 0u64;
    for m in modules {
        let scoped = PrefixStore::new(store, module_prefix(m));
        let v = tree::latest_version(&scoped).map_err(|e| DumpError::Store(e.into()))?;
        if let Some(v) = v {
            latest = latest.max(v);
        }
    }
    Ok(latest)
}

/// warn! для каждого модуля, который есть только в одном из наборов.
/// Модули скана без коммита в scan-режиме репортит assembler (ModuleWithoutCommit).
fn report_set_mismatch(scanned: &[String], index: &CommitIndex, strategy: DiscoveryMode) {
    for name in index.names() {
        if scanned.binary_search(&name).is_err() {
            warn!(
                "module {:?} is declared by commit {} but has no keys in the store",
                name,
                index.version()
            );
        }
    }
    if strategy == DiscoveryMode::Scan {
        return;
    }
    for name in scanned {
        if !index.contains(name) {
            warn!(
                "module {:?} has keys in the store but no commitment at version {}, not dumped",
                name,
                index.version()
            );
        }
    }
}

pub fn inspect<S: RawStore>(
    store: &S,
    requested: Option<u64>,
    cfg: &DumpConfig,
) -> Result<Inspection> {
    let marker = read_latest_marker(store)?;

    let strategy = match cfg.discovery {
        DiscoveryMode::Auto if marker.is_some() => DiscoveryMode::Index,
        DiscoveryMode::Auto => DiscoveryMode::Scan,
        explicit => explicit,
    };
    // Без маркера скан нужен в любом случае: из него берётся latest.
    let scanned = match marker {
        Some(_) => None,
        None => Some(scan_modules(store)?),
    };

    let latest = match (marker, &scanned) {
        (Some(v), _) => v,
        (None, Some(mods)) => {
            let v = fallback_latest(store, mods)?;
            info!("no latest-version marker, using tree latest {}", v);
            v
        }
        (None, None) => 0,
    };

    let target = requested.unwrap_or(latest);
    let commit = resolve_commit(store, target)?;

    let discovery = match strategy {
        DiscoveryMode::Scan => Discovery::Scan,
        _ => Discovery::Index(&commit.index),
    };
    debug!("discovery strategy: {}", discovery.name());

    let scanned = match (scanned, &discovery) {
        (None, Discovery::Scan) => Some(discovery.modules(store)?),
        (s, _) => s,
    };
    let modules = match (&discovery, &scanned) {
        (Discovery::Scan, Some(mods)) => mods.clone(),
        _ => discovery.modules(store)?,
    };

    // Сверка обнаруженного набора с CommitInfo возможна, только если скан был.
    if let Some(mods) = &scanned {
        report_set_mismatch(mods, &commit.index, strategy);
    }

    let assembly = assemble(store, &modules, &commit.index, cfg)?;
    debug!(
        "inspection ready: latest={} target={} modules={} skipped={}",
        latest,
        target,
        modules.len(),
        assembly.skipped.len()
    );

    Ok(Inspection {
        discovery: strategy,
        latest,
        target,
        modules,
        commit,
        assembly,
    })
}
