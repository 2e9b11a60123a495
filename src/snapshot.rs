//! snapshot — сборка read-only видов модулей, закреплённых на целевой версии.
//!
//! Для каждого модуля: CommitId из индекса → PrefixStore(`s/k:<module>/`) →
//! TreeView на (version, root hash). Модуль без коммита пропускается с warn;
//! ошибка дерева прерывает сборку либо (TreeErrorPolicy::Skip) пропускает модуль.

use std::collections::BTreeMap;

use log::{debug, error, warn};

use crate::commit::{CommitId, CommitIndex};
use crate::config::{DumpConfig, TreeErrorPolicy};
use crate::discover::module_prefix;
use crate::error::{DumpError, Result};
use crate::metrics::record_module_skipped;
use crate::raw::{PrefixStore, RawStore};
use crate::tree::TreeView;

/// Вид одного модуля на целевой версии.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub module: String,
    pub commit_id: CommitId,
    pub view: TreeView,
}

/// Модуль, не попавший в вывод, и причина.
#[derive(Debug)]
pub struct SkippedModule {
    pub module: String,
    pub reason: DumpError,
}

#[derive(Debug, Default)]
pub struct Assembly {
    /// Отсортировано по имени модуля.
    pub snapshots: BTreeMap<String, Snapshot>,
    pub skipped: Vec<SkippedModule>,
}

impl Assembly {
    pub fn get(&self, module: &str) -> Option<&Snapshot> {
        self.snapshots.get(module)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(|s| s.as_str())
    }
}

/// Открыть вид одного модуля. Без политики ошибок: любая ошибка дерева — TreeLoad.
pub fn open_module<S: RawStore>(
    store: &S,
    module: &str,
    commit_id: &CommitId,
    verify_nodes: bool,
) -> Result<Snapshot> {
    let scoped = PrefixStore::new(store, module_prefix(module));
    let view = TreeView::load(&scoped, commit_id.version, &commit_id.hash, verify_nodes).map_err(
        |source| DumpError::TreeLoad {
            module: module.to_string(),
            commit: *commit_id,
            source,
        },
    )?;
    debug!(
        "module {:?}: opened at {} with {} entries",
        module,
        commit_id,
        view.len()
    );
    Ok(Snapshot {
        module: module.to_string(),
        commit_id: *commit_id,
        view,
    })
}

/// Собрать виды всех `modules` по индексу коммита.
pub fn assemble<S: RawStore>(
    store: &S,
    modules: &[String],
    index: &CommitIndex,
    cfg: &DumpConfig,
) -> Result<Assembly> {
    let mut out = Assembly::default();

    for module in modules {
        let Some(commit_id) = index.get(module) else {
            let reason = DumpError::ModuleWithoutCommit {
                module: module.clone(),
                version: index.version(),
            };
            warn!("{}, skipping", reason);
            record_module_skipped();
            out.skipped.push(SkippedModule {
                module: module.clone(),
                reason,
            });
            continue;
        };

        match open_module(store, module, commit_id, cfg.verify_nodes) {
            Ok(snap) => {
                out.snapshots.insert(module.clone(), snap);
            }
            Err(DumpError::TreeLoad {
                module: m,
                commit,
                source,
            }) if cfg.on_tree_error == TreeErrorPolicy::Skip => {
                error!(
                    "cannot load module {:?} at {}: {}, skipping",
                    m, commit, source
                );
                record_module_skipped();
                out.skipped.push(SkippedModule {
                    module: m.clone(),
                    reason: DumpError::TreeLoad {
                        module: m,
                        commit,
                        source,
                    },
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitInfo, StoreInfo};
    use crate::raw::MemStore;
    use crate::tree::{commit_tree, Leaf};

    fn mount(mem: &mut MemStore, module: &str, version: u64, keys: &[&str]) -> CommitId {
        let leaves: Vec<Leaf> = keys
            .iter()
            .map(|k| (k.as_bytes().to_vec(), k.as_bytes().to_vec(), version))
            .collect();
        let mut scoped = PrefixStore::new(&mut *mem, module_prefix(module));
        let root = commit_tree(&mut scoped, version, &leaves).unwrap();
        CommitId::new(version, root)
    }

    fn index_of(version: u64, ids: &[(&str, CommitId)]) -> CommitIndex {
        CommitInfo {
            version,
            store_infos: ids
                .iter()
                .map(|(n, c)| StoreInfo {
                    name: n.to_string(),
                    commit_id: *c,
                })
                .collect(),
            timestamp: None,
        }
        .index()
        .unwrap()
    }

    #[test]
    fn modules_are_isolated_by_prefix() {
        let mut mem = MemStore::default();
        let a = mount(&mut mem, "a", 1, &["x", "y"]);
        let ab = mount(&mut mem, "ab", 1, &["z"]);
        let idx = index_of(1, &[("a", a), ("ab", ab)]);

        let asm = assemble(
            &mem,
            &["a".to_string(), "ab".to_string()],
            &idx,
            &DumpConfig::default(),
        )
        .unwrap();
        assert_eq!(asm.module_names().collect::<Vec<_>>(), vec!["a", "ab"]);
        assert_eq!(asm.get("a").unwrap().view.len(), 2);
        assert_eq!(asm.get("ab").unwrap().view.len(), 1);
        assert!(asm.skipped.is_empty());
    }

    #[test]
    fn module_without_commit_is_skipped() {
        let mut mem = MemStore::default();
        let a = mount(&mut mem, "a", 1, &["x"]);
        mount(&mut mem, "orphan", 1, &["q"]);
        let idx = index_of(1, &[("a", a)]);

        let asm = assemble(
            &mem,
            &["a".to_string(), "orphan".to_string()],
            &idx,
            &DumpConfig::default(),
        )
        .unwrap();
        assert_eq!(asm.snapshots.len(), 1);
        assert_eq!(asm.skipped.len(), 1);
        assert!(matches!(
            asm.skipped[0].reason,
            DumpError::ModuleWithoutCommit { version: 1, .. }
        ));
    }

    #[test]
    fn broken_tree_aborts_or_skips_by_policy() {
        let mut mem = MemStore::default();
        let a = mount(&mut mem, "a", 1, &["x"]);
        let bad = CommitId::new(1, [9u8; 32]);
        let idx = index_of(1, &[("a", a), ("b", bad)]);
        let mods = vec!["a".to_string(), "b".to_string()];

        let err = assemble(&mem, &mods, &idx, &DumpConfig::default()).unwrap_err();
        match err {
            DumpError::TreeLoad { module, .. } => assert_eq!(module, "b"),
            other => panic!("unexpected: {:?}", other),
        }

        let cfg = DumpConfig::default().with_tree_error_policy(TreeErrorPolicy::Skip);
        let asm = assemble(&mem, &mods, &idx, &cfg).unwrap();
        assert_eq!(asm.module_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(asm.skipped[0].module, "b");
    }
}
