//! tree/view — TreeView: read-only вид дерева, закреплённый на (version, root hash).
//!
//! Открытие материализует все листья in-order (слева направо), поэтому любая
//! ошибка дерева (нет корня, нет узла, битый узел) всплывает при открытии, а не
//! посреди вывода.

use log::trace;

use crate::metrics::record_tree_node_loaded;
use crate::raw::RawStore;

use super::node::{empty_root_hash, hash_bytes, Hash, Node};
use super::{node_key, root_key, TreeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TreeView {
    entries: Vec<Entry>,
}

impl TreeView {
    /// Открыть дерево на версии `version` с ожидаемым корнем `expected_root`.
    ///
    /// `verify` — пересчитывать sha256 каждого загруженного узла.
    pub fn load<S: RawStore>(
        store: &S,
        version: u64,
        expected_root: &Hash,
        verify: bool,
    ) -> Result<Self, TreeError> {
        let stored = store
            .get(&root_key(version))?
            .ok_or(TreeError::MissingRoot { version })?;
        if stored.as_slice() != expected_root.as_slice() {
            return Err(TreeError::RootMismatch {
                version,
                expected: hex::encode(expected_root),
                found: hex::encode(&stored),
            });
        }

        if *expected_root == empty_root_hash() {
            return Ok(Self {
                entries: Vec::new(),
            });
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut root_size: Option<u64> = None;
        // (hash, высота родителя): высота обязана строго убывать вниз по дереву,
        // это же гарантирует завершение обхода даже без verify.
        let mut stack: Vec<(Hash, Option<u8>)> = vec![(*expected_root, None)];

        while let Some((h, parent_height)) = stack.pop() {
            let raw = store.get(&node_key(&h))?.ok_or_else(|| TreeError::MissingNode {
                hash: hex::encode(h),
            })?;
            record_tree_node_loaded();

            if verify && hash_bytes(&raw) != h {
                return Err(TreeError::NodeHashMismatch {
                    hash: hex::encode(h),
                });
            }
            let node = Node::decode(&raw).map_err(|reason| TreeError::CorruptNode {
                hash: hex::encode(h),
                reason,
            })?;

            if let Some(ph) = parent_height {
                if node.height() >= ph {
                    return Err(TreeError::CorruptNode {
                        hash: hex::encode(h),
                        reason: format!("height {} under parent of height {}", node.height(), ph),
                    });
                }
            }
            if root_size.is_none() {
                root_size = Some(node.size());
            }

            match node {
                Node::Leaf { key, value, .. } => {
                    if let Some(last) = entries.last() {
                        if last.key >= key {
                            return Err(TreeError::Unordered {
                                hash: hex::encode(h),
                            });
                        }
                    }
                    entries.push(Entry { key, value });
                }
                Node::Inner {
                    height, left, right, ..
                } => {
                    // правый кладём первым — левый поддерево обходится раньше
                    stack.push((right, Some(height)));
                    stack.push((left, Some(height)));
                }
            }
        }

        let declared = root_size.unwrap_or(0);
        if entries.len() as u64 != declared {
            return Err(TreeError::CorruptNode {
                hash: hex::encode(expected_root),
                reason: format!(
                    "root declares {} leaves, traversal found {}",
                    declared,
                    entries.len()
                ),
            });
        }

        trace!(
            "tree view at version {} materialized {} entries",
            version,
            entries.len()
        );
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Записи в порядке возрастания ключа.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|i| self.entries[i].value.as_slice())
    }
}
