//! tree/builder — построение сбалансированного дерева из отсортированных листьев
//! и запись версии (узлы + корень) в prefix-store модуля.
//!
//! Используется только writer’ом (fixtures). Узлы контент-адресные, поэтому
//! неизменившиеся поддеревья между версиями переиспользуются без повторной записи.

use anyhow::{anyhow, Result};

use crate::raw::RawStoreMut;

use super::node::{empty_root_hash, hash_bytes, Hash, Node};
use super::{node_key, root_key};

/// Лист для построения: (key, value, версия последней записи ключа).
pub type Leaf = (Vec<u8>, Vec<u8>, u64);

struct Built<'a> {
    hash: Hash,
    height: u8,
    size: u64,
    version: u64,
    min_key: &'a [u8],
}

fn build<'a>(leaves: &'a [Leaf], out: &mut Vec<(Hash, Vec<u8>)>) -> Built<'a> {
    if leaves.len() == 1 {
        let (key, value, version) = &leaves[0];
        let bytes = Node::Leaf {
            version: *version,
            key: key.clone(),
            value: value.clone(),
        }
        .encode();
        let hash = hash_bytes(&bytes);
        out.push((hash, bytes));
        return Built {
            hash,
            height: 0,
            size: 1,
            version: *version,
            min_key: key,
        };
    }

    let mid = leaves.len() / 2;
    let left = build(&leaves[..mid], out);
    let right = build(&leaves[mid..], out);
    let node = Node::Inner {
        height: left.height.max(right.height) + 1,
        version: left.version.max(right.version),
        size: left.size + right.size,
        key: right.min_key.to_vec(),
        left: left.hash,
        right: right.hash,
    };
    let bytes = node.encode();
    let hash = hash_bytes(&bytes);
    out.push((hash, bytes));
    Built {
        hash,
        height: node.height(),
        size: node.size(),
        version: node.version(),
        min_key: left.min_key,
    }
}

/// Построить все узлы дерева. Возвращает (root hash, узлы).
pub fn build_nodes(leaves: &[Leaf]) -> Result<(Hash, Vec<(Hash, Vec<u8>)>)> {
    for w in leaves.windows(2) {
        if w[0].0 >= w[1].0 {
            return Err(anyhow!("tree leaves must be strictly ascending by key"));
        }
    }
    if leaves.is_empty() {
        return Ok((empty_root_hash(), Vec::new()));
    }
    let mut out = Vec::with_capacity(leaves.len() * 2);
    let built = build(leaves, &mut out);
    Ok((built.hash, out))
}

/// Записать дерево версии `version` в store (ожидается PrefixStore модуля).
pub fn commit_tree<S: RawStoreMut>(store: &mut S, version: u64, leaves: &[Leaf]) -> Result<Hash> {
    let (root, nodes) = build_nodes(leaves)?;
    for (hash, bytes) in nodes {
        let key = node_key(&hash);
        if store.get(&key)?.is_none() {
            store.put(&key, &bytes)?;
        }
    }
    store.put(&root_key(version), &root)?;
    Ok(root)
}

/// Удалить корень версии (узлы не собираются: они могут быть общими с другими версиями).
pub fn prune_version<S: RawStoreMut>(store: &mut S, version: u64) -> Result<()> {
    store.delete(&root_key(version))
}
