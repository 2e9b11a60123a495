//! tree — версионированное merkle-дерево одного модуля поверх PrefixStore.
//!
//! Раскладка внутри префикса модуля (s/k:<module>/):
//!   n<hash32>           -> узел (node.rs), hash = sha256(bytes)
//!   r<version u64 BE>   -> корневой хэш дерева на этой версии (32 байта)
//!
//! Пустое дерево: корень = sha256(""), узлов нет.
//!
//! Подмодули:
//! - node.rs    — формат узла, хэш.
//! - view.rs    — TreeView: открытие на CommitId и in-order материализация.
//! - builder.rs — построение сбалансированного дерева и запись версии (для fixtures).

use anyhow::Context;
use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::consts::{HASH_LEN, TREE_NODE_PREFIX, TREE_ROOT_PREFIX};
use crate::raw::RawStore;

pub mod builder;
pub mod node;
pub mod view;

pub use builder::{commit_tree, prune_version, Leaf};
pub use node::{empty_root_hash, Hash, Node};
pub use view::{Entry, TreeView};

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("no root recorded for version {version}")]
    MissingRoot { version: u64 },

    #[error("root at version {version} is {found}, commit expects {expected}")]
    RootMismatch {
        version: u64,
        expected: String,
        found: String,
    },

    #[error("node {hash} is missing")]
    MissingNode { hash: String },

    #[error("node {hash} content does not match its hash")]
    NodeHashMismatch { hash: String },

    #[error("node {hash} is corrupt: {reason}")]
    CorruptNode { hash: String, reason: String },

    #[error("leaf keys are not strictly ascending at node {hash}")]
    Unordered { hash: String },

    #[error("raw store read failed: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for TreeError {
    fn from(e: anyhow::Error) -> Self {
        TreeError::Store(e)
    }
}

pub fn node_key(hash: &Hash) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + HASH_LEN);
    k.push(TREE_NODE_PREFIX);
    k.extend_from_slice(hash);
    k
}

pub fn root_key(version: u64) -> Vec<u8> {
    let mut k = vec![0u8; 9];
    k[0] = TREE_ROOT_PREFIX;
    BigEndian::write_u64(&mut k[1..], version);
    k
}

/// Последняя версия, для которой в дереве записан корень (тот же смысл latest,
/// что у самого движка дерева). None — корней нет.
pub fn latest_version<S: RawStore>(store: &S) -> Result<Option<u64>, TreeError> {
    let mut latest: Option<u64> = None;
    store
        .scan_stream(Some(&[TREE_ROOT_PREFIX][..]), |k, _v| {
            if k.len() == 9 {
                let v = BigEndian::read_u64(&k[1..]);
                latest = Some(latest.map_or(v, |cur| cur.max(v)));
            }
        })
        .context("scan tree roots")?;
    Ok(latest)
}
