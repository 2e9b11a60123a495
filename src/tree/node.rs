//! tree/node — формат узла merkle-дерева и его хэш.
//!
//! Layout (LE):
//! [kind u8][height u8][version u64][size u64][key_len u32][key]
//!   leaf:  [val_len u32][value]
//!   inner: [left hash32][right hash32]
//!
//! hash = sha256(encoded node). Ключ inner-узла — минимальный ключ правого поддерева.

use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::consts::{HASH_LEN, NODE_HDR_SIZE, NODE_KIND_INNER, NODE_KIND_LEAF};

pub type Hash = [u8; HASH_LEN];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        version: u64,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Inner {
        height: u8,
        version: u64,
        size: u64,
        key: Vec<u8>,
        left: Hash,
        right: Hash,
    },
}

impl Node {
    pub fn height(&self) -> u8 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Inner { height, .. } => *height,
        }
    }

    /// Число листьев в поддереве.
    pub fn size(&self) -> u64 {
        match self {
            Node::Leaf { .. } => 1,
            Node::Inner { size, .. } => *size,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Node::Leaf { version, .. } | Node::Inner { version, .. } => *version,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Node::Leaf { key, .. } | Node::Inner { key, .. } => key,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let (kind, tail_len) = match self {
            Node::Leaf { value, .. } => (NODE_KIND_LEAF, 4 + value.len()),
            Node::Inner { .. } => (NODE_KIND_INNER, 2 * HASH_LEN),
        };
        let key = self.key();
        let mut out = vec![0u8; NODE_HDR_SIZE];
        out[0] = kind;
        out[1] = self.height();
        LittleEndian::write_u64(&mut out[2..10], self.version());
        LittleEndian::write_u64(&mut out[10..18], self.size());
        LittleEndian::write_u32(&mut out[18..22], key.len() as u32);
        out.reserve(key.len() + tail_len);
        out.extend_from_slice(key);
        match self {
            Node::Leaf { value, .. } => {
                let mut len = [0u8; 4];
                LittleEndian::write_u32(&mut len, value.len() as u32);
                out.extend_from_slice(&len);
                out.extend_from_slice(value);
            }
            Node::Inner { left, right, .. } => {
                out.extend_from_slice(left);
                out.extend_from_slice(right);
            }
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, String> {
        if buf.len() < NODE_HDR_SIZE {
            return Err(format!("node too short: {} B", buf.len()));
        }
        let kind = buf[0];
        let height = buf[1];
        let version = LittleEndian::read_u64(&buf[2..10]);
        let size = LittleEndian::read_u64(&buf[10..18]);
        let key_len = LittleEndian::read_u32(&buf[18..22]) as usize;

        let key_end = NODE_HDR_SIZE
            .checked_add(key_len)
            .filter(|&e| e <= buf.len())
            .ok_or_else(|| format!("key length {} exceeds node", key_len))?;
        let key = buf[NODE_HDR_SIZE..key_end].to_vec();
        let tail = &buf[key_end..];

        match kind {
            NODE_KIND_LEAF => {
                if height != 0 || size != 1 {
                    return Err(format!("leaf with height {} size {}", height, size));
                }
                if tail.len() < 4 {
                    return Err("leaf value length is truncated".to_string());
                }
                let val_len = LittleEndian::read_u32(&tail[..4]) as usize;
                if tail.len() - 4 != val_len {
                    return Err(format!(
                        "leaf value length {} does not match {} remaining bytes",
                        val_len,
                        tail.len() - 4
                    ));
                }
                Ok(Node::Leaf {
                    version,
                    key,
                    value: tail[4..].to_vec(),
                })
            }
            NODE_KIND_INNER => {
                if height == 0 || size < 2 {
                    return Err(format!("inner node with height {} size {}", height, size));
                }
                if tail.len() != 2 * HASH_LEN {
                    return Err(format!("inner node tail is {} B", tail.len()));
                }
                let mut left = [0u8; HASH_LEN];
                let mut right = [0u8; HASH_LEN];
                left.copy_from_slice(&tail[..HASH_LEN]);
                right.copy_from_slice(&tail[HASH_LEN..]);
                Ok(Node::Inner {
                    height,
                    version,
                    size,
                    key,
                    left,
                    right,
                })
            }
            other => Err(format!("unknown node kind {}", other)),
        }
    }
}

#[inline]
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Корневой хэш пустого дерева: sha256("").
pub fn empty_root_hash() -> Hash {
    hash_bytes(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_and_inner_decode() {
        let leaf = Node::Leaf {
            version: 4,
            key: b"x".to_vec(),
            value: vec![0x01],
        };
        assert_eq!(Node::decode(&leaf.encode()).unwrap(), leaf);

        let inner = Node::Inner {
            height: 1,
            version: 9,
            size: 2,
            key: b"m".to_vec(),
            left: [1u8; HASH_LEN],
            right: [2u8; HASH_LEN],
        };
        assert_eq!(Node::decode(&inner.encode()).unwrap(), inner);
    }

    #[test]
    fn rejects_trailing_and_truncated_bytes() {
        let leaf = Node::Leaf {
            version: 1,
            key: b"k".to_vec(),
            value: b"vv".to_vec(),
        };
        let mut buf = leaf.encode();
        buf.push(0);
        assert!(Node::decode(&buf).is_err());
        buf.truncate(buf.len() - 2);
        assert!(Node::decode(&buf).is_err());
        assert!(Node::decode(&[NODE_KIND_LEAF; 5]).is_err());
    }

    #[test]
    fn empty_hash_is_sha256_of_nothing() {
        assert_eq!(
            hex::encode(empty_root_hash()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
