//! commit — записи коммитов (CommitInfo) и их разрешение по версии.
//!
//! Раскладка ключей в raw store:
//!   s/<version>  -> CommitInfo (protobuf)
//!   s/latest     -> Int64Value (protobuf), последняя закоммиченная версия
//!
//! Формат (protobuf wire):
//!   CommitInfo { int64 version = 1; repeated StoreInfo store_infos = 2; Timestamp timestamp = 3; }
//!   StoreInfo  { string name = 1; CommitID commit_id = 2; }
//!   CommitID   { int64 version = 1; bytes hash = 2; }
//!   Timestamp  { int64 seconds = 1; int32 nanos = 2; }
//!
//! Подмодули:
//! - wire.rs    — varint/length-delimited примитивы.
//! - resolve.rs — поиск записи для версии, latest-маркер, индекс по имени модуля.

use std::collections::BTreeMap;
use std::fmt;

use crate::consts::{HASH_LEN, LATEST_VERSION_KEY, NS_SEPARATOR};

pub mod resolve;
pub mod wire;

pub use resolve::{read_latest_marker, resolve_commit, ResolvedCommit};

use wire::{
    expect_wire_type, put_bytes_field, put_varint_field, varint_to_version, FieldReader,
    WireError, WireResult, WT_LEN, WT_VARINT,
};

/// (version, hash) — конкретный корень дерева одного модуля.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId {
    pub version: u64,
    pub hash: [u8; HASH_LEN],
}

impl CommitId {
    pub fn new(version: u64, hash: [u8; HASH_LEN]) -> Self {
        Self { version, hash }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.version, hex::encode(self.hash))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
    pub commit_id: CommitId,
}

/// Запись одной глобальной версии: версия + упорядоченный список (модуль → CommitId).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitInfo {
    pub version: u64,
    pub store_infos: Vec<StoreInfo>,
    pub timestamp: Option<Timestamp>,
}

impl CommitInfo {
    /// Имена модулей в порядке записи (не сортированы).
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.store_infos.iter().map(|si| si.name.as_str())
    }

    /// Проиндексировать по имени модуля. Дубликат имени — Err(имя).
    pub fn index(&self) -> std::result::Result<CommitIndex, String> {
        let mut by_name = BTreeMap::new();
        for si in &self.store_infos {
            if by_name.insert(si.name.clone(), si.commit_id).is_some() {
                return Err(si.name.clone());
            }
        }
        Ok(CommitIndex {
            version: self.version,
            by_name,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.version != 0 {
            put_varint_field(&mut out, 1, self.version);
        }
        for si in &self.store_infos {
            put_bytes_field(&mut out, 2, &encode_store_info(si));
        }
        if let Some(ts) = self.timestamp {
            let mut t = Vec::new();
            if ts.seconds != 0 {
                put_varint_field(&mut t, 1, ts.seconds as u64);
            }
            if ts.nanos != 0 {
                put_varint_field(&mut t, 2, ts.nanos as i64 as u64);
            }
            put_bytes_field(&mut out, 3, &t);
        }
        out
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut info = CommitInfo::default();
        let mut r = FieldReader::new(buf);
        while let Some((field, wt)) = r.next_field()? {
            match field {
                1 => {
                    expect_wire_type(field, wt, WT_VARINT)?;
                    info.version = varint_to_version(field, r.read_varint()?)?;
                }
                2 => {
                    expect_wire_type(field, wt, WT_LEN)?;
                    info.store_infos.push(decode_store_info(r.read_len_delimited()?)?);
                }
                3 => {
                    expect_wire_type(field, wt, WT_LEN)?;
                    info.timestamp = Some(decode_timestamp(r.read_len_delimited()?)?);
                }
                _ => r.skip(field, wt)?,
            }
        }
        Ok(info)
    }
}

/// CommitInfo, проиндексированный по имени модуля (O(log n) lookup, сортированный обход).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitIndex {
    version: u64,
    by_name: BTreeMap<String, CommitId>,
}

impl CommitIndex {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, module: &str) -> Option<&CommitId> {
        self.by_name.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.by_name.contains_key(module)
    }

    /// Имена модулей, отсортированные лексикографически.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// ---------- keys ----------

/// Ключ записи коммита: "s/<version>".
pub fn commit_key(version: u64) -> Vec<u8> {
    format!("s/{}", version).into_bytes()
}

pub fn latest_key() -> &'static [u8] {
    LATEST_VERSION_KEY
}

/// Закодировать latest-маркер (Int64Value).
pub fn encode_latest(version: u64) -> Vec<u8> {
    let mut out = Vec::new();
    if version != 0 {
        put_varint_field(&mut out, 1, version);
    }
    out
}

/// Разобрать latest-маркер. Пустая запись = 0 (proto3 default).
pub fn decode_latest(buf: &[u8]) -> WireResult<u64> {
    let mut value = 0u64;
    let mut r = FieldReader::new(buf);
    while let Some((field, wt)) = r.next_field()? {
        if field == 1 {
            expect_wire_type(field, wt, WT_VARINT)?;
            value = varint_to_version(field, r.read_varint()?)?;
        } else {
            r.skip(field, wt)?;
        }
    }
    Ok(value)
}

// ---------- nested messages ----------

fn encode_store_info(si: &StoreInfo) -> Vec<u8> {
    let mut out = Vec::new();
    put_bytes_field(&mut out, 1, si.name.as_bytes());
    let mut cid = Vec::new();
    if si.commit_id.version != 0 {
        put_varint_field(&mut cid, 1, si.commit_id.version);
    }
    put_bytes_field(&mut cid, 2, &si.commit_id.hash);
    put_bytes_field(&mut out, 2, &cid);
    out
}

fn decode_store_info(buf: &[u8]) -> WireResult<StoreInfo> {
    let mut name: Option<String> = None;
    let mut commit_id: Option<CommitId> = None;
    let mut r = FieldReader::new(buf);
    while let Some((field, wt)) = r.next_field()? {
        match field {
            1 => {
                expect_wire_type(field, wt, WT_LEN)?;
                let raw = r.read_len_delimited()?;
                let s = std::str::from_utf8(raw).map_err(|e| WireError::BadValue {
                    field,
                    reason: format!("store name is not UTF-8: {}", e),
                })?;
                name = Some(s.to_string());
            }
            2 => {
                expect_wire_type(field, wt, WT_LEN)?;
                commit_id = Some(decode_commit_id(r.read_len_delimited()?)?);
            }
            _ => r.skip(field, wt)?,
        }
    }

    let name = name.unwrap_or_default();
    if name.is_empty() || name.as_bytes().contains(&NS_SEPARATOR) {
        return Err(WireError::BadValue {
            field: 1,
            reason: format!("invalid store name {:?}", name),
        });
    }
    let commit_id = commit_id.ok_or_else(|| WireError::BadValue {
        field: 2,
        reason: format!("store {:?} has no commit id", name),
    })?;
    Ok(StoreInfo { name, commit_id })
}

fn decode_commit_id(buf: &[u8]) -> WireResult<CommitId> {
    let mut version = 0u64;
    let mut hash: &[u8] = &[];
    let mut r = FieldReader::new(buf);
    while let Some((field, wt)) = r.next_field()? {
        match field {
            1 => {
                expect_wire_type(field, wt, WT_VARINT)?;
                version = varint_to_version(field, r.read_varint()?)?;
            }
            2 => {
                expect_wire_type(field, wt, WT_LEN)?;
                hash = r.read_len_delimited()?;
            }
            _ => r.skip(field, wt)?,
        }
    }
    let hash: [u8; HASH_LEN] = hash.try_into().map_err(|_| WireError::BadValue {
        field: 2,
        reason: format!("hash must be {} bytes, got {}", HASH_LEN, hash.len()),
    })?;
    Ok(CommitId { version, hash })
}

fn decode_timestamp(buf: &[u8]) -> WireResult<Timestamp> {
    let mut ts = Timestamp::default();
    let mut r = FieldReader::new(buf);
    while let Some((field, wt)) = r.next_field()? {
        match field {
            1 => {
                expect_wire_type(field, wt, WT_VARINT)?;
                ts.seconds = r.read_varint()? as i64;
            }
            2 => {
                expect_wire_type(field, wt, WT_VARINT)?;
                ts.nanos = r.read_varint()? as i64 as i32;
            }
            _ => r.skip(field, wt)?,
        }
    }
    Ok(ts)
}
