//! Общие константы форматов (raw log, key namespace, merkle tree).

// -------- Data directory --------
/// Подкаталог внутри <dataDir>, где лежат файлы raw store.
pub const DATA_SUBDIR: &str = "data";
pub const LOG_FILE: &str = "application.log";

// -------- Raw log --------
pub const LOG_MAGIC: &[u8; 8] = b"SDLOG001";
pub const LOG_FORMAT_VERSION: u32 = 1;
pub const LOG_HDR_SIZE: usize = 16; // [magic8][ver u32][reserved u32]

// Формат записи raw log (v1):
// [type u8]          -- LOG_REC_*
// [flags u8]
// [reserved u16]
// [key_len u32]
// [val_len u32]      -- 0 для DELETE
// [crc32c u32]       -- CRC over header (except crc field) + key + value
//
// Total header size = 1 + 1 + 2 + 4 + 4 + 4 = 16 bytes.
pub const LOG_REC_HDR_SIZE: usize = 16;

pub const LOG_REC_PUT: u8 = 1;
pub const LOG_REC_DELETE: u8 = 2;

pub const LOG_REC_OFF_TYPE: usize = 0;
pub const LOG_REC_OFF_FLAGS: usize = 1;
pub const LOG_REC_OFF_RESERVED: usize = 2;
pub const LOG_REC_OFF_KEY_LEN: usize = 4;
pub const LOG_REC_OFF_VAL_LEN: usize = 8;
pub const LOG_REC_OFF_CRC32: usize = 12;

// -------- Key namespace (protocol constants) --------
// s/k:<module>/<tree key>  -- данные модуля
// s/<version>              -- CommitInfo
// s/latest                 -- последняя закоммиченная версия
pub const NS_STORE: &[u8] = b"s/";
pub const NS_MODULE_TAG: &[u8] = b"k:";
pub const NS_SEPARATOR: u8 = b'/';
pub const LATEST_VERSION_KEY: &[u8] = b"s/latest";

// -------- Merkle tree (внутри префикса модуля) --------
pub const TREE_NODE_PREFIX: u8 = b'n';
pub const TREE_ROOT_PREFIX: u8 = b'r';
pub const HASH_LEN: usize = 32;

pub const NODE_KIND_LEAF: u8 = 0;
pub const NODE_KIND_INNER: u8 = 1;
// [kind u8][height u8][version u64][size u64][key_len u32]
pub const NODE_HDR_SIZE: usize = 22;
