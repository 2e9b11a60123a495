#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod config;
pub mod util;   // src/util/mod.rs

// Хранилище и протокол (папки с mod.rs)
pub mod raw;    // src/raw/{mod,record,log,mem}.rs
pub mod commit; // src/commit/{mod,wire,resolve}.rs
pub mod tree;   // src/tree/{mod,node,view,builder}.rs

// Конвейер дампа
pub mod discover;
pub mod snapshot;
pub mod inspect;
pub mod dump;
pub mod cli;

// Writer для построения store-образцов (тесты, библиотечные пользователи)
pub mod fixtures;

// Удобные реэкспорты
pub use commit::{CommitId, CommitInfo, ResolvedCommit};
pub use config::{DiscoveryMode, DumpConfig, TreeErrorPolicy};
pub use error::DumpError;
pub use fixtures::StoreWriter;
pub use inspect::{inspect, Inspection};
pub use raw::{LogStore, PrefixStore, RawStore};
pub use tree::TreeView;
