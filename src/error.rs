//! Error taxonomy of a dump run.
//!
//! Low-level plumbing (raw log, record codec) stays on `anyhow::Result`; this
//! enum is what the pipeline reports once a failure has a protocol meaning.

use std::path::PathBuf;

use thiserror::Error;

use crate::commit::CommitId;
use crate::tree::TreeError;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("data directory not found: {}", .0.display())]
    DataDirMissing(PathBuf),

    #[error("cannot open raw store at {}: {reason}", .path.display())]
    StoreOpenFailure { path: PathBuf, reason: String },

    #[error("no commit record for version {0}")]
    VersionNotFound(u64),

    #[error("corrupt commit record at version {version}: {reason}")]
    CorruptCommitRecord { version: u64, reason: String },

    #[error("module {module:?} appears more than once in commit record for version {version}")]
    DuplicateModuleInCommit { version: u64, module: String },

    #[error("cannot load module {module:?} at {commit}")]
    TreeLoad {
        module: String,
        commit: CommitId,
        #[source]
        source: TreeError,
    },

    #[error("module {module:?} has no commitment at version {version}")]
    ModuleWithoutCommit { module: String, version: u64 },

    #[error("raw store read failed: {0:#}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for DumpError {
    fn from(e: anyhow::Error) -> Self {
        DumpError::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;
