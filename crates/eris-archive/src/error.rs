use std::fmt::Display;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive document {path} is missing or malformed: {reason}")]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("channel directory {channel} cannot be read: {reason}")]
    ChannelUnreadable { channel: String, reason: String },

    #[error("message shard {path} is malformed: {reason}")]
    ShardCorrupt { path: PathBuf, reason: String },
}

impl ArchiveError {
    pub(crate) fn corrupt(path: &Path, reason: impl Display) -> Self {
        Self::ArchiveCorrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
