//! Read-only access to a Slack workspace export.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/channels.json        channel metadata
//! <root>/users.json           member directory
//! <root>/<channel>/<day>.json message shards, one JSON array each
//! ```

mod error;

pub use error::ArchiveError;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use eris_types::archive::{ArchivedChannel, ArchivedMessage, Member};

pub const CHANNELS_FILE: &str = "channels.json";
pub const USERS_FILE: &str = "users.json";

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Channel metadata. Missing or malformed metadata makes the whole
    /// archive unusable.
    pub async fn channels(&self) -> Result<Vec<ArchivedChannel>> {
        read_document(&self.root.join(CHANNELS_FILE)).await
    }

    /// Member directory.
    pub async fn members(&self) -> Result<Vec<Member>> {
        read_document(&self.root.join(USERS_FILE)).await
    }

    /// Names of the per-channel subdirectories, sorted.
    ///
    /// Top-level `.json` documents and hidden entries are not channels.
    pub async fn channel_dirs(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| ArchiveError::corrupt(&self.root, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArchiveError::corrupt(&self.root, e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') || name.ends_with(".json") {
                continue;
            }
            // Follows symlinks, so a linked channel directory is still listed.
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// All messages of one channel, shards concatenated in ascending file
    /// name order. Records inside a shard keep their file order.
    pub async fn channel_messages(&self, channel: &str) -> Result<Vec<ArchivedMessage>> {
        let dir = self.root.join(channel);
        let shards = list_shards(&dir).await?;

        let mut messages = Vec::new();
        for shard in &shards {
            let raw = fs::read_to_string(shard)
                .await
                .map_err(|e| ArchiveError::ChannelUnreadable {
                    channel: channel.to_string(),
                    reason: format!("{}: {e}", shard.display()),
                })?;
            let mut batch: Vec<ArchivedMessage> =
                serde_json::from_str(&raw).map_err(|e| ArchiveError::ShardCorrupt {
                    path: shard.clone(),
                    reason: e.to_string(),
                })?;
            messages.append(&mut batch);
        }

        debug!(
            channel,
            shards = shards.len(),
            messages = messages.len(),
            "Read channel history"
        );
        Ok(messages)
    }
}

async fn list_shards(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |e: std::io::Error| ArchiveError::ChannelUnreadable {
        channel: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        reason: e.to_string(),
    };

    let mut entries = fs::read_dir(dir).await.map_err(unreadable)?;
    let mut shards = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || !name.ends_with(".json") {
            continue;
        }
        shards.push(path);
    }
    // Slack names shards YYYY-MM-DD.json, so name order is day order.
    shards.sort();
    Ok(shards)
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| ArchiveError::corrupt(path, e))?;
    serde_json::from_str(&raw).map_err(|e| ArchiveError::corrupt(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            stdfs::create_dir_all(parent).unwrap();
        }
        stdfs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn lists_channel_dirs_without_documents_or_hidden_entries() {
        let tmp = tempdir().unwrap();
        write(tmp.path(), "channels.json", "[]");
        write(tmp.path(), "users.json", "[]");
        write(tmp.path(), "general/2020-01-01.json", "[]");
        write(tmp.path(), "random/2020-01-01.json", "[]");
        stdfs::create_dir_all(tmp.path().join(".git")).unwrap();

        let archive = Archive::new(tmp.path());
        let dirs = archive.channel_dirs().await.unwrap();
        assert_eq!(dirs, vec!["general".to_string(), "random".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lists_symlinked_channel_dirs() {
        let tmp = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        write(tmp.path(), "channels.json", "[]");
        write(tmp.path(), "general/2020-01-01.json", "[]");
        write(elsewhere.path(), "random/2020-01-01.json", "[]");
        std::os::unix::fs::symlink(elsewhere.path().join("random"), tmp.path().join("random"))
            .unwrap();
        // A link to a plain file is not a channel.
        std::os::unix::fs::symlink(tmp.path().join("channels.json"), tmp.path().join("notes"))
            .unwrap();

        let archive = Archive::new(tmp.path());
        let dirs = archive.channel_dirs().await.unwrap();
        assert_eq!(dirs, vec!["general".to_string(), "random".to_string()]);

        let messages = archive.channel_messages("random").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn concatenates_shards_in_day_order() {
        let tmp = tempdir().unwrap();
        write(
            tmp.path(),
            "general/2020-01-02.json",
            r#"[{"ts":"3","text":"c"},{"ts":"4","text":"d"}]"#,
        );
        write(
            tmp.path(),
            "general/2020-01-01.json",
            r#"[{"ts":"2","text":"b"},{"ts":"1","text":"a"}]"#,
        );
        write(tmp.path(), "general/.DS_Store", "junk");

        let archive = Archive::new(tmp.path());
        let messages = archive.channel_messages("general").await.unwrap();
        let ts: Vec<&str> = messages.iter().map(|m| m.ts.as_str()).collect();
        // Within a shard the file order wins, not the timestamp.
        assert_eq!(ts, vec!["2", "1", "3", "4"]);
    }

    #[tokio::test]
    async fn missing_channel_dir_is_unreadable() {
        let tmp = tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let err = archive.channel_messages("nope").await.unwrap_err();
        assert!(matches!(err, ArchiveError::ChannelUnreadable { .. }));
    }

    #[tokio::test]
    async fn missing_or_malformed_metadata_is_corrupt() {
        let tmp = tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        assert!(matches!(
            archive.channels().await.unwrap_err(),
            ArchiveError::ArchiveCorrupt { .. }
        ));

        write(tmp.path(), "channels.json", r#"{"not":"a list"}"#);
        assert!(matches!(
            archive.channels().await.unwrap_err(),
            ArchiveError::ArchiveCorrupt { .. }
        ));

        write(
            tmp.path(),
            "channels.json",
            r#"[{"id":"C1","name":"general","is_archived":false},{"id":"C2"}]"#,
        );
        let channels = archive.channels().await.unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].destination_name(), "slack-c2");
        assert!(!channels[1].is_archived);
    }
}
