use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use eris_types::failure::FailureRecord;

/// Writes one JSON document per message that could not be relayed.
///
/// Each record lands at `{dir}/{channel}/{ts}.json`. A timestamp is only
/// unique inside its channel, so channels get their own subdirectory.
#[derive(Debug, Clone)]
pub struct FailureStore {
    dir: PathBuf,
}

impl FailureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, channel: &str, ts: &str) -> PathBuf {
        self.dir
            .join(sanitize_key(channel))
            .join(format!("{}.json", sanitize_key(ts)))
    }

    pub async fn record(&self, record: &FailureRecord) -> io::Result<PathBuf> {
        let path = self.path_for(&record.channel, &record.ts);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(record).map_err(io::Error::other)?;
        fs::write(&path, data).await?;
        debug!("Recorded failed message {} at {}", record.ts, path.display());
        Ok(path)
    }
}

fn sanitize_key(ts: &str) -> String {
    let cleaned: String = ts
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Keep the file inside the store even for keys like "..".
    if cleaned.trim_matches('.').is_empty() {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eris_types::archive::ArchivedMessage;
    use eris_types::destination::OutgoingMessage;
    use tempfile::tempdir;

    #[test]
    fn keys_cannot_escape_the_store() {
        assert_eq!(sanitize_key("1500000000.000100"), "1500000000.000100");
        assert_eq!(sanitize_key("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_key(".."), "_..");
    }

    #[tokio::test]
    async fn writes_record_named_by_timestamp() {
        let tmp = tempdir().unwrap();
        let store = FailureStore::new(tmp.path().join("failed"));
        let message: ArchivedMessage = serde_json::from_str(
            r#"{"ts":"1500000000.000100","user":"U1","text":"hi","edited":{"user":"U1"}}"#,
        )
        .unwrap();
        let record = FailureRecord {
            ts: message.ts.clone(),
            channel: "general".into(),
            error: "request rejected with status 400".into(),
            recorded_at: Utc::now(),
            message,
            payload: OutgoingMessage {
                username: "ada".into(),
                avatar_url: None,
                content: "hi".into(),
            },
        };

        let path = store.record(&record).await.unwrap();
        assert_eq!(
            path,
            tmp.path().join("failed/general/1500000000.000100.json")
        );

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["error"], "request rejected with status 400");
        assert_eq!(written["message"]["edited"]["user"], "U1");
        assert_eq!(written["payload"]["content"], "hi");
    }

    #[tokio::test]
    async fn same_ts_in_two_channels_keeps_both_records() {
        let tmp = tempdir().unwrap();
        let store = FailureStore::new(tmp.path());
        let message: ArchivedMessage =
            serde_json::from_str(r#"{"ts":"1614643200.000100","text":"m2"}"#).unwrap();
        let record = |channel: &str| FailureRecord {
            ts: message.ts.clone(),
            channel: channel.to_string(),
            error: "rejected".into(),
            recorded_at: Utc::now(),
            message: message.clone(),
            payload: OutgoingMessage {
                username: "Slack User".into(),
                avatar_url: None,
                content: "m2".into(),
            },
        };

        let first = store.record(&record("general")).await.unwrap();
        let second = store.record(&record("old-stuff")).await.unwrap();
        assert_ne!(first, second);
        assert!(first.is_file());
        assert!(second.is_file());
    }

    #[test]
    fn channel_names_are_sanitized_too() {
        let store = FailureStore::new("/tmp/failed");
        assert_eq!(
            store.path_for("../x", "1.2"),
            PathBuf::from("/tmp/failed/.._x/1.2.json")
        );
    }
}
