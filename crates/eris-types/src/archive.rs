use serde::{Deserialize, Serialize};

/// Subtype tag Slack puts on "<user> has joined the channel" events.
pub const CHANNEL_JOIN_SUBTYPE: &str = "channel_join";

/// One entry of `channels.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

impl ArchivedChannel {
    /// Name the destination channel is created under.
    /// Channels exported without a name fall back to `slack-<id>`, lowercased
    /// because Discord stores text channel names in lowercase.
    pub fn destination_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("slack-{}", self.id.to_lowercase()),
        }
    }
}

/// Profile block shared by `users.json` members and the copy Slack embeds in
/// each message as `user_profile`. Every field may be missing or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_512: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_192: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_72: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Profile {
    pub fn display_name(&self) -> Option<&str> {
        non_empty(&self.display_name)
    }

    pub fn real_name(&self) -> Option<&str> {
        non_empty(&self.real_name)
    }

    /// Largest avatar the export carries.
    pub fn avatar_url(&self) -> Option<&str> {
        non_empty(&self.image_original)
            .or_else(|| non_empty(&self.image_512))
            .or_else(|| non_empty(&self.image_192))
            .or_else(|| non_empty(&self.image_72))
    }
}

/// One entry of `users.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub profile: Profile,
}

/// Classification of a message record by its `subtype` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Ordinary,
    ChannelJoin,
    /// Any other subtype; rendered like an ordinary message.
    Unhandled,
}

/// One record from a channel's day shard.
///
/// Fields the pipeline does not consume are kept in `extra` so the record can
/// be written back out unchanged (failure artifacts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedMessage {
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<Profile>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArchivedMessage {
    pub fn kind(&self) -> MessageKind {
        match self.subtype.as_deref() {
            None => MessageKind::Ordinary,
            Some(CHANNEL_JOIN_SUBTYPE) => MessageKind::ChannelJoin,
            Some(_) => MessageKind::Unhandled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_channel_gets_synthesized_name() {
        let channel = ArchivedChannel {
            id: "C024BE91L".into(),
            name: None,
            is_archived: false,
        };
        assert_eq!(channel.destination_name(), "slack-c024be91l");

        let blank = ArchivedChannel {
            name: Some("  ".into()),
            ..channel.clone()
        };
        assert_eq!(blank.destination_name(), "slack-c024be91l");
    }

    #[test]
    fn message_keeps_unknown_fields() {
        let raw = r#"{"ts":"1500000000.000100","type":"message","user":"U1","text":"hi","client_msg_id":"abc"}"#;
        let msg: ArchivedMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.kind(), MessageKind::Ordinary);
        assert_eq!(msg.extra.get("client_msg_id").and_then(|v| v.as_str()), Some("abc"));

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["type"], "message");
        assert_eq!(back["text"], "hi");
    }

    #[test]
    fn subtype_classification() {
        let join: ArchivedMessage =
            serde_json::from_str(r#"{"ts":"1","subtype":"channel_join","user":"U1"}"#).unwrap();
        assert_eq!(join.kind(), MessageKind::ChannelJoin);

        let topic: ArchivedMessage =
            serde_json::from_str(r#"{"ts":"2","subtype":"channel_topic"}"#).unwrap();
        assert_eq!(topic.kind(), MessageKind::Unhandled);
    }

    #[test]
    fn empty_profile_fields_count_as_absent() {
        let profile = Profile {
            display_name: Some(String::new()),
            real_name: Some("Ada Lovelace".into()),
            image_72: Some("https://a/72.png".into()),
            image_original: Some(" ".into()),
            ..Profile::default()
        };
        assert_eq!(profile.display_name(), None);
        assert_eq!(profile.real_name(), Some("Ada Lovelace"));
        assert_eq!(profile.avatar_url(), Some("https://a/72.png"));
    }
}
