use serde::{Deserialize, Serialize};

/// Discord channel type codes the migration cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Category,
    Other(u8),
}

impl ChannelKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Text,
            4 => Self::Category,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Category => 4,
            Self::Other(code) => code,
        }
    }
}

/// Target community (guild) the archive is replayed into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

/// Identity the destination connection authenticated as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyInfo {
    pub user_id: String,
    pub username: String,
}

/// Live channel or category handle. Categories are channels with
/// `kind == ChannelKind::Category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationChannel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<String>,
}

/// Request body for channel creation.
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<String>,
}

/// Webhook attached to a destination channel. Only webhooks that expose a
/// token can be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub id: String,
    pub name: Option<String>,
    pub token: Option<String>,
}

impl RelayEndpoint {
    pub fn usable_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Fully rendered message, ready to post through a relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub content: String,
}
