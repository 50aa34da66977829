use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use eris_types::destination::{
    ChannelKind, DestinationChannel, Guild, NewChannel, OutgoingMessage, ReadyInfo, RelayEndpoint,
};

use crate::{Destination, DestinationError, Result};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

// -- Wire types --

#[derive(Debug, Deserialize)]
struct UserWire {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct GuildWire {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChannelWire {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

impl From<ChannelWire> for DestinationChannel {
    fn from(wire: ChannelWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name.unwrap_or_default(),
            kind: ChannelKind::from_code(wire.kind),
            parent_id: wire.parent_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookWire {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl From<WebhookWire> for RelayEndpoint {
    fn from(wire: WebhookWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            token: wire.token,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateChannelBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Discord REST client scoped to one guild, authenticated as a bot.
#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    api_base: String,
    token: String,
    guild_id: String,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, token, guild_id)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        guild_id: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            guild_id: guild_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("Authorization", format!("Bot {}", self.token))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DestinationError::Decode(e.to_string()))
    }
}

/// Map non-success statuses onto the error taxonomy.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_hint = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let secs = serde_json::from_str::<RateLimitBody>(&body)
            .map(|b| b.retry_after)
            .ok()
            .or(header_hint)
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(1.0);
        return Err(DestinationError::RateLimited {
            retry_after: Duration::from_secs_f64(secs),
        });
    }

    Err(DestinationError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Destination for DiscordClient {
    async fn connect(&self) -> Result<ReadyInfo> {
        let user: UserWire = self
            .send_json(self.authed(Method::GET, "/users/@me"))
            .await?;
        debug!("Authenticated as {} ({})", user.username, user.id);
        Ok(ReadyInfo {
            user_id: user.id,
            username: user.username,
        })
    }

    async fn guild(&self) -> Result<Guild> {
        let path = format!("/guilds/{}", self.guild_id);
        let guild: GuildWire = self.send_json(self.authed(Method::GET, &path)).await?;
        Ok(Guild {
            id: guild.id,
            name: guild.name,
        })
    }

    async fn list_channels(&self) -> Result<Vec<DestinationChannel>> {
        let path = format!("/guilds/{}/channels", self.guild_id);
        let channels: Vec<ChannelWire> = self.send_json(self.authed(Method::GET, &path)).await?;
        Ok(channels.into_iter().map(Into::into).collect())
    }

    async fn create_channel(&self, channel: NewChannel) -> Result<DestinationChannel> {
        let path = format!("/guilds/{}/channels", self.guild_id);
        let body = CreateChannelBody {
            name: &channel.name,
            kind: channel.kind.code(),
            parent_id: channel.parent_id.as_deref(),
        };
        let created: ChannelWire = self
            .send_json(self.authed(Method::POST, &path).json(&body))
            .await?;
        Ok(created.into())
    }

    async fn set_parent(&self, channel_id: &str, parent_id: &str) -> Result<DestinationChannel> {
        let path = format!("/channels/{channel_id}");
        let updated: ChannelWire = self
            .send_json(
                self.authed(Method::PATCH, &path)
                    .json(&json!({ "parent_id": parent_id })),
            )
            .await?;
        Ok(updated.into())
    }

    async fn list_webhooks(&self, channel_id: &str) -> Result<Vec<RelayEndpoint>> {
        let path = format!("/channels/{channel_id}/webhooks");
        let hooks: Vec<WebhookWire> = self.send_json(self.authed(Method::GET, &path)).await?;
        Ok(hooks.into_iter().map(Into::into).collect())
    }

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<RelayEndpoint> {
        let path = format!("/channels/{channel_id}/webhooks");
        let hook: WebhookWire = self
            .send_json(self.authed(Method::POST, &path).json(&json!({ "name": name })))
            .await?;
        Ok(hook.into())
    }

    async fn execute_webhook(
        &self,
        endpoint: &RelayEndpoint,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let token = endpoint
            .usable_token()
            .ok_or_else(|| DestinationError::MissingToken(endpoint.id.clone()))?;

        // Webhook execution is authenticated by the token in the path.
        let url = self.url(&format!("/webhooks/{}/{}?wait=true", endpoint.id, token));
        let body = execute_body(message);
        check(self.http.post(url).json(&body).send().await?).await?;
        Ok(())
    }
}

/// Replayed history must never ping anyone.
fn execute_body(message: &OutgoingMessage) -> serde_json::Value {
    let mut body = json!({
        "username": message.username,
        "content": message.content,
        "allowed_mentions": { "parse": [] },
    });
    if let Some(avatar) = &message.avatar_url {
        body["avatar_url"] = json!(avatar);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = DiscordClient::with_api_base("http://localhost:9999/api/", "t", "g");
        assert_eq!(client.url("/users/@me"), "http://localhost:9999/api/users/@me");
    }

    #[test]
    fn channel_wire_maps_to_handle() {
        let wire: ChannelWire = serde_json::from_str(
            r#"{"id":"10","type":4,"name":"Slack","parent_id":null,"position":3}"#,
        )
        .unwrap();
        let handle: DestinationChannel = wire.into();
        assert_eq!(handle.kind, ChannelKind::Category);
        assert_eq!(handle.name, "Slack");
        assert_eq!(handle.parent_id, None);
    }

    #[test]
    fn execute_body_suppresses_mentions() {
        let body = execute_body(&OutgoingMessage {
            username: "Ada".into(),
            avatar_url: None,
            content: "hello @everyone".into(),
        });
        assert_eq!(body["allowed_mentions"]["parse"], json!([]));
        assert!(body.get("avatar_url").is_none());

        let with_avatar = execute_body(&OutgoingMessage {
            username: "Ada".into(),
            avatar_url: Some("https://a/1.png".into()),
            content: "hi".into(),
        });
        assert_eq!(with_avatar["avatar_url"], "https://a/1.png");
    }
}
