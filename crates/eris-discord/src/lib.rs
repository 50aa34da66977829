//! Destination side of the migration: the operations the pipeline needs from
//! a live Discord guild, and a REST implementation of them.

mod client;
mod error;

pub use client::{DEFAULT_API_BASE, DiscordClient};
pub use error::DestinationError;

use async_trait::async_trait;

use eris_types::destination::{
    DestinationChannel, Guild, NewChannel, OutgoingMessage, ReadyInfo, RelayEndpoint,
};

pub type Result<T> = std::result::Result<T, DestinationError>;

/// Live destination community. Every call may fail with a transport-level
/// error; callers decide whether that is fatal.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Authenticate and wait until the connection is usable.
    async fn connect(&self) -> Result<ReadyInfo>;

    /// Locate the target guild.
    async fn guild(&self) -> Result<Guild>;

    async fn list_channels(&self) -> Result<Vec<DestinationChannel>>;

    async fn create_channel(&self, channel: NewChannel) -> Result<DestinationChannel>;

    async fn set_parent(&self, channel_id: &str, parent_id: &str) -> Result<DestinationChannel>;

    async fn list_webhooks(&self, channel_id: &str) -> Result<Vec<RelayEndpoint>>;

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<RelayEndpoint>;

    async fn execute_webhook(&self, endpoint: &RelayEndpoint, message: &OutgoingMessage)
    -> Result<()>;

    /// Release the connection. The REST client holds nothing open.
    async fn close(&self) {}
}
