use thiserror::Error;

use eris_archive::ArchiveError;
use eris_discord::DestinationError;

/// Conditions that abort the whole run. Everything else degrades per
/// channel or per message.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("destination connection failed: {0}")]
    Connect(#[source] DestinationError),

    #[error("destination guild not found or inaccessible: {0}")]
    GuildUnavailable(#[source] DestinationError),

    #[error("channel metadata unusable: {0}")]
    Metadata(#[from] ArchiveError),
}
