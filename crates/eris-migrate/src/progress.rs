//! Progress reporting for a migration run.
//!
//! Pipeline stages emit typed events; the reporter decides where they go.

use std::fmt;

use crate::orchestrator::MigrationState;

/// Events emitted while a migration runs.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationEvent {
    /// Orchestrator moved to a new state
    StateChanged { state: MigrationState },
    CategoryExists { name: String },
    CategoryCreated { name: String },
    CategoryFailed { name: String, error: String },
    ChannelExists { name: String },
    ChannelCreated { name: String },
    ChannelFailed { name: String, error: String },
    /// Channel attached to its category after creation
    ChannelParented { name: String, category: String },
    ParentFailed { name: String, error: String },
    ReplayStarted { channel: String, messages: usize },
    /// Channel not replayed (unreadable, not reconciled, no endpoint)
    ReplaySkipped { channel: String, reason: String },
    MessageFailed { channel: String, ts: String, error: String },
    ReplayFinished { channel: String, sent: usize, failed: usize },
}

impl MigrationEvent {
    fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CategoryFailed { .. }
                | Self::ChannelFailed { .. }
                | Self::ParentFailed { .. }
                | Self::ReplaySkipped { .. }
                | Self::MessageFailed { .. }
        )
    }
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateChanged { state } => write!(f, "state={state:?}"),
            Self::CategoryExists { name } => write!(f, "category '{name}' already exists"),
            Self::CategoryCreated { name } => write!(f, "created category '{name}'"),
            Self::CategoryFailed { name, error } => {
                write!(f, "failed to create category '{name}': {error}")
            }
            Self::ChannelExists { name } => write!(f, "channel #{name} already exists"),
            Self::ChannelCreated { name } => write!(f, "created channel #{name}"),
            Self::ChannelFailed { name, error } => {
                write!(f, "failed to create channel #{name}: {error}")
            }
            Self::ChannelParented { name, category } => {
                write!(f, "moved #{name} under '{category}'")
            }
            Self::ParentFailed { name, error } => {
                write!(f, "failed to parent #{name}: {error}")
            }
            Self::ReplayStarted { channel, messages } => {
                write!(f, "replaying {messages} messages into #{channel}")
            }
            Self::ReplaySkipped { channel, reason } => {
                write!(f, "skipping #{channel}: {reason}")
            }
            Self::MessageFailed { channel, ts, error } => {
                write!(f, "message {ts} in #{channel} failed: {error}")
            }
            Self::ReplayFinished { channel, sent, failed } => {
                write!(f, "finished #{channel} sent={sent} failed={failed}")
            }
        }
    }
}

/// Sink for migration events. Implementations can write to tracing, collect
/// events for inspection, or discard them.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: MigrationEvent);
}

/// Reporter that uses the `tracing` crate.
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: MigrationEvent) {
        if event.is_failure() {
            tracing::warn!("{}", event);
            return;
        }
        match &event {
            MigrationEvent::StateChanged { .. } => tracing::debug!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

/// No-op reporter.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: MigrationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let event = MigrationEvent::ReplayFinished {
            channel: "general".into(),
            sent: 10,
            failed: 1,
        };
        assert_eq!(event.to_string(), "finished #general sent=10 failed=1");

        let exists = MigrationEvent::CategoryExists {
            name: "Slack".into(),
        };
        assert_eq!(exists.to_string(), "category 'Slack' already exists");
        assert!(!exists.is_failure());
    }
}
