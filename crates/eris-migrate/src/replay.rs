//! Ordered replay of one channel's history through a webhook.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use eris_archive::Archive;
use eris_discord::{Destination, DestinationError};
use eris_types::destination::{DestinationChannel, RelayEndpoint};
use eris_types::failure::FailureRecord;

use crate::failures::FailureStore;
use crate::identity::MemberDirectory;
use crate::progress::{MigrationEvent, ProgressReporter};
use crate::retry::RetryPolicy;
use crate::transform::render;

/// Name given to webhooks this tool creates.
pub const RELAY_ENDPOINT_NAME: &str = "Eris";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// No messages in the archive for this channel.
    Empty,
    /// Channel directory or one of its shards could not be read.
    Unreadable(String),
    /// No destination channel with this name exists.
    NotReconciled,
    /// No webhook could be found or created.
    EndpointUnavailable(String),
    Replayed { sent: usize, failed: usize },
}

#[derive(Debug, Clone)]
pub struct ChannelReplay {
    pub channel: String,
    pub outcome: ChannelOutcome,
}

pub struct Replayer {
    destination: Arc<dyn Destination>,
    archive: Archive,
    members: Arc<MemberDirectory>,
    channels: HashMap<String, DestinationChannel>,
    failures: FailureStore,
    retry: RetryPolicy,
    reporter: Arc<dyn ProgressReporter>,
}

impl Replayer {
    pub fn new(
        destination: Arc<dyn Destination>,
        archive: Archive,
        members: Arc<MemberDirectory>,
        channels: HashMap<String, DestinationChannel>,
        failures: FailureStore,
        retry: RetryPolicy,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            destination,
            archive,
            members,
            channels,
            failures,
            retry,
            reporter,
        }
    }

    /// First webhook on the channel that carries a token, or a new one.
    pub async fn acquire_endpoint(
        &self,
        channel: &DestinationChannel,
    ) -> Result<RelayEndpoint, DestinationError> {
        let hooks = self.destination.list_webhooks(&channel.id).await?;
        if let Some(hook) = hooks.into_iter().find(|h| h.usable_token().is_some()) {
            debug!("Reusing webhook {} on #{}", hook.id, channel.name);
            return Ok(hook);
        }

        let hook = self
            .destination
            .create_webhook(&channel.id, RELAY_ENDPOINT_NAME)
            .await?;
        if hook.usable_token().is_none() {
            return Err(DestinationError::MissingToken(hook.id));
        }
        debug!("Created webhook {} on #{}", hook.id, channel.name);
        Ok(hook)
    }

    fn skip(&self, channel: &str, outcome: ChannelOutcome) -> ChannelReplay {
        let reason = match &outcome {
            ChannelOutcome::Unreadable(reason) => reason.clone(),
            ChannelOutcome::NotReconciled => "no destination channel with this name".to_string(),
            ChannelOutcome::EndpointUnavailable(reason) => format!("no webhook: {reason}"),
            ChannelOutcome::Empty | ChannelOutcome::Replayed { .. } => String::new(),
        };
        if !reason.is_empty() {
            self.reporter.report(MigrationEvent::ReplaySkipped {
                channel: channel.to_string(),
                reason,
            });
        }
        ChannelReplay {
            channel: channel.to_string(),
            outcome,
        }
    }

    /// Replay one archive channel directory. Messages go out one at a time in
    /// archive order; a failed message is recorded and the next one is sent.
    pub async fn replay(&self, channel_name: &str) -> ChannelReplay {
        let messages = match self.archive.channel_messages(channel_name).await {
            Ok(messages) => messages,
            Err(e) => return self.skip(channel_name, ChannelOutcome::Unreadable(e.to_string())),
        };
        if messages.is_empty() {
            return self.skip(channel_name, ChannelOutcome::Empty);
        }

        let Some(target) = self.channels.get(channel_name) else {
            return self.skip(channel_name, ChannelOutcome::NotReconciled);
        };

        let endpoint = match self.acquire_endpoint(target).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                return self.skip(
                    channel_name,
                    ChannelOutcome::EndpointUnavailable(e.to_string()),
                );
            }
        };

        self.reporter.report(MigrationEvent::ReplayStarted {
            channel: channel_name.to_string(),
            messages: messages.len(),
        });

        let mut sent = 0usize;
        let mut failed = 0usize;
        for message in messages {
            let payload = render(&message, &self.members, target);
            let result = self
                .retry
                .run(|| self.destination.execute_webhook(&endpoint, &payload))
                .await;

            match result {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    let error = e.to_string();
                    self.reporter.report(MigrationEvent::MessageFailed {
                        channel: channel_name.to_string(),
                        ts: message.ts.clone(),
                        error: error.clone(),
                    });
                    let record = FailureRecord {
                        ts: message.ts.clone(),
                        channel: channel_name.to_string(),
                        error,
                        recorded_at: Utc::now(),
                        message,
                        payload,
                    };
                    if let Err(e) = self.failures.record(&record).await {
                        error!(
                            "Could not persist failed message {} from #{}: {}",
                            record.ts, channel_name, e
                        );
                    }
                }
            }
        }

        self.reporter.report(MigrationEvent::ReplayFinished {
            channel: channel_name.to_string(),
            sent,
            failed,
        });
        ChannelReplay {
            channel: channel_name.to_string(),
            outcome: ChannelOutcome::Replayed { sent, failed },
        }
    }
}
