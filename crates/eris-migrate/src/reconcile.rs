//! Idempotent creation of the destination structure.
//!
//! Identity is the channel name: anything already present under the same
//! name (and kind) is treated as migrated and left alone.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::debug;

use eris_discord::{Destination, DestinationError};
use eris_types::archive::ArchivedChannel;
use eris_types::destination::{ChannelKind, DestinationChannel, NewChannel};

use crate::progress::{MigrationEvent, ProgressReporter};

/// Category holding channels that are still active in the export.
pub const ACTIVE_CATEGORY: &str = "Slack";
/// Category holding channels archived in the export.
pub const ARCHIVED_CATEGORY: &str = "Slack (Archived)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Existing,
    Created,
}

#[derive(Debug, Clone)]
pub struct Ensured {
    pub handle: DestinationChannel,
    pub outcome: Outcome,
}

/// The two top-level groupings. Either may be missing if its creation
/// failed; channels of that grouping then stay unparented.
#[derive(Debug, Clone, Default)]
pub struct Categories {
    pub active: Option<DestinationChannel>,
    pub archived: Option<DestinationChannel>,
}

impl Categories {
    pub fn for_channel(&self, channel: &ArchivedChannel) -> Option<&DestinationChannel> {
        if channel.is_archived {
            self.archived.as_ref()
        } else {
            self.active.as_ref()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureReport {
    pub categories_created: usize,
    pub channels_created: usize,
    pub channels_existing: usize,
    pub channels_failed: usize,
    pub channels_parented: usize,
    pub parent_failures: usize,
}

pub struct Reconciler {
    destination: Arc<dyn Destination>,
    reporter: Arc<dyn ProgressReporter>,
    concurrency: usize,
    /// Snapshot of the guild's channels, updated as we create or move them.
    /// Concurrent ensures may both miss and create duplicates; accepted.
    cache: RwLock<Vec<DestinationChannel>>,
}

impl Reconciler {
    /// Fetch the current channel list and build a reconciler around it.
    pub async fn load(
        destination: Arc<dyn Destination>,
        reporter: Arc<dyn ProgressReporter>,
        concurrency: usize,
    ) -> Result<Self, DestinationError> {
        let channels = destination.list_channels().await?;
        debug!("Destination has {} channels", channels.len());
        Ok(Self {
            destination,
            reporter,
            concurrency: concurrency.max(1),
            cache: RwLock::new(channels),
        })
    }

    async fn lookup(&self, name: &str, kind: ChannelKind) -> Option<DestinationChannel> {
        self.cache
            .read()
            .await
            .iter()
            .find(|c| c.kind == kind && c.name == name)
            .cloned()
    }

    async fn remember(&self, channel: DestinationChannel) {
        let mut cache = self.cache.write().await;
        match cache.iter_mut().find(|c| c.id == channel.id) {
            Some(slot) => *slot = channel,
            None => cache.push(channel),
        }
    }

    async fn ensure(
        &self,
        name: &str,
        kind: ChannelKind,
        parent: Option<&DestinationChannel>,
    ) -> Result<Ensured, DestinationError> {
        if let Some(existing) = self.lookup(name, kind).await {
            return Ok(Ensured {
                handle: existing,
                outcome: Outcome::Existing,
            });
        }

        let created = self
            .destination
            .create_channel(NewChannel {
                name: name.to_string(),
                kind,
                parent_id: parent.map(|p| p.id.clone()),
            })
            .await?;
        self.remember(created.clone()).await;
        Ok(Ensured {
            handle: created,
            outcome: Outcome::Created,
        })
    }

    pub async fn ensure_category(&self, name: &str) -> Result<Ensured, DestinationError> {
        let ensured = self.ensure(name, ChannelKind::Category, None).await?;
        let name = name.to_string();
        self.reporter.report(match ensured.outcome {
            Outcome::Existing => MigrationEvent::CategoryExists { name },
            Outcome::Created => MigrationEvent::CategoryCreated { name },
        });
        Ok(ensured)
    }

    pub async fn ensure_channel(
        &self,
        name: &str,
        parent: Option<&DestinationChannel>,
    ) -> Result<Ensured, DestinationError> {
        let ensured = self.ensure(name, ChannelKind::Text, parent).await?;
        let name = name.to_string();
        self.reporter.report(match ensured.outcome {
            Outcome::Existing => MigrationEvent::ChannelExists { name },
            Outcome::Created => MigrationEvent::ChannelCreated { name },
        });
        Ok(ensured)
    }

    /// Both groupings are independent, so they are ensured concurrently.
    pub async fn ensure_categories(&self, report: &mut StructureReport) -> Categories {
        let (active, archived) = tokio::join!(
            self.ensure_category(ACTIVE_CATEGORY),
            self.ensure_category(ARCHIVED_CATEGORY),
        );

        let mut categories = Categories::default();
        for (name, result, slot) in [
            (ACTIVE_CATEGORY, active, &mut categories.active),
            (ARCHIVED_CATEGORY, archived, &mut categories.archived),
        ] {
            match result {
                Ok(ensured) => {
                    if ensured.outcome == Outcome::Created {
                        report.categories_created += 1;
                    }
                    *slot = Some(ensured.handle);
                }
                Err(e) => self.reporter.report(MigrationEvent::CategoryFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                }),
            }
        }
        categories
    }

    /// One destination channel per source channel, fanned out.
    pub async fn create_channels(
        &self,
        channels: &[ArchivedChannel],
        categories: &Categories,
        report: &mut StructureReport,
    ) {
        let results: Vec<_> = stream::iter(channels)
            .map(|channel| async move {
                let name = channel.destination_name();
                let result = self
                    .ensure_channel(&name, categories.for_channel(channel))
                    .await;
                (name, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (name, result) in results {
            match result {
                Ok(Ensured {
                    outcome: Outcome::Created,
                    ..
                }) => report.channels_created += 1,
                Ok(Ensured {
                    outcome: Outcome::Existing,
                    ..
                }) => report.channels_existing += 1,
                Err(e) => {
                    report.channels_failed += 1;
                    self.reporter.report(MigrationEvent::ChannelFailed {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Attach every channel that lacks a parent to its grouping. Failures
    /// are reported and otherwise ignored.
    pub async fn parent_channels(
        &self,
        channels: &[ArchivedChannel],
        categories: &Categories,
        report: &mut StructureReport,
    ) {
        let mut pending = Vec::new();
        for channel in channels {
            let Some(category) = categories.for_channel(channel) else {
                continue;
            };
            let name = channel.destination_name();
            match self.lookup(&name, ChannelKind::Text).await {
                Some(handle) if handle.parent_id.is_none() => {
                    pending.push((name, handle, category.clone()))
                }
                _ => {}
            }
        }

        let results: Vec<_> = stream::iter(pending)
            .map(|(name, handle, category)| async move {
                let result = self.destination.set_parent(&handle.id, &category.id).await;
                (name, category, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (name, category, result) in results {
            match result {
                Ok(updated) => {
                    self.remember(updated).await;
                    report.channels_parented += 1;
                    self.reporter.report(MigrationEvent::ChannelParented {
                        name,
                        category: category.name,
                    });
                }
                Err(e) => {
                    report.parent_failures += 1;
                    self.reporter.report(MigrationEvent::ParentFailed {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Categories, then channels, then parenting. Each stage needs the
    /// handles of the previous one.
    pub async fn reconcile_structure(&self, channels: &[ArchivedChannel]) -> StructureReport {
        let mut report = StructureReport::default();
        let categories = self.ensure_categories(&mut report).await;
        self.create_channels(channels, &categories, &mut report).await;
        self.parent_channels(channels, &categories, &mut report).await;
        report
    }

    pub async fn find_channel(&self, name: &str) -> Option<DestinationChannel> {
        self.lookup(name, ChannelKind::Text).await
    }

    /// Text channels by name, first match wins.
    pub async fn text_channels(&self) -> HashMap<String, DestinationChannel> {
        let cache = self.cache.read().await;
        let mut by_name = HashMap::new();
        for channel in cache.iter().filter(|c| c.kind == ChannelKind::Text) {
            by_name
                .entry(channel.name.clone())
                .or_insert_with(|| channel.clone());
        }
        by_name
    }
}
