use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

use eris_archive::Archive;
use eris_discord::Destination;

use crate::error::MigrationError;
use crate::failures::FailureStore;
use crate::identity::MemberDirectory;
use crate::progress::{MigrationEvent, ProgressReporter};
use crate::reconcile::{Reconciler, StructureReport};
use crate::replay::{ChannelOutcome, Replayer};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    Authenticated,
    StructureReconciled,
    Replaying,
    Done,
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Upper bound on concurrent destination operations in each fan-out
    /// stage (channel creation, parenting, channel replay).
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub failures_dir: PathBuf,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
            failures_dir: PathBuf::from("failed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub structure: StructureReport,
    pub channels_replayed: usize,
    pub channels_skipped: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

pub struct Orchestrator {
    destination: Arc<dyn Destination>,
    archive: Archive,
    options: MigrationOptions,
    reporter: Arc<dyn ProgressReporter>,
    state: MigrationState,
}

impl Orchestrator {
    pub fn new(
        destination: Arc<dyn Destination>,
        archive: Archive,
        options: MigrationOptions,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            destination,
            archive,
            options,
            reporter,
            state: MigrationState::NotStarted,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    fn advance(&mut self, state: MigrationState) {
        self.state = state;
        self.reporter.report(MigrationEvent::StateChanged { state });
    }

    /// Run the whole migration. Only an unreachable guild or unusable channel
    /// metadata abort the run; everything else is counted in the report.
    pub async fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        let ready = self
            .destination
            .connect()
            .await
            .map_err(MigrationError::Connect)?;
        let guild = self
            .destination
            .guild()
            .await
            .map_err(MigrationError::GuildUnavailable)?;
        info!(
            "Connected as {} to guild '{}' ({})",
            ready.username, guild.name, guild.id
        );
        self.advance(MigrationState::Authenticated);

        // Metadata is read before anything on the destination is touched.
        let channels = self.archive.channels().await.inspect_err(|e| {
            error!("Cannot read channel metadata: {}", e);
        })?;
        let members = match self.archive.members().await {
            Ok(members) => members,
            Err(e) => {
                warn!("Member directory unavailable, names fall back to placeholders: {}", e);
                Vec::new()
            }
        };
        let members = Arc::new(MemberDirectory::new(members));
        info!(
            "Archive has {} channels and {} members",
            channels.len(),
            members.len()
        );

        let reconciler = Reconciler::load(
            self.destination.clone(),
            self.reporter.clone(),
            self.options.concurrency,
        )
        .await
        .map_err(MigrationError::GuildUnavailable)?;
        let structure = reconciler.reconcile_structure(&channels).await;
        self.advance(MigrationState::StructureReconciled);

        let dirs = match self.archive.channel_dirs().await {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("Cannot list channel directories, nothing to replay: {}", e);
                Vec::new()
            }
        };

        let replayer = Replayer::new(
            self.destination.clone(),
            self.archive.clone(),
            members,
            reconciler.text_channels().await,
            FailureStore::new(self.options.failures_dir.clone()),
            self.options.retry.clone(),
            self.reporter.clone(),
        );

        self.advance(MigrationState::Replaying);
        let results: Vec<_> = stream::iter(&dirs)
            .map(|dir| replayer.replay(dir))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut report = MigrationReport {
            structure,
            ..MigrationReport::default()
        };
        for result in results {
            match result.outcome {
                ChannelOutcome::Replayed { sent, failed } => {
                    report.channels_replayed += 1;
                    report.messages_sent += sent;
                    report.messages_failed += failed;
                }
                ChannelOutcome::Empty => {}
                ChannelOutcome::Unreadable(_)
                | ChannelOutcome::NotReconciled
                | ChannelOutcome::EndpointUnavailable(_) => report.channels_skipped += 1,
            }
        }

        self.destination.close().await;
        self.advance(MigrationState::Done);
        info!(
            channels_created = report.structure.channels_created,
            channels_existing = report.structure.channels_existing,
            channels_replayed = report.channels_replayed,
            channels_skipped = report.channels_skipped,
            messages_sent = report.messages_sent,
            messages_failed = report.messages_failed,
            "Migration finished"
        );
        if report.messages_failed > 0 {
            warn!(
                "{} messages could not be relayed; see {}",
                report.messages_failed,
                self.options.failures_dir.display()
            );
        }
        Ok(report)
    }
}
