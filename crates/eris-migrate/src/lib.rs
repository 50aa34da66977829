//! Slack export -> Discord guild migration pipeline.
//!
//! Stages, in order: connect and locate the guild, load archive metadata,
//! reconcile categories and channels, then replay each channel's history
//! through a per-channel webhook.

pub mod error;
pub mod failures;
pub mod identity;
pub mod orchestrator;
pub mod progress;
pub mod reconcile;
pub mod replay;
pub mod retry;
pub mod transform;

pub use error::MigrationError;
pub use orchestrator::{MigrationOptions, MigrationReport, MigrationState, Orchestrator};
