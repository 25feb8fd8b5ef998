//! The periodic jobs and what they report back

pub mod price_sync;
pub mod reminders;
pub mod retention;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

pub use price_sync::PriceSyncJob;
pub use reminders::RecurringReminderJob;
pub use retention::RetentionJob;

/// Outcome of one job run. Per-item problems land in `failed`; a run that
/// could not start at all is an `Err` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub job: &'static str,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl JobReport {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            ..Default::default()
        }
    }
}

impl Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: attempted={} succeeded={} failed={} skipped={}",
            self.job, self.attempted, self.succeeded, self.failed, self.skipped
        )
    }
}

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// How often the scheduler triggers this job.
    fn interval(&self) -> Duration;

    async fn run(&self) -> Result<JobReport>;
}
