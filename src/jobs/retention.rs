use super::{Job, JobReport};
use crate::core::{TransactionFilter, TransactionRepository};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const RETENTION_MONTHS: u32 = 12;

/// Deletes active transactions older than the retention window.
pub struct RetentionJob {
    transactions: Arc<dyn TransactionRepository>,
    chunk_size: usize,
}

/// Oldest date that survives a run at `now`.
pub fn retention_cutoff(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    now.checked_sub_months(Months::new(RETENTION_MONTHS))
        .ok_or_else(|| anyhow!("Cannot compute retention cutoff for {now}"))
}

impl RetentionJob {
    pub fn new(transactions: Arc<dyn TransactionRepository>, chunk_size: usize) -> Self {
        Self {
            transactions,
            chunk_size: chunk_size.max(1),
        }
    }

    async fn flush(&self, staged: &mut usize, report: &mut JobReport) {
        if *staged == 0 {
            return;
        }
        match self.transactions.commit().await {
            Ok(applied) => {
                report.succeeded += applied;
                report.failed += staged.saturating_sub(applied);
            }
            Err(e) => {
                warn!(error = %e, staged = *staged, "Commit failed, chunk not deleted");
                report.failed += *staged;
            }
        }
        *staged = 0;
    }

    #[instrument(name = "Retention", skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<JobReport> {
        let mut report = JobReport::new(self.name());
        let cutoff = retention_cutoff(now)?;

        let filter = TransactionFilter {
            active_only: true,
            dated_before: Some(cutoff),
            ..Default::default()
        };
        let candidates = match self.transactions.find_transactions(&filter).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Failed to load expired transactions");
                return Err(e).context("Failed to load expired transactions");
            }
        };

        if candidates.is_empty() {
            info!(%cutoff, "No transactions past the retention window");
            return Ok(report);
        }

        let mut staged = 0;
        for tx in &candidates {
            report.attempted += 1;
            match self.transactions.delete_transaction(tx.id).await {
                Ok(()) => staged += 1,
                Err(e) => {
                    warn!(transaction_id = tx.id, error = %e, "Failed to stage delete");
                    report.failed += 1;
                }
            }
            if staged >= self.chunk_size {
                self.flush(&mut staged, &mut report).await;
            }
        }
        self.flush(&mut staged, &mut report).await;

        info!(
            %cutoff,
            deleted = report.succeeded,
            failed = report.failed,
            "Retention finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl Job for RetentionJob {
    fn name(&self) -> &'static str {
        "retention"
    }

    fn interval(&self) -> Duration {
        RETENTION_INTERVAL
    }

    async fn run(&self) -> Result<JobReport> {
        self.run_at(Utc::now()).await
    }
}
