use crate::jobs::Job;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

/// Runs every job on its own cadence until shut down.
pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
}

async fn run_periodically(job: Arc<dyn Job>) {
    let mut ticker = interval(job.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match job.run().await {
            Ok(report) => info!(job = job.name(), %report, "Job run complete"),
            Err(e) => error!(job = job.name(), error = %e, "Job run failed"),
        }
    }
}

impl Scheduler {
    pub fn new(jobs: Vec<Arc<dyn Job>>) -> Self {
        Self { jobs }
    }

    /// Runs until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")
        };
        self.run_until(shutdown).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let handles: Vec<JoinHandle<()>> = self
            .jobs
            .into_iter()
            .map(|job| {
                info!(job = job.name(), every = ?job.interval(), "Scheduling job");
                tokio::spawn(run_periodically(job))
            })
            .collect();

        let result = shutdown.await;
        info!("Shutting down scheduler");
        for handle in handles {
            handle.abort();
        }
        result
    }
}
