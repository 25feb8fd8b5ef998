pub mod cli;
pub mod core;
pub mod jobs;
pub mod pricing;
pub mod providers;
pub mod scheduler;
pub mod seed;
pub mod store;

use crate::core::EndpointLocator;
use crate::core::config::AppConfig;
use crate::jobs::{Job, PriceSyncJob, RecurringReminderJob, RetentionJob};
use crate::pricing::PriceResolver;
use crate::providers::ExpoPushSender;
use crate::scheduler::Scheduler;
use crate::store::{DiskStore, LedgerStore, MemoryStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Prices,
    Retention,
    Reminders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Serve,
    Run(JobKind),
    Seed,
    SetSetting { key: String, value: String },
}

/// The three jobs wired to one store.
pub struct Jobs {
    pub price_sync: Arc<PriceSyncJob>,
    pub retention: Arc<RetentionJob>,
    pub reminders: Arc<RecurringReminderJob>,
}

impl Jobs {
    pub fn get(&self, kind: JobKind) -> Arc<dyn Job> {
        match kind {
            JobKind::Prices => self.price_sync.clone(),
            JobKind::Retention => self.retention.clone(),
            JobKind::Reminders => self.reminders.clone(),
        }
    }

    pub fn all(&self) -> Vec<Arc<dyn Job>> {
        vec![
            self.get(JobKind::Prices),
            self.get(JobKind::Retention),
            self.get(JobKind::Reminders),
        ]
    }
}

pub fn build_jobs<S: LedgerStore>(store: Arc<S>, config: &AppConfig) -> Result<Jobs> {
    let locator = Arc::new(EndpointLocator::new(store.clone()));
    let resolver = PriceResolver::new(
        locator,
        &config.feeds.default_url,
        Duration::from_secs(config.feeds.timeout_secs),
    )?;
    let sender = ExpoPushSender::new(
        &config.notifications.push_url,
        config.notifications.access_token.clone(),
        Duration::from_secs(config.notifications.timeout_secs),
    )?;

    Ok(Jobs {
        price_sync: Arc::new(PriceSyncJob::new(store.clone(), Arc::new(resolver))),
        retention: Arc::new(RetentionJob::new(
            store.clone(),
            config.retention.commit_chunk_size,
        )),
        reminders: Arc::new(RecurringReminderJob::new(
            store.clone(),
            store,
            Arc::new(sender),
            config.reminders.cooldown(),
        )),
    })
}

async fn execute<S: LedgerStore>(
    command: AppCommand,
    store: Arc<S>,
    config: &AppConfig,
) -> Result<()> {
    match command {
        AppCommand::Serve => {
            let jobs = build_jobs(store, config)?;
            info!("Scheduler starting, press Ctrl-C to stop");
            Scheduler::new(jobs.all()).start().await
        }
        AppCommand::Run(kind) => {
            let jobs = build_jobs(store, config)?;
            cli::run::run_once(jobs.get(kind).as_ref()).await?;
            Ok(())
        }
        AppCommand::Seed => {
            let created = seed::seed_default_asset_types(store.as_ref()).await?;
            println!("Created {created} asset type(s)");
            Ok(())
        }
        AppCommand::SetSetting { key, value } => {
            cli::settings::set_setting(store.as_ref(), &key, &value).await
        }
    }
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    in_memory: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    if in_memory {
        info!("Using in-memory store");
        return execute(command, Arc::new(MemoryStore::new()), &config).await;
    }
    let data_path = config.data_path()?;
    debug!("Opening store at {}", data_path.display());
    let store = Arc::new(DiskStore::open(&data_path)?);
    execute(command, store, &config).await
}
