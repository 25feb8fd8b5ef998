use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use ledger_jobs::core::log::init_logging;
use ledger_jobs::{AppCommand, JobKind};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Keep all data in memory instead of the on-disk store
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum JobArg {
    /// Refresh asset type prices
    Prices,
    /// Delete transactions past the retention window
    Retention,
    /// Send recurring obligation reminders
    Reminders,
}

impl From<JobArg> for JobKind {
    fn from(job: JobArg) -> JobKind {
        match job {
            JobArg::Prices => JobKind::Prices,
            JobArg::Retention => JobKind::Retention,
            JobArg::Reminders => JobKind::Reminders,
        }
    }
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Store a setting value, e.g. a feed URL
    Set { key: String, value: String },
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run every job on its schedule until Ctrl-C
    Serve,
    /// Run one job once and print its report
    Run {
        #[arg(value_enum)]
        job: JobArg,
    },
    /// Create the default global asset types
    Seed,
    /// Manage stored settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Serve => AppCommand::Serve,
            Commands::Run { job } => AppCommand::Run(job.into()),
            Commands::Seed => AppCommand::Seed,
            Commands::Settings {
                command: SettingsCommand::Set { key, value },
            } => AppCommand::SetSetting { key, value },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ledger_jobs::cli::setup::setup(),
        Some(cmd) => {
            ledger_jobs::run_command(cmd.into(), cli.config_path.as_deref(), cli.in_memory).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
