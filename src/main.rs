use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use crypto_rates::cli::setup::setup;
use crypto_rates::core::log::init_logging;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for crypto_rates::AppCommand {
    fn from(cmd: Commands) -> crypto_rates::AppCommand {
        match cmd {
            Commands::Update => crypto_rates::AppCommand::Update,
            Commands::Rate { pair } => crypto_rates::AppCommand::Rate { pair },
            Commands::Last24h { pair, json } => {
                crypto_rates::AppCommand::Last24Hours { pair, json }
            }
            Commands::Day { pair, date, json } => {
                crypto_rates::AppCommand::Day { pair, date, json }
            }
            Commands::Cleanup => crypto_rates::AppCommand::Cleanup,
            Commands::Health => crypto_rates::AppCommand::Health,
            Commands::Run => crypto_rates::AppCommand::Run,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch prices once and store EUR rates
    Update,
    /// Show the current rate of a pair without storing it
    Rate {
        /// Currency pair, e.g. EUR/BTC
        #[arg(short, long)]
        pair: String,
    },
    /// Show stored rates of the last 24 hours
    Last24h {
        #[arg(short, long)]
        pair: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show stored rates of one UTC day
    Day {
        #[arg(short, long)]
        pair: String,
        /// Day in YYYY-MM-DD format
        #[arg(short, long)]
        date: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete rates older than the retention window
    Cleanup,
    /// Check that the exchange API is reachable
    Health,
    /// Update rates on a schedule until interrupted
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else if matches!(cli.command, Some(Commands::Run)) {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    init_logging(level);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => crypto_rates::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
