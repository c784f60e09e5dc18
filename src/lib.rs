pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::{QueryKind, RateService, RateStore};
use crate::providers::{BinanceClient, RetryExecutor, RetryPolicy};
use crate::store::memory::MemoryRateStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub enum AppCommand {
    Update,
    Rate { pair: String },
    Last24Hours { pair: String, json: bool },
    Day { pair: String, date: String, json: bool },
    Cleanup,
    Health,
    Run,
}

fn build_service(config: &AppConfig, store: Arc<dyn RateStore>) -> Result<RateService> {
    let fetcher = BinanceClient::new(&config.exchange.base_url)?;
    let policy = RetryPolicy::new(
        config.retry.max_attempts,
        Duration::from_millis(config.retry.base_delay_ms),
    );

    Ok(RateService::new(
        Arc::new(fetcher),
        store,
        RetryExecutor::new(policy),
        Arc::new(SystemClock),
    )
    .with_retention(config.retention()))
}

/// Service over the persistent rate history.
fn history_service(config: &AppConfig) -> Result<RateService> {
    let store = store::open_rate_store(config)?;
    build_service(config, Arc::new(store))
}

/// Service for commands that never read or write history; the store stays closed.
fn stateless_service(config: &AppConfig) -> Result<RateService> {
    build_service(config, Arc::new(MemoryRateStore::new()))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Update => cli::update::update(&history_service(&config)?).await,
        AppCommand::Rate { pair } => {
            cli::update::current_rate(&stateless_service(&config)?, &pair).await
        }
        AppCommand::Last24Hours { pair, json } => {
            let result = history_service(&config)?.get_last_24_hours(&pair).await;
            cli::rates::run(result, QueryKind::Last24Hours, json)
        }
        AppCommand::Day { pair, date, json } => {
            let result = history_service(&config)?
                .get_rates_by_date(&pair, &date)
                .await;
            cli::rates::run(result, QueryKind::Day, json)
        }
        AppCommand::Cleanup => cli::update::cleanup(&history_service(&config)?).await,
        AppCommand::Health => cli::update::health(&stateless_service(&config)?).await,
        AppCommand::Run => {
            let service = Arc::new(history_service(&config)?);
            cli::schedule::run(service, config.schedule.interval()).await
        }
    }
}
