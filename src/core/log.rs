use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. Only events from this crate pass, at
/// `level_filter` or whatever `RUST_LOG` asks for.
pub fn init_logging(level_filter: LevelFilter) {
    let level = level_filter.to_string().to_lowercase();
    let app_filter = Targets::new().with_target("crypto_rates", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .init();
}
