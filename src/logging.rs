//! Process-wide log setup.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::model::LogConfig;

/// Environment variable that overrides every configured filter
pub const LOG_ENV: &str = "SIDEBAR_TREE_LOG";

static DEBUG: OnceLock<bool> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("invalid log filter {filter:?}: {source}")]
    BadFilter {
        filter: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("could not install log subscriber: {0}")]
    Install(String),
}

/// The filter directive `init` would use right now
pub fn filter_directive(config: &LogConfig) -> String {
    directive(config, std::env::var(LOG_ENV).ok())
}

fn directive(config: &LogConfig, env: Option<String>) -> String {
    if let Some(env) = env
        && !env.trim().is_empty()
    {
        return env;
    }
    if let Some(filter) = &config.filter {
        return filter.clone();
    }
    if config.debug {
        "sidebar_tree=debug,warn".to_string()
    } else {
        "warn".to_string()
    }
}

/// Install a stderr subscriber. Call once, early; the debug flag is fixed
/// from then on.
pub fn init(config: &LogConfig) -> Result<(), LogError> {
    let filter_text = filter_directive(config);
    let filter = EnvFilter::try_new(&filter_text).map_err(|source| LogError::BadFilter {
        filter: filter_text.clone(),
        source,
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| LogError::Install(e.to_string()))?;

    let debug_on = *DEBUG.get_or_init(|| config.debug);
    tracing::debug!(filter = %filter_text, debug = debug_on, "logging initialized");
    Ok(())
}

/// Whether debug output was requested at startup
pub fn debug_enabled() -> bool {
    DEBUG.get().copied().unwrap_or(false)
}
