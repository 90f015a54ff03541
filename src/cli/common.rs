//! Shared helpers for command handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reviewdesk::config::Config;

use super::LogFormat;

/// Install the global subscriber. `RUST_LOG` wins over `verbose`. Logs go
/// to stderr so report output on stdout stays clean.
pub(crate) fn init_logging(verbose: bool, format: LogFormat) {
    let default_directive = if verbose { "info,reviewdesk=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        }))
        .init();
}

/// Load config from `path` (or the default location) and apply the
/// `--cache-root` override.
pub(crate) fn load_config(path: Option<&Path>, cache_root: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().with_context(|| "Failed to load configuration")?,
    };
    if let Some(root) = cache_root {
        config.cache.root = root;
    }
    Ok(config)
}
