pub mod chat;
pub mod chunk;
pub mod doctor;
pub mod serve;
pub mod tokens;

use std::path::Path;

use anyhow::Context;
use parley_config::{AppConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Load config from `path` (or the default location), apply environment
/// overrides and validate.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        None => AppConfig::load().context("failed to load config"),
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
    }
}

/// `RUST_LOG` wins; otherwise `debug` with `--verbose`, else the configured level.
pub fn init_tracing(verbose: bool, json_logs: bool, logging: Option<&LoggingConfig>) {
    let level = match (verbose, logging) {
        (true, _) => "debug",
        (false, Some(logging)) => logging.level.as_str(),
        (false, None) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = json_logs || logging.is_some_and(|l| l.format == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
