use std::env;
use std::io;

use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const VERBOSE_ENV: &str = "BOOKMARK_VALIDATOR_VERBOSE";

// stdout is reserved for the report.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    if verbose {
        debug!("verbose logging enabled");
    }
}

pub fn env_flag() -> bool {
    env::var(VERBOSE_ENV)
        .map(|value| parse_bool(&value))
        .unwrap_or(false)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
