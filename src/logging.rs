//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info,tower_http=info";

fn env_filter() -> EnvFilter {
    // Reads RUST_LOG, falling back to DEFAULT_FILTER
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber: JSON lines when `json` is set, compact text otherwise.
pub fn init(json: bool) {
    let builder = fmt().with_env_filter(env_filter()).with_target(false);

    let result = if json {
        builder.json().with_writer(std::io::stdout).try_init()
    } else {
        builder.compact().with_writer(std::io::stdout).try_init()
    };

    if let Err(err) = result {
        eprintln!("tracing subscriber already installed: {err}");
    }
}
