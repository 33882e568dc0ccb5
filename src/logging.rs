//! Tracing subscriber setup for the CLI and server.

use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1` for JSON lines instead of the human-readable format.
pub const LOG_JSON_ENV: &str = "VEHREG_LOG_JSON";

const DEFAULT_FILTER: &str = "vehreg=info,tower_http=info,warn";

pub fn init_logging() { init_logging_with(DEFAULT_FILTER) }

/// `RUST_LOG` wins over `default_filter` when set.
pub fn init_logging_with(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let use_json = std::env::var(LOG_JSON_ENV)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
