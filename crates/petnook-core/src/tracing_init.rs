//! Tracing/logging initialization for Petnook binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- filter used when `RUST_LOG` is not set
///   (e.g. `"petnook_moderation=info"`).
/// * `log_json` -- emit structured JSON lines instead of the human format.
///
/// Logs go to stderr so command output on stdout stays clean. Returns `false`
/// if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> bool {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    }
}

/// Build the default filter string for a crate at a given level.
pub fn default_filter(crate_name: &str, level: &str) -> String {
    format!("{}={level}", crate_name.replace('-', "_"))
}
