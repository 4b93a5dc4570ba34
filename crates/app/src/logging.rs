//! Process-wide tracing setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The binary crate is `slinky`, so its own events carry `slinky::*` targets.
const DEFAULT_FILTER: &str = "slinky=info,services=info,storage=warn,tower_http=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to [`DEFAULT_FILTER`] when unset or invalid.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=services=debug,storage=debug slinky --questions questions.yaml
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses_and_covers_the_binary() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        let binary = format!("{}=", env!("CARGO_BIN_NAME"));
        assert!(DEFAULT_FILTER.split(',').any(|d| d.starts_with(&binary)));
    }
}
