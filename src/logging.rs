//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays machine readable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "rql_gateway=warn";

/// Resolve the filter directive: `RUST_LOG` wins, then the configured level.
pub fn filter_directive(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match configured {
        Some(level) if !level.trim().is_empty() => {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        _ => EnvFilter::new(DEFAULT_FILTER),
    })
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(configured: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(filter_directive(configured))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
