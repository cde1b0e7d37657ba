use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `fallback_filter` is used (see
/// [`ServerConfig::log_filter`](crate::ServerConfig::log_filter)).
/// Returns `false` if a subscriber was already installed, which is not an
/// error.
pub fn setup_logging(fallback_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}
