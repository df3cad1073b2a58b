//! Logging setup using tracing.
//!
//! Log lines go to stderr so that command output on stdout stays parseable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity level (`-v` count).
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,dnac=info,dnac_intent=info",
        1 => "info,dnac_intent=debug,dnac_connector_rest=debug",
        _ => "debug",
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity-derived filter.
pub fn init_logging(verbosity: u8, json: bool) {
    let filter = default_filter(verbosity);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter_layer);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }

    tracing::debug!(filter = %filter, json, "Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_by_verbosity() {
        assert!(default_filter(0).starts_with("warn"));
        assert!(default_filter(1).contains("dnac_intent=debug"));
        assert_eq!(default_filter(5), "debug");
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(0, false);
        init_logging(2, true);
    }
}
