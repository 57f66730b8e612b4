//! Logging setup utilities for the Huddle binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the library crates and the binary itself. It can be
/// overridden with the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "huddle-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info")
///
/// # Examples
///
/// ```no_run
/// use huddle_shared::logger::setup_logger;
///
/// setup_logger("huddle-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
///
/// Binary names use dashes while tracing targets use underscores, so every
/// crate name is normalized before it lands in the directive.
fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    [
        "huddle_shared",
        "huddle_server",
        "huddle_client",
        &binary_name.replace('-', "_"),
    ]
    .iter()
    .map(|target| format!("{}={}", target, default_log_level))
    .chain(std::iter::once(format!("tower_http={}", default_log_level)))
    .collect::<Vec<_>>()
    .join(",")
}
