//! Logging setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a `tracing` subscriber that writes to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `switchboard=info`.
/// Calling this more than once (or after another subscriber was installed)
/// leaves the existing subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("switchboard=info"));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
