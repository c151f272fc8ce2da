//! Installs the `tracing` subscriber used by the binaries and tests.
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};


/// Initialize a `fmt` subscriber filtered by `RUST_LOG`.
/// The default level is `INFO`.
///
/// Calling it more than once is harmless:
/// the first subscriber stays installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
