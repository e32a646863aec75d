//! Tracing setup for binaries.
//!
//! The library only emits `tracing` events; it never installs a subscriber.
//! Binaries call [`init`] once at startup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a compact stderr subscriber filtered by `RUST_LOG`.
///
/// Defaults to `warn` if `RUST_LOG` is unset or invalid. Calling this twice
/// leaves the first subscriber in place.
///
/// ```bash
/// RUST_LOG=breakpoints=debug breakpoint-sim states.json 1200 700
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber installed earlier (a test harness, a second call) wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
