//! Diagnostic tracing for the coach binary.
//!
//! The decision journal is the record of a session; this is only for
//! watching the engine work. Reads `RUST_LOG`, defaults to `warn`, writes
//! compact lines to stderr so stdout stays clean for command output.
//!
//! ```bash
//! RUST_LOG=coach=debug coach simulate P01
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, from `main`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
