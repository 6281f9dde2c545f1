//! Tracing setup for hosts that want it.
//!
//! Nothing in the workspace installs a subscriber on its own; a host
//! embedding the session calls one of these once at startup, or brings
//! its own subscriber and skips this module entirely.

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, filtered by `RUST_LOG` with an `info`
/// fallback. Panics if a global subscriber is already set.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Like [`init`], but reports an already-installed subscriber instead
/// of panicking. Handy in tests, where many bodies race to initialize.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
}
