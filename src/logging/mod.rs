//! Structured logging setup via `tracing`/`tracing-subscriber`, the same
//! registry + env-filter + fmt-layer stack the teacher's `main.rs` wires up.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. `log_level` is the default
/// filter directive for this crate; `RUST_LOG`, if set, overrides it
/// entirely.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warden={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
