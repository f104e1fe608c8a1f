//! Subscriber setup for binaries and tests embedding gridanchor.

use tracing_subscriber::EnvFilter;

/// Directive variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "GRIDANCHOR_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,gridanchor=info";

/// Filter from `GRIDANCHOR_LOG`, else `RUST_LOG`, else warnings plus gridanchor info.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a global fmt subscriber. Returns `false` if one was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}
