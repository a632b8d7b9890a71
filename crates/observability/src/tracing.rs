//! Tracing/logging initialization.
//!
//! Log fields carry ids, codes and hashed fingerprints only; raw emails,
//! display names, passwords and secrets never reach a log line.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize tracing for the process from `RUST_LOG`.
///
/// Safe to call multiple times; returns `false` when a global subscriber was
/// already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Initialize tracing with an explicit filter directive (e.g. `"custodia=debug"`).
pub fn init_with_filter(directive: &str) -> bool {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

fn install(filter: EnvFilter) -> bool {
    // JSON logs + timestamps.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_with_filter("debug");
        assert!(!init());
        ::tracing::info!(component = "observability", "still logging after repeated init");
    }

    #[test]
    fn bad_directive_falls_back_to_default() {
        // Either call may install first; neither panics.
        let _ = init_with_filter("not a [valid directive");
        let _ = init();
    }
}
