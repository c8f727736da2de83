//! Tracing/logging setup shared by tests and embedding applications.
//!
//! The ledger crates emit structured events through `tracing`; this crate
//! wires up a subscriber for processes that have no opinion of their own.

use tracing_subscriber::EnvFilter;

/// Initialize logging with the default filter.
///
/// Honors `RUST_LOG` when set, otherwise logs the ledger crates at `info`.
/// Safe to call multiple times (subsequent calls are no-ops), which lets
/// every test call it without coordination.
pub fn init() {
    init_with_filter("pocketmoney=info");
}

/// Initialize logging with an explicit fallback filter directive.
pub fn init_with_filter(directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init();
        init_with_filter("pocketmoney=debug");
        tracing::info!("subscriber accepts events after init");
    }
}
