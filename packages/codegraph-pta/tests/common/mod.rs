//! Common test utilities for codegraph-pta
//!
//! Program fixtures for lambda and reflection scenarios, plus assertions
//! over call edges and pointer flow.

#![allow(dead_code)]

mod assertions;
mod fixtures;

// Re-export all utilities
pub use assertions::*;
pub use fixtures::*;

/// Route solver and plugin logs to the test harness (`RUST_LOG=codegraph_pta=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
