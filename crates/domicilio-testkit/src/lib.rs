//! Domicilio testing infrastructure
//!
//! Deterministic fixtures for the geographic catalog plus an instrumented
//! [`CatalogGateway`](domicilio_app::CatalogGateway) implementation with
//! call counting, scripted failures, and latency gates for out-of-order
//! delivery tests.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! domicilio-testkit = { path = "../domicilio-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,no_run
//! use domicilio_testkit::*;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let gateway = Arc::new(FixtureCatalogGateway::sepomex_sample());
//! let cache = Arc::new(domicilio_app::CatalogCache::new(gateway.clone()));
//! // ... drive a resolver against the fixture
//! # }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod gateway;

pub use fixtures::*;
pub use gateway::FixtureCatalogGateway;

use std::future::Future;
use std::time::Duration;

/// Initialize test logging once per process, honoring `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds, yielding to the runtime between polls.
///
/// Designed for `start_paused` tests: the 1 ms sleeps auto-advance the
/// paused clock whenever every task is otherwise idle. Panics after a
/// generous poll budget so a broken condition fails fast instead of
/// hanging.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..10_000 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not met within the wait budget");
}
