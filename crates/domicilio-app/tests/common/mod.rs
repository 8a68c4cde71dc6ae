//! Shared setup for resolver integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use domicilio_app::{AddressResolver, CatalogCache, ResolverConfig};
use domicilio_testkit::FixtureCatalogGateway;
use std::sync::Arc;

/// A resolver over the standard fixture, plus handles to the shared pieces.
pub struct TestSession {
    pub gateway: Arc<FixtureCatalogGateway>,
    pub cache: Arc<CatalogCache>,
    pub resolver: AddressResolver,
}

/// Build a session with the default configuration.
pub fn session() -> TestSession {
    session_with(ResolverConfig::default())
}

/// Build a session with a custom configuration.
pub fn session_with(config: ResolverConfig) -> TestSession {
    domicilio_testkit::init_test_tracing();
    let gateway = Arc::new(FixtureCatalogGateway::sepomex_sample());
    let cache = Arc::new(CatalogCache::new(gateway.clone()));
    let resolver = AddressResolver::new(cache.clone(), config);
    TestSession {
        gateway,
        cache,
        resolver,
    }
}
