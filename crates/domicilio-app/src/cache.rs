//! # Per-Session Catalog Cache
//!
//! Read-through memoization of catalog fragments. Entries are immutable
//! reference data for the lifetime of the session: no TTL, no invalidation.
//! A miss goes to the gateway once; concurrent misses for the same key
//! coalesce into that single in-flight call. Failed fetches are not cached,
//! so the next user-triggered edit retries naturally.
//!
//! Postal-code `NotFound` results are cached like any other answer — the
//! catalog will not grow a code mid-session.

use crate::gateway::{CatalogGateway, PostalCodeLookup};
use crate::search::fold_key;
use async_lock::Mutex;
use domicilio_core::{
    DomicilioError, GeoState, Municipality, MunicipalityId, PostalCode, PostalCodeUsage,
    Settlement, StateId,
};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Cache key for server-side settlement pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SettlementQuery {
    municipality_id: MunicipalityId,
    /// Folded search term; two spellings that fold alike share the entry.
    term: Option<String>,
    limit: u32,
    offset: u32,
}

type Slot<T> = Arc<OnceCell<T>>;

/// Session-scoped, read-mostly catalog cache shared by every resolver.
pub struct CatalogCache {
    gateway: Arc<dyn CatalogGateway>,
    states: OnceCell<Arc<Vec<GeoState>>>,
    municipalities: Mutex<HashMap<StateId, Slot<Arc<Vec<Municipality>>>>>,
    postal_lookups: Mutex<HashMap<PostalCode, Slot<Arc<PostalCodeLookup>>>>,
    settlements: Mutex<HashMap<SettlementQuery, Slot<Arc<Vec<Settlement>>>>>,
    postal_codes: Mutex<HashMap<MunicipalityId, Slot<Arc<Vec<PostalCodeUsage>>>>>,
}

/// Fetch-or-insert the coalescing slot for `key`.
async fn slot_for<K, V>(map: &Mutex<HashMap<K, Slot<V>>>, key: K) -> Slot<V>
where
    K: Eq + Hash,
{
    map.lock().await.entry(key).or_default().clone()
}

impl CatalogCache {
    /// Create a cache over the given gateway.
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self {
            gateway,
            states: OnceCell::new(),
            municipalities: Mutex::new(HashMap::new()),
            postal_lookups: Mutex::new(HashMap::new()),
            settlements: Mutex::new(HashMap::new()),
            postal_codes: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying gateway, for the write path that bypasses caching
    /// (custom-settlement creation).
    pub fn gateway(&self) -> &Arc<dyn CatalogGateway> {
        &self.gateway
    }

    /// All states, fetched at most once per session.
    pub async fn states(&self) -> Result<Arc<Vec<GeoState>>, DomicilioError> {
        self.states
            .get_or_try_init(|| async {
                debug!("catalog cache miss: states");
                self.gateway.list_states().await.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }

    /// Municipalities of one state.
    pub async fn municipalities(
        &self,
        state_id: StateId,
    ) -> Result<Arc<Vec<Municipality>>, DomicilioError> {
        let slot = slot_for(&self.municipalities, state_id).await;
        slot.get_or_try_init(|| async {
            debug!(%state_id, "catalog cache miss: municipalities");
            self.gateway.list_municipalities(state_id).await.map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }

    /// Postal-code resolution, including cached `NotFound` answers.
    pub async fn lookup_postal_code(
        &self,
        code: &PostalCode,
    ) -> Result<Arc<PostalCodeLookup>, DomicilioError> {
        let slot = slot_for(&self.postal_lookups, code.clone()).await;
        slot.get_or_try_init(|| async {
            debug!(%code, "catalog cache miss: postal code");
            self.gateway.lookup_postal_code(code).await.map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }

    /// One page of a server-filtered settlement listing.
    pub async fn settlements(
        &self,
        municipality_id: MunicipalityId,
        search_term: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Arc<Vec<Settlement>>, DomicilioError> {
        let term = search_term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(fold_key);
        let key = SettlementQuery {
            municipality_id,
            term,
            limit,
            offset,
        };
        let slot = slot_for(&self.settlements, key).await;
        slot.get_or_try_init(|| async {
            debug!(%municipality_id, ?search_term, limit, offset, "catalog cache miss: settlements");
            self.gateway
                .list_settlements(municipality_id, search_term, limit, offset)
                .await
                .map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }

    /// Postal codes used within one municipality.
    pub async fn postal_codes(
        &self,
        municipality_id: MunicipalityId,
    ) -> Result<Arc<Vec<PostalCodeUsage>>, DomicilioError> {
        let slot = slot_for(&self.postal_codes, municipality_id).await;
        slot.get_or_try_init(|| async {
            debug!(%municipality_id, "catalog cache miss: postal codes");
            self.gateway.list_postal_codes(municipality_id).await.map(Arc::new)
        })
        .await
        .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domicilio_core::NewCustomSettlement;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Minimal gateway stub: counts calls, optionally fails once.
    #[derive(Default)]
    struct CountingGateway {
        calls: AtomicUsize,
        fail_remaining: AtomicUsize,
    }

    impl CountingGateway {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogGateway for CountingGateway {
        async fn list_states(&self) -> Result<Vec<GeoState>, DomicilioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // A little latency so concurrent misses overlap.
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(DomicilioError::network("injected failure"));
            }
            Ok(vec![GeoState {
                id: StateId::new(9),
                code: "09".to_string(),
                name: "Ciudad de México".to_string(),
            }])
        }

        async fn list_municipalities(
            &self,
            state_id: StateId,
        ) -> Result<Vec<Municipality>, DomicilioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Municipality {
                id: MunicipalityId::new(15),
                code: "015".to_string(),
                name: "Cuauhtémoc".to_string(),
                state_id,
            }])
        }

        async fn lookup_postal_code(
            &self,
            _code: &PostalCode,
        ) -> Result<PostalCodeLookup, DomicilioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PostalCodeLookup::NotFound)
        }

        async fn list_settlements(
            &self,
            _municipality_id: MunicipalityId,
            _search_term: Option<&str>,
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Settlement>, DomicilioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn list_postal_codes(
            &self,
            _municipality_id: MunicipalityId,
        ) -> Result<Vec<PostalCodeUsage>, DomicilioError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn create_custom_settlement(
            &self,
            _request: NewCustomSettlement,
        ) -> Result<Settlement, DomicilioError> {
            Err(DomicilioError::internal("not used in cache tests"))
        }
    }

    fn cache_over(gateway: Arc<CountingGateway>) -> CatalogCache {
        CatalogCache::new(gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_after_miss_skips_gateway() {
        let gateway = Arc::new(CountingGateway::default());
        let cache = cache_over(gateway.clone());

        let first = cache.states().await.unwrap();
        let second = cache.states().await.unwrap();

        assert_eq!(gateway.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_coalesce() {
        let gateway = Arc::new(CountingGateway::default());
        let cache = cache_over(gateway.clone());

        let (a, b) = tokio::join!(cache.states(), cache.states());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let gateway = Arc::new(CountingGateway::default());
        gateway.fail_remaining.store(1, Ordering::SeqCst);
        let cache = cache_over(gateway.clone());

        assert!(cache.states().await.is_err());
        assert!(cache.states().await.is_ok());
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_cached() {
        let gateway = Arc::new(CountingGateway::default());
        let cache = cache_over(gateway.clone());
        let code = PostalCode::parse("99999").unwrap();

        let first = cache.lookup_postal_code(&code).await.unwrap();
        let second = cache.lookup_postal_code(&code).await.unwrap();

        assert!(!first.is_found());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_pages_key_on_folded_term() {
        let gateway = Arc::new(CountingGateway::default());
        let cache = cache_over(gateway.clone());
        let muni = MunicipalityId::new(15);

        cache.settlements(muni, Some("Juárez"), 50, 0).await.unwrap();
        cache.settlements(muni, Some("juarez"), 50, 0).await.unwrap();
        assert_eq!(gateway.calls(), 1);

        cache.settlements(muni, Some("juarez"), 50, 50).await.unwrap();
        assert_eq!(gateway.calls(), 2);
    }
}
