//! Instrumented in-memory catalog gateway
//!
//! Serves [`FixtureCatalog`] data through the real `CatalogGateway` seam,
//! with the control knobs tests need:
//!
//! - **call counters** per gateway method (coalescing assertions),
//! - **scripted failures** (`fail_next`) for transport-error paths,
//! - **latency gates** (`hold_calls` / `release`) to park calls mid-flight
//!   and complete them in any order, which is how out-of-order delivery is
//!   simulated under a paused clock.

use crate::fixtures::FixtureCatalog;
use async_lock::Mutex;
use async_trait::async_trait;
use domicilio_app::gateway::{CatalogGateway, PostalCodeLookup};
use domicilio_app::search::fold_key;
use domicilio_core::{
    DomicilioError, GeoState, Municipality, MunicipalityId, NewCustomSettlement, PostalCode,
    PostalCodeUsage, Settlement, SettlementId, StateId,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// First identifier handed out for custom settlements.
const CUSTOM_ID_BASE: u32 = 1000;

/// Deterministic, instrumented `CatalogGateway` implementation.
pub struct FixtureCatalogGateway {
    catalog: FixtureCatalog,
    created: Mutex<Vec<Settlement>>,
    next_custom_id: AtomicU32,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail_queue: Mutex<VecDeque<DomicilioError>>,
    holding: AtomicBool,
    parked: Mutex<Vec<oneshot::Sender<()>>>,
}

impl FixtureCatalogGateway {
    /// Gateway over an arbitrary catalog slice.
    pub fn new(catalog: FixtureCatalog) -> Self {
        Self {
            catalog,
            created: Mutex::new(Vec::new()),
            next_custom_id: AtomicU32::new(CUSTOM_ID_BASE),
            calls: Mutex::new(HashMap::new()),
            fail_queue: Mutex::new(VecDeque::new()),
            holding: AtomicBool::new(false),
            parked: Mutex::new(Vec::new()),
        }
    }

    /// Gateway over the standard fixture.
    pub fn sepomex_sample() -> Self {
        Self::new(FixtureCatalog::sepomex_sample())
    }

    // =========================================================================
    // Instrumentation
    // =========================================================================

    /// Number of calls made to one gateway method.
    pub async fn call_count(&self, method: &'static str) -> usize {
        self.calls.lock().await.get(method).copied().unwrap_or(0)
    }

    /// Total calls across all methods.
    pub async fn total_calls(&self) -> usize {
        self.calls.lock().await.values().sum()
    }

    /// Script the next call to fail with `error`. Queued errors apply one
    /// per call, in order, across all methods.
    pub async fn fail_next(&self, error: DomicilioError) {
        self.fail_queue.lock().await.push_back(error);
    }

    /// Park subsequent calls until released (latency gate).
    pub fn hold_calls(&self, hold: bool) {
        self.holding.store(hold, Ordering::SeqCst);
    }

    /// Number of calls currently parked.
    pub async fn parked_calls(&self) -> usize {
        self.parked.lock().await.len()
    }

    /// Wait until at least `n` calls are parked.
    pub async fn wait_for_parked(&self, n: usize) {
        for _ in 0..10_000 {
            if self.parked_calls().await >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {n} parked calls within the wait budget");
    }

    /// Release the parked call at `index` (in arrival order).
    pub async fn release(&self, index: usize) {
        let sender = self.parked.lock().await.remove(index);
        let _ = sender.send(());
    }

    /// Release every parked call, oldest first.
    pub async fn release_all(&self) {
        for sender in self.parked.lock().await.drain(..) {
            let _ = sender.send(());
        }
    }

    /// Count, fail, or park the incoming call per the scripted knobs.
    async fn enter(&self, method: &'static str) -> Result<(), DomicilioError> {
        {
            let mut calls = self.calls.lock().await;
            *calls.entry(method).or_insert(0) += 1;
        }
        if let Some(error) = self.fail_queue.lock().await.pop_front() {
            return Err(error);
        }
        let gate = if self.holding.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.parked.lock().await.push(tx);
            Some(rx)
        } else {
            None
        };
        if let Some(rx) = gate {
            // A dropped sender counts as a release.
            let _ = rx.await;
        }
        Ok(())
    }

    /// Catalog plus session-created settlements.
    async fn all_settlements(&self) -> Vec<Settlement> {
        let mut all = self.catalog.settlements.clone();
        all.extend(self.created.lock().await.iter().cloned());
        all
    }

    fn municipality_row(&self, id: MunicipalityId) -> Result<Municipality, DomicilioError> {
        self.catalog
            .municipality(id)
            .cloned()
            .ok_or_else(|| DomicilioError::not_found(format!("municipality {id}")))
    }

    fn state_row(&self, id: StateId) -> Result<GeoState, DomicilioError> {
        self.catalog
            .state(id)
            .cloned()
            .ok_or_else(|| DomicilioError::not_found(format!("state {id}")))
    }
}

#[async_trait]
impl CatalogGateway for FixtureCatalogGateway {
    async fn list_states(&self) -> Result<Vec<GeoState>, DomicilioError> {
        self.enter("list_states").await?;
        Ok(self.catalog.states.clone())
    }

    async fn list_municipalities(
        &self,
        state_id: StateId,
    ) -> Result<Vec<Municipality>, DomicilioError> {
        self.enter("list_municipalities").await?;
        Ok(self
            .catalog
            .municipalities
            .iter()
            .filter(|m| m.state_id == state_id)
            .cloned()
            .collect())
    }

    async fn lookup_postal_code(
        &self,
        code: &PostalCode,
    ) -> Result<PostalCodeLookup, DomicilioError> {
        self.enter("lookup_postal_code").await?;
        let mut settlements: Vec<Settlement> = self
            .all_settlements()
            .await
            .into_iter()
            .filter(|s| s.postal_codes.contains(code))
            .collect();
        settlements.sort_by(|a, b| a.name.cmp(&b.name));

        let Some(first) = settlements.first() else {
            return Ok(PostalCodeLookup::NotFound);
        };
        let municipality = self.municipality_row(first.municipality_id)?;
        let state = self.state_row(municipality.state_id)?;
        Ok(PostalCodeLookup::Found {
            state,
            municipality,
            settlements,
        })
    }

    async fn list_settlements(
        &self,
        municipality_id: MunicipalityId,
        search_term: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Settlement>, DomicilioError> {
        self.enter("list_settlements").await?;
        let folded_term = search_term.map(fold_key);
        let mut matches: Vec<Settlement> = self
            .all_settlements()
            .await
            .into_iter()
            .filter(|s| s.municipality_id == municipality_id)
            .filter(|s| match &folded_term {
                Some(term) => fold_key(&s.name).contains(term),
                None => true,
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_postal_codes(
        &self,
        municipality_id: MunicipalityId,
    ) -> Result<Vec<PostalCodeUsage>, DomicilioError> {
        self.enter("list_postal_codes").await?;
        let mut usage: BTreeMap<PostalCode, usize> = BTreeMap::new();
        for settlement in self.all_settlements().await {
            if settlement.municipality_id != municipality_id {
                continue;
            }
            for code in &settlement.postal_codes {
                *usage.entry(code.clone()).or_insert(0) += 1;
            }
        }
        Ok(usage
            .into_iter()
            .map(|(postal_code, settlement_count)| PostalCodeUsage {
                postal_code,
                settlement_count,
            })
            .collect())
    }

    async fn create_custom_settlement(
        &self,
        request: NewCustomSettlement,
    ) -> Result<Settlement, DomicilioError> {
        self.enter("create_custom_settlement").await?;
        self.municipality_row(request.municipality_id)?;
        let settlement = Settlement {
            id: SettlementId::new(self.next_custom_id.fetch_add(1, Ordering::SeqCst)),
            name: request.name,
            kind: request.kind,
            municipality_id: request.municipality_id,
            postal_codes: [request.postal_code].into_iter().collect(),
        };
        self.created.lock().await.push(settlement.clone());
        Ok(settlement)
    }
}
