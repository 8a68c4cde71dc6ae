//! # Address Resolver - Portable Resolution Logic
//!
//! One `AddressResolver` per form session. It owns the canonical
//! [`AddressSelection`] aggregate, implements both entry workflows
//! (postal-code-first and location-first), and applies the auto-selection
//! and custom-entry rules. Frontends call the operations below and re-render
//! from [`AddressResolver::snapshot`]; they never touch the aggregate.
//!
//! ## Ordering discipline
//!
//! Every asynchronous catalog interaction is fenced by a
//! [`DebounceScheduler`] token for its [`LookupKey`] lane. A response is
//! applied only if its token is still the newest for the lane *at apply
//! time*; anything else is discarded silently. Application is atomic per
//! response — a discarded or failed response never leaves a partial
//! mutation behind.
//!
//! ## Auto-selection rules
//!
//! A postal-code resolution with exactly one settlement applies it outright.
//! With several, the resolver never guesses: it surfaces the candidates and
//! waits for [`AddressResolver::choose_settlement`]. A chosen settlement
//! with exactly one postal code fills it in; with several, the codes are
//! surfaced for [`AddressResolver::choose_postal_code`]. A settlement with
//! no codes at all is a catalog anomaly: flagged, logged, and degraded to
//! manual postal-code entry.

use crate::cache::CatalogCache;
use crate::config::ResolverConfig;
use crate::debounce::{DebounceScheduler, LookupKey, RequestToken};
use crate::gateway::PostalCodeLookup;
use crate::views::{AddressSnapshot, ResolutionStatus};
use async_lock::RwLock;
use domicilio_core::selection::sanitize_postal_fragment;
use domicilio_core::{
    AddressSelection, DomicilioError, EntryMode, GeoState, Municipality, MunicipalityId,
    NewCustomSettlement, PostalCode, PostalCodeUsage, Settlement, SettlementId, SettlementKind,
    StateId,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Mutable resolver state behind the lock: the aggregate plus everything the
/// snapshot projects.
#[derive(Debug, Default)]
struct ResolverState {
    selection: AddressSelection,
    status: ResolutionStatus,
    settlement_candidates: Vec<Settlement>,
    postal_code_candidates: Vec<PostalCode>,
    state_options: Vec<GeoState>,
    municipality_options: Vec<Municipality>,
    settlement_options: Vec<Settlement>,
    postal_code_options: Vec<PostalCodeUsage>,
    data_anomaly: bool,
}

impl ResolverState {
    /// Reset everything a new resolution round supersedes.
    fn clear_resolution_artifacts(&mut self) {
        self.settlement_candidates.clear();
        self.postal_code_candidates.clear();
        self.data_anomaly = false;
    }
}

/// Owns one form's address state and drives catalog resolution for it.
///
/// Cloning is cheap and shares the same state; spawned lookup tasks hold a
/// clone. The [`CatalogCache`] is shared across all resolvers of a session.
#[derive(Clone)]
pub struct AddressResolver {
    state: Arc<RwLock<ResolverState>>,
    cache: Arc<CatalogCache>,
    debounce: DebounceScheduler,
    config: ResolverConfig,
}

impl AddressResolver {
    /// Create a resolver over a shared catalog cache.
    pub fn new(cache: Arc<CatalogCache>, config: ResolverConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(ResolverState::default())),
            cache,
            debounce: DebounceScheduler::new(),
            config,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Read-only snapshot of the current address state.
    pub async fn snapshot(&self) -> AddressSnapshot {
        let state = self.state.read().await;
        AddressSnapshot {
            selection: state.selection.clone(),
            status: state.status,
            settlement_candidates: state.settlement_candidates.clone(),
            postal_code_candidates: state.postal_code_candidates.clone(),
            state_options: state.state_options.clone(),
            municipality_options: state.municipality_options.clone(),
            settlement_options: state.settlement_options.clone(),
            postal_code_options: state.postal_code_options.clone(),
            data_anomaly: state.data_anomaly,
        }
    }

    /// Whether the address is complete enough to save.
    pub async fn is_resolved(&self, required: bool) -> bool {
        self.state.read().await.selection.is_resolved(required)
    }

    // =========================================================================
    // Mode & Text Input
    // =========================================================================

    /// Switch the entry workflow, atomically clearing every geographic field.
    ///
    /// Outstanding lookups of either workflow are invalidated; their
    /// responses will be discarded on arrival.
    pub async fn set_mode(&self, mode: EntryMode) {
        self.debounce.invalidate_all().await;
        let mut state = self.state.write().await;
        if state.selection.set_mode(mode) {
            state.status = ResolutionStatus::Idle;
            state.clear_resolution_artifacts();
            state.municipality_options.clear();
            state.settlement_options.clear();
            state.postal_code_options.clear();
        }
    }

    /// Feed raw postal-code input.
    ///
    /// Non-digits are stripped and the fragment truncated to five digits —
    /// malformed input is clamped, never an error. An incomplete fragment
    /// clears the fields a previous resolution filled (the fragment itself
    /// is kept for correction). A complete code schedules a debounced
    /// catalog lookup in the postal-first workflow.
    ///
    /// In the location-first workflow this is the manual-entry path for the
    /// degraded (catalog anomaly) case; it stores the fragment without
    /// triggering a lookup, and is a no-op while a catalog settlement with
    /// known postal codes is chosen (the pickers own the value then).
    pub async fn enter_postal_code(&self, raw: &str) {
        let fragment = sanitize_postal_fragment(raw);
        let mode = self.state.read().await.selection.mode();
        match mode {
            EntryMode::PostalCodeFirst => self.enter_postal_code_first(fragment).await,
            EntryMode::LocationFirst => self.enter_postal_manual(fragment).await,
        }
    }

    async fn enter_postal_code_first(&self, fragment: String) {
        match PostalCode::parse(&fragment) {
            Ok(code) => {
                // Bump the lane before touching state so an in-flight older
                // lookup can no longer apply over the new input.
                let resolver = self.clone();
                let token = self
                    .debounce
                    .schedule(LookupKey::PostalCode, self.config.debounce_quiet, move |token| async move {
                        resolver.resolve_postal_code(code, token).await;
                    })
                    .await;
                debug!(%token, %fragment, "postal code lookup scheduled");

                let mut state = self.state.write().await;
                if state.selection.postal_code() != fragment {
                    state.selection.set_postal_fragment(fragment);
                    state.selection.clear_resolved_geo();
                    state.clear_resolution_artifacts();
                }
                state.status = ResolutionStatus::Idle;
            }
            Err(_) => {
                self.debounce.invalidate(LookupKey::PostalCode).await;
                let mut state = self.state.write().await;
                state.selection.set_postal_fragment(fragment);
                state.selection.clear_resolved_geo();
                state.clear_resolution_artifacts();
                state.status = ResolutionStatus::Idle;
            }
        }
    }

    async fn enter_postal_manual(&self, fragment: String) {
        self.debounce.invalidate(LookupKey::PostalCode).await;
        let mut state = self.state.write().await;
        if state.selection.settlement_id().is_some() && !state.data_anomaly {
            debug!("ignoring manual postal input while a catalog settlement is chosen");
            return;
        }
        state.selection.set_postal_fragment(fragment);
        state.status = ResolutionStatus::Idle;
    }

    /// Set the street-level fields (clamped to their length limits).
    pub async fn set_street_fields(&self, street: &str, exterior: &str, interior: &str) {
        let mut state = self.state.write().await;
        state.selection.set_street_fields(street, exterior, interior);
    }

    // =========================================================================
    // Catalog Picker Choices
    // =========================================================================

    /// Load the state picker contents (cached after the first call of the
    /// session).
    pub async fn load_state_options(&self) -> Result<(), DomicilioError> {
        let token = self.debounce.issue(LookupKey::StateOptions).await;
        let states = self.fetch(self.cache.states()).await?;
        let mut state = self.state.write().await;
        if self.debounce.is_latest(LookupKey::StateOptions, token).await {
            state.state_options = (*states).clone();
        }
        Ok(())
    }

    /// Choose a state (location-first workflow only).
    ///
    /// Clears everything below the state and prefetches the municipality
    /// picker.
    pub async fn choose_state(&self, state_id: StateId) -> Result<(), DomicilioError> {
        {
            let state = self.state.read().await;
            if state.selection.mode() != EntryMode::LocationFirst {
                return Err(DomicilioError::invalid(
                    "choose_state applies to the location-first workflow",
                ));
            }
            if !state.state_options.is_empty()
                && !state.state_options.iter().any(|s| s.id == state_id)
            {
                return Err(DomicilioError::invalid(format!("unknown state {state_id}")));
            }
        }

        // Invalidate every lane below the state before mutating.
        self.debounce.invalidate(LookupKey::SettlementOptions).await;
        self.debounce.invalidate(LookupKey::PostalCodeOptions).await;
        self.debounce.invalidate(LookupKey::CustomSettlement).await;
        let token = self.debounce.issue(LookupKey::MunicipalityOptions).await;

        {
            let mut state = self.state.write().await;
            state.selection.select_state(state_id);
            state.status = ResolutionStatus::Idle;
            state.clear_resolution_artifacts();
            state.municipality_options.clear();
            state.settlement_options.clear();
            state.postal_code_options.clear();
        }

        let resolver = self.clone();
        tokio::spawn(async move {
            resolver.load_municipality_options(state_id, token).await;
        });
        Ok(())
    }

    /// Choose a municipality under the current state.
    ///
    /// Clears everything below the municipality and prefetches the
    /// settlement and postal-code pickers.
    pub async fn choose_municipality(
        &self,
        municipality_id: MunicipalityId,
    ) -> Result<(), DomicilioError> {
        let state_id = {
            let state = self.state.read().await;
            state.selection.state_id().ok_or_else(|| {
                DomicilioError::invalid("choose_municipality requires a chosen state")
            })?
        };

        // Validate parentage against the catalog, not against trust.
        let municipalities = self.fetch(self.cache.municipalities(state_id)).await?;
        if !municipalities.iter().any(|m| m.id == municipality_id) {
            return Err(DomicilioError::invalid(format!(
                "municipality {municipality_id} does not belong to state {state_id}"
            )));
        }

        self.debounce.invalidate(LookupKey::CustomSettlement).await;
        let settlements_token = self.debounce.issue(LookupKey::SettlementOptions).await;
        let codes_token = self.debounce.issue(LookupKey::PostalCodeOptions).await;

        {
            let mut state = self.state.write().await;
            state.selection.select_municipality(municipality_id);
            state.status = ResolutionStatus::Idle;
            state.clear_resolution_artifacts();
            state.settlement_options.clear();
            state.postal_code_options.clear();
        }

        let resolver = self.clone();
        tokio::spawn(async move {
            resolver
                .load_settlement_options(municipality_id, None, settlements_token)
                .await;
            resolver
                .load_postal_code_options(municipality_id, codes_token)
                .await;
        });
        Ok(())
    }

    /// Choose a settlement, either from the postal-code candidates or from
    /// the location-first picker.
    ///
    /// A settlement with exactly one postal code fills the code in; one with
    /// several surfaces them for [`Self::choose_postal_code`]; one with none
    /// is a catalog anomaly — flagged, and manual entry stays possible.
    pub async fn choose_settlement(&self, settlement_id: SettlementId) -> Result<(), DomicilioError> {
        let mut state = self.state.write().await;

        let settlement = state
            .settlement_candidates
            .iter()
            .chain(state.settlement_options.iter())
            .find(|s| s.id == settlement_id)
            .cloned()
            .ok_or_else(|| {
                DomicilioError::invalid(format!("settlement {settlement_id} is not on offer"))
            })?;

        match state.selection.municipality_id() {
            Some(municipality_id) if municipality_id == settlement.municipality_id => {}
            Some(municipality_id) => {
                return Err(DomicilioError::invalid(format!(
                    "settlement {settlement_id} does not belong to municipality {municipality_id}"
                )));
            }
            None => {
                return Err(DomicilioError::invalid(
                    "choose_settlement requires a resolved or chosen municipality",
                ));
            }
        }

        state.selection.select_settlement(settlement.id);
        state.postal_code_candidates.clear();
        state.data_anomaly = false;

        if let Some(code) = settlement.single_postal_code() {
            state.selection.set_postal_code(code);
            state.status = ResolutionStatus::Resolved;
        } else if settlement.is_postal_code_anomaly() {
            warn!(%settlement_id, name = %settlement.name, "settlement has no postal codes; degrading to manual entry");
            state.data_anomaly = true;
            state.status = match state.selection.postal_code_parsed() {
                Some(_) => ResolutionStatus::Resolved,
                None => ResolutionStatus::Idle,
            };
        } else {
            // Several codes. Keep the entered one when it fits (postal-first
            // arrives here with the code that produced the candidates);
            // otherwise require an explicit choice.
            let entered = state.selection.postal_code_parsed();
            match entered {
                Some(code) if settlement.covers_postal_code(&code) => {
                    state.status = ResolutionStatus::Resolved;
                }
                _ => {
                    state.selection.clear_postal_code();
                    state.postal_code_candidates =
                        settlement.postal_codes.iter().cloned().collect();
                    state.status = ResolutionStatus::Idle;
                }
            }
        }
        Ok(())
    }

    /// Choose among the postal codes of a multi-code settlement.
    ///
    /// Only valid while [`AddressSnapshot::postal_code_candidates`] has more
    /// than one entry, and only for one of those entries.
    pub async fn choose_postal_code(&self, code: &PostalCode) -> Result<(), DomicilioError> {
        let mut state = self.state.write().await;
        if state.postal_code_candidates.len() <= 1 {
            return Err(DomicilioError::invalid(
                "choose_postal_code applies only when several codes are on offer",
            ));
        }
        if !state.postal_code_candidates.contains(code) {
            return Err(DomicilioError::invalid(format!(
                "postal code {code} is not among the settlement's codes"
            )));
        }
        state.selection.set_postal_code(code);
        state.status = ResolutionStatus::Resolved;
        Ok(())
    }

    // =========================================================================
    // Custom Settlement Escape Hatch
    // =========================================================================

    /// Activate the "my settlement is missing" escape hatch.
    ///
    /// The name is trimmed and clamped to the catalog bounds; a too-short
    /// name leaves the selection untouched. Activating releases any chosen
    /// catalog settlement (the two are mutually exclusive).
    pub async fn enable_custom_settlement(&self, name: &str) {
        let mut state = self.state.write().await;
        if !state.selection.set_custom_settlement(name) {
            debug!("custom settlement name too short; ignored");
            return;
        }
        state.postal_code_candidates.clear();
        if state.status == ResolutionStatus::AwaitingSettlementChoice {
            state.status = match state.selection.postal_code_parsed() {
                Some(_) => ResolutionStatus::Resolved,
                None => ResolutionStatus::Idle,
            };
        }
    }

    /// Deactivate the escape hatch.
    ///
    /// If postal-code candidates are still pending a choice, the resolver
    /// returns to awaiting it.
    pub async fn disable_custom_settlement(&self) {
        let mut state = self.state.write().await;
        state.selection.clear_custom_settlement();
        if state.selection.settlement_id().is_none() && !state.settlement_candidates.is_empty() {
            state.status = ResolutionStatus::AwaitingSettlementChoice;
        }
    }

    /// Persist the custom settlement to the catalog (typically at form-save
    /// time) and adopt the assigned identifier.
    ///
    /// Requires an active escape hatch, a chosen municipality, and a
    /// complete postal code. The application is token-fenced and atomic: if
    /// the user edits the address while the catalog call is in flight, the
    /// created settlement is *not* adopted and `Ok(None)` is returned.
    pub async fn create_custom_settlement(
        &self,
        kind: SettlementKind,
    ) -> Result<Option<Settlement>, DomicilioError> {
        let token = self.debounce.issue(LookupKey::CustomSettlement).await;
        let request = {
            let state = self.state.read().await;
            let name = state
                .selection
                .settlement_custom()
                .ok_or_else(|| DomicilioError::invalid("custom settlement is not active"))?
                .to_string();
            let municipality_id = state.selection.municipality_id().ok_or_else(|| {
                DomicilioError::invalid("custom settlement requires a municipality")
            })?;
            let postal_code = state.selection.postal_code_parsed().ok_or_else(|| {
                DomicilioError::invalid("custom settlement requires a complete postal code")
            })?;
            NewCustomSettlement {
                postal_code,
                name,
                municipality_id,
                kind,
            }
        };

        let created = self
            .fetch(self.cache.gateway().create_custom_settlement(request.clone()))
            .await?;

        let mut state = self.state.write().await;
        let still_current = self.debounce.is_latest(LookupKey::CustomSettlement, token).await
            && state.selection.settlement_custom() == Some(request.name.as_str())
            && state.selection.municipality_id() == Some(request.municipality_id)
            && state.selection.postal_code_parsed().as_ref() == Some(&request.postal_code);
        if !still_current {
            debug!(settlement = %created.id, "custom settlement created but selection moved on; not adopted");
            return Ok(None);
        }
        state.selection.select_settlement(created.id);
        state.status = ResolutionStatus::Resolved;
        Ok(Some(created))
    }

    // =========================================================================
    // Settlement Type-Ahead
    // =========================================================================

    /// Debounced server-side settlement search for the location-first
    /// picker. Requires a chosen municipality; otherwise a no-op.
    pub async fn search_settlements(&self, term: &str) {
        let municipality_id = match self.state.read().await.selection.municipality_id() {
            Some(id) => id,
            None => {
                debug!("settlement search without a municipality; ignored");
                return;
            }
        };
        let term = term.trim().to_string();
        let resolver = self.clone();
        self.debounce
            .schedule(
                LookupKey::SettlementOptions,
                self.config.debounce_quiet,
                move |token| async move {
                    let search = if term.is_empty() { None } else { Some(term) };
                    resolver
                        .load_settlement_options(municipality_id, search, token)
                        .await;
                },
            )
            .await;
    }

    // =========================================================================
    // Lookup Tasks (token-fenced appliers)
    // =========================================================================

    /// Run the postal-code lookup for `code` and apply the outcome if still
    /// the newest request on the lane.
    async fn resolve_postal_code(&self, code: PostalCode, token: RequestToken) {
        {
            let mut state = self.state.write().await;
            if !self.debounce.is_latest(LookupKey::PostalCode, token).await {
                return;
            }
            state.status = ResolutionStatus::Loading;
        }

        let outcome = self.fetch(self.cache.lookup_postal_code(&code)).await;

        let mut state = self.state.write().await;
        if !self.debounce.is_latest(LookupKey::PostalCode, token).await {
            debug!(%token, %code, "discarding stale postal code response");
            return;
        }
        match outcome {
            Err(error) => {
                warn!(%code, %error, "postal code lookup failed");
                state.status = ResolutionStatus::Error;
            }
            Ok(lookup) => Self::apply_postal_lookup(&mut state, &code, &lookup),
        }
    }

    /// Apply a completed postal-code lookup to the aggregate. Atomic: all of
    /// the mutation happens here, under the lock, after the staleness check.
    fn apply_postal_lookup(state: &mut ResolverState, code: &PostalCode, lookup: &PostalCodeLookup) {
        state.clear_resolution_artifacts();
        match lookup {
            PostalCodeLookup::NotFound => {
                debug!(%code, "postal code not in catalog");
                state.selection.clear_resolved_geo();
                state.status = ResolutionStatus::NotFound;
            }
            PostalCodeLookup::Found {
                state: geo_state,
                municipality,
                settlements,
            } => match settlements.as_slice() {
                [] => {
                    // A found code with no settlements behaves like an
                    // absent one; the catalog row is unusable for intake.
                    warn!(%code, "postal code resolves to zero settlements");
                    state.selection.clear_resolved_geo();
                    state.status = ResolutionStatus::NotFound;
                }
                [only] => {
                    state.selection.apply_postal_resolution(
                        geo_state.id,
                        municipality.id,
                        Some(only.id),
                    );
                    state.status = ResolutionStatus::Resolved;
                }
                many => {
                    // Never auto-select among several candidates; a silent
                    // wrong settlement is worse than asking.
                    state
                        .selection
                        .apply_postal_resolution(geo_state.id, municipality.id, None);
                    state.settlement_candidates = many.to_vec();
                    state.status = ResolutionStatus::AwaitingSettlementChoice;
                }
            },
        }
    }

    /// Fill the municipality picker for `state_id` (prefetch task).
    async fn load_municipality_options(&self, state_id: StateId, token: RequestToken) {
        let outcome = self.fetch(self.cache.municipalities(state_id)).await;
        let mut state = self.state.write().await;
        if !self
            .debounce
            .is_latest(LookupKey::MunicipalityOptions, token)
            .await
        {
            debug!(%state_id, "discarding stale municipality options");
            return;
        }
        match outcome {
            Ok(municipalities) => state.municipality_options = (*municipalities).clone(),
            Err(error) => {
                warn!(%state_id, %error, "municipality options load failed");
                state.status = ResolutionStatus::Error;
            }
        }
    }

    /// Fill the settlement picker (prefetch or type-ahead task).
    async fn load_settlement_options(
        &self,
        municipality_id: MunicipalityId,
        search_term: Option<String>,
        token: RequestToken,
    ) {
        let outcome = self
            .fetch(self.cache.settlements(
                municipality_id,
                search_term.as_deref(),
                self.config.settlement_page_size,
                0,
            ))
            .await;
        let mut state = self.state.write().await;
        if !self
            .debounce
            .is_latest(LookupKey::SettlementOptions, token)
            .await
        {
            debug!(%municipality_id, "discarding stale settlement options");
            return;
        }
        match outcome {
            Ok(settlements) => state.settlement_options = (*settlements).clone(),
            Err(error) => {
                warn!(%municipality_id, %error, "settlement options load failed");
                state.status = ResolutionStatus::Error;
            }
        }
    }

    /// Fill the postal-code picker for `municipality_id` (prefetch task).
    async fn load_postal_code_options(&self, municipality_id: MunicipalityId, token: RequestToken) {
        let outcome = self.fetch(self.cache.postal_codes(municipality_id)).await;
        let mut state = self.state.write().await;
        if !self
            .debounce
            .is_latest(LookupKey::PostalCodeOptions, token)
            .await
        {
            debug!(%municipality_id, "discarding stale postal code options");
            return;
        }
        match outcome {
            Ok(codes) => state.postal_code_options = (*codes).clone(),
            Err(error) => {
                warn!(%municipality_id, %error, "postal code options load failed");
                state.status = ResolutionStatus::Error;
            }
        }
    }

    /// Bound a catalog interaction by the configured lookup timeout.
    async fn fetch<T>(
        &self,
        fut: impl Future<Output = Result<T, DomicilioError>>,
    ) -> Result<T, DomicilioError> {
        match tokio::time::timeout(self.config.lookup_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DomicilioError::timeout("catalog lookup exceeded its time budget")),
        }
    }
}
