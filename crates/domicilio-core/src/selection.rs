//! # Address Selection Aggregate
//!
//! The mutable address state one form session owns. All mutation goes through
//! methods on [`AddressSelection`] so the aggregate invariants hold after
//! every completed operation:
//!
//! 1. At most one of `settlement_id` / `settlement_custom` is set.
//! 2. `municipality_id` is only meaningful under the current `state_id`.
//! 3. `settlement_id` is only meaningful under the current `municipality_id`.
//! 4. A chosen postal code must be one of the chosen settlement's codes
//!    (checked by the resolver, which has the catalog rows at hand).
//! 5. Switching entry mode clears every geographic field atomically.
//!
//! Parent-reference checks (2–4) need catalog data and therefore live in the
//! resolver; the aggregate guarantees the structural half: choosing higher up
//! the hierarchy always clears everything below it.

use crate::catalog::PostalCode;
use crate::identifiers::{MunicipalityId, SettlementId, StateId};
use serde::{Deserialize, Serialize};

/// Maximum length of a postal-code fragment (a complete code).
pub const POSTAL_CODE_LEN: usize = 5;
/// Minimum length of a custom settlement name.
pub const CUSTOM_SETTLEMENT_MIN: usize = 2;
/// Maximum length of a custom settlement name.
pub const CUSTOM_SETTLEMENT_MAX: usize = 200;
/// Maximum length of the street field.
pub const STREET_MAX: usize = 300;
/// Maximum length of the exterior/interior number fields.
pub const NUMBER_MAX: usize = 20;

/// The two supported address entry workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryMode {
    /// Start from a postal code; state and municipality are derived.
    #[default]
    PostalCodeFirst,
    /// Drill down state → municipality → settlement; postal code is derived.
    LocationFirst,
}

/// Strip non-digits from raw postal input and truncate to five characters.
pub fn sanitize_postal_fragment(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(POSTAL_CODE_LEN)
        .collect()
}

/// Truncate a string to `max` characters on a character boundary.
fn clamp_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Mutable address aggregate, one instance per form session.
///
/// Created empty when a form mounts, mutated only through resolver
/// operations, and handed off whole to the owning form's save payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSelection {
    mode: EntryMode,
    state_id: Option<StateId>,
    municipality_id: Option<MunicipalityId>,
    settlement_id: Option<SettlementId>,
    settlement_custom: Option<String>,
    /// Raw digit fragment, possibly shorter than a complete code.
    postal_code: String,
    street: String,
    exterior_number: String,
    interior_number: String,
}

impl AddressSelection {
    /// Create a new empty selection in the given entry mode.
    pub fn new(mode: EntryMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Current entry mode.
    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Selected state, if any.
    pub fn state_id(&self) -> Option<StateId> {
        self.state_id
    }

    /// Selected municipality, if any.
    pub fn municipality_id(&self) -> Option<MunicipalityId> {
        self.municipality_id
    }

    /// Selected catalog settlement, if any.
    pub fn settlement_id(&self) -> Option<SettlementId> {
        self.settlement_id
    }

    /// Free-text settlement name, if the escape hatch is active.
    pub fn settlement_custom(&self) -> Option<&str> {
        self.settlement_custom.as_deref()
    }

    /// Raw postal-code fragment (possibly partial, empty when unset).
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// The postal code as a validated value, when the fragment is complete.
    pub fn postal_code_parsed(&self) -> Option<PostalCode> {
        PostalCode::parse(&self.postal_code).ok()
    }

    /// Street name.
    pub fn street(&self) -> &str {
        &self.street
    }

    /// Exterior number.
    pub fn exterior_number(&self) -> &str {
        &self.exterior_number
    }

    /// Interior number.
    pub fn interior_number(&self) -> &str {
        &self.interior_number
    }

    /// Whether the address is complete enough to save.
    ///
    /// When `required` is false this is always true: an optional address may
    /// be left blank. When required, every core field must be present, with
    /// the settlement satisfied by either a catalog choice or the custom
    /// escape hatch (never both, per invariant 1).
    pub fn is_resolved(&self, required: bool) -> bool {
        if !required {
            return true;
        }
        let settlement_ok = self.settlement_id.is_some() ^ self.settlement_custom.is_some();
        self.postal_code_parsed().is_some()
            && self.state_id.is_some()
            && self.municipality_id.is_some()
            && settlement_ok
            && !self.street.is_empty()
            && !self.exterior_number.is_empty()
    }

    // =========================================================================
    // Mutation Methods
    // =========================================================================

    /// Switch entry mode, clearing every geographic field atomically.
    ///
    /// Street-level fields survive a mode switch; they carry no geographic
    /// meaning. Returns false (and changes nothing) if the mode is already
    /// active.
    pub fn set_mode(&mut self, mode: EntryMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.state_id = None;
        self.municipality_id = None;
        self.settlement_id = None;
        self.settlement_custom = None;
        self.postal_code.clear();
        true
    }

    /// Store a sanitized postal fragment verbatim.
    pub fn set_postal_fragment(&mut self, fragment: String) {
        debug_assert!(fragment.len() <= POSTAL_CODE_LEN);
        self.postal_code = fragment;
    }

    /// Store a complete, validated postal code.
    pub fn set_postal_code(&mut self, code: &PostalCode) {
        self.postal_code = code.as_str().to_string();
    }

    /// Clear the postal code.
    pub fn clear_postal_code(&mut self) {
        self.postal_code.clear();
    }

    /// Clear the fields a postal-code resolution would have filled.
    ///
    /// Used when a fragment becomes incomplete or a lookup finds nothing:
    /// state, municipality and settlement go away, the fragment itself stays
    /// so the user can correct it.
    pub fn clear_resolved_geo(&mut self) {
        self.state_id = None;
        self.municipality_id = None;
        self.settlement_id = None;
    }

    /// Apply a postal-code resolution: state, municipality, and optionally a
    /// unique settlement. The fragment is untouched; the custom escape hatch
    /// resets because the resolution supersedes it.
    pub fn apply_postal_resolution(
        &mut self,
        state_id: StateId,
        municipality_id: MunicipalityId,
        settlement_id: Option<SettlementId>,
    ) {
        self.state_id = Some(state_id);
        self.municipality_id = Some(municipality_id);
        self.settlement_id = settlement_id;
        self.settlement_custom = None;
    }

    /// Choose a state, clearing everything below it.
    pub fn select_state(&mut self, state_id: StateId) {
        self.state_id = Some(state_id);
        self.municipality_id = None;
        self.settlement_id = None;
        self.settlement_custom = None;
        self.postal_code.clear();
    }

    /// Choose a municipality, clearing everything below it.
    pub fn select_municipality(&mut self, municipality_id: MunicipalityId) {
        self.municipality_id = Some(municipality_id);
        self.settlement_id = None;
        self.settlement_custom = None;
        self.postal_code.clear();
    }

    /// Choose a catalog settlement, releasing the custom escape hatch.
    pub fn select_settlement(&mut self, settlement_id: SettlementId) {
        self.settlement_id = Some(settlement_id);
        self.settlement_custom = None;
    }

    /// Activate the custom-settlement escape hatch.
    ///
    /// The name is trimmed and clamped to [`CUSTOM_SETTLEMENT_MAX`]; names
    /// shorter than [`CUSTOM_SETTLEMENT_MIN`] are rejected and leave the
    /// selection unchanged. Returns whether the hatch was activated.
    pub fn set_custom_settlement(&mut self, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.chars().count() < CUSTOM_SETTLEMENT_MIN {
            return false;
        }
        self.settlement_custom = Some(clamp_chars(trimmed, CUSTOM_SETTLEMENT_MAX));
        self.settlement_id = None;
        true
    }

    /// Deactivate the custom-settlement escape hatch.
    pub fn clear_custom_settlement(&mut self) {
        self.settlement_custom = None;
    }

    /// Set the street-level fields, clamping each to its length limit.
    pub fn set_street_fields(&mut self, street: &str, exterior: &str, interior: &str) {
        self.street = clamp_chars(street, STREET_MAX);
        self.exterior_number = clamp_chars(exterior, NUMBER_MAX);
        self.interior_number = clamp_chars(interior, NUMBER_MAX);
    }
}
