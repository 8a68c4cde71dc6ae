//! # Address View State
//!
//! Read-only projections handed to form frontends. A frontend never mutates
//! address state directly: it calls resolver operations and re-renders from
//! the next [`AddressSnapshot`]. Snapshots are plain serde data, safe to
//! serialize for debugging or to push across an FFI boundary.

use crate::search::SearchIndex;
use domicilio_core::{
    AddressSelection, GeoState, Municipality, PostalCode, PostalCodeUsage, Settlement,
};
use serde::{Deserialize, Serialize};

/// Resolution status of the address group.
///
/// Per form, the machine runs
/// `Idle → Loading → {Resolved | NotFound | Error | AwaitingSettlementChoice}`
/// and falls back to `Idle` on the next edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionStatus {
    /// Nothing pending; fields reflect the last completed edit.
    #[default]
    Idle,
    /// A catalog lookup is in flight.
    Loading,
    /// The postal code resolved completely.
    Resolved,
    /// The postal code is absent from the catalog.
    NotFound,
    /// A lookup failed (transport, server, or timeout); retry by editing.
    Error,
    /// The postal code spans several settlements; one must be chosen
    /// explicitly.
    AwaitingSettlementChoice,
}

impl ResolutionStatus {
    /// Whether a lookup is currently in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the user must pick a settlement before the address can
    /// complete.
    pub fn needs_settlement_choice(&self) -> bool {
        matches!(self, Self::AwaitingSettlementChoice)
    }
}

/// Read-only snapshot of one form's address state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressSnapshot {
    /// The address aggregate as of the snapshot.
    pub selection: AddressSelection,
    /// Resolution status of the address group.
    pub status: ResolutionStatus,
    /// Settlement candidates awaiting an explicit choice
    /// (non-empty exactly when a choice is pending or was offered).
    pub settlement_candidates: Vec<Settlement>,
    /// Postal-code candidates of the chosen settlement, when it spans more
    /// than one code.
    pub postal_code_candidates: Vec<PostalCode>,
    /// Cached state picker contents.
    pub state_options: Vec<GeoState>,
    /// Cached municipality picker contents for the chosen state.
    pub municipality_options: Vec<Municipality>,
    /// Server-filtered settlement picker contents for the chosen
    /// municipality.
    pub settlement_options: Vec<Settlement>,
    /// Postal codes used in the chosen municipality, with usage counts.
    pub postal_code_options: Vec<PostalCodeUsage>,
    /// Set when the chosen settlement carries no postal codes (catalog data
    /// anomaly); manual postal-code entry stays possible.
    pub data_anomaly: bool,
}

impl AddressSnapshot {
    /// Whether the address is complete enough to save.
    pub fn is_resolved(&self, required: bool) -> bool {
        self.selection.is_resolved(required)
    }

    /// Filter the state picker accent-insensitively.
    pub fn filter_states(&self, query: &str) -> Vec<&GeoState> {
        SearchIndex::filter(&self.state_options, query)
    }

    /// Filter the municipality picker accent-insensitively.
    pub fn filter_municipalities(&self, query: &str) -> Vec<&Municipality> {
        SearchIndex::filter(&self.municipality_options, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domicilio_core::StateId;

    #[test]
    fn test_status_helpers() {
        assert!(ResolutionStatus::Loading.is_loading());
        assert!(!ResolutionStatus::Idle.is_loading());
        assert!(ResolutionStatus::AwaitingSettlementChoice.needs_settlement_choice());
    }

    #[test]
    fn test_snapshot_filters_states() {
        let snapshot = AddressSnapshot {
            state_options: vec![
                GeoState {
                    id: StateId::new(15),
                    code: "15".to_string(),
                    name: "México".to_string(),
                },
                GeoState {
                    id: StateId::new(14),
                    code: "14".to_string(),
                    name: "Jalisco".to_string(),
                },
            ],
            ..AddressSnapshot::default()
        };

        let hits = snapshot.filter_states("mexico");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "México");
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = AddressSnapshot::default();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: AddressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, ResolutionStatus::Idle);
    }
}
