//! # CatalogGateway: Abstract Catalog Access
//!
//! This module defines the `CatalogGateway` trait, the seam between the pure
//! resolution core and whatever actually serves the geographic catalog (an
//! HTTP backend in production, an in-memory fixture in tests). The core never
//! talks to a network; it talks to this trait.
//!
//! ```text
//! domicilio-app (pure)        backend / testkit
//! ┌─────────────────┐         ┌──────────────────┐
//! │ AddressResolver │         │ implements       │
//! │   CatalogCache ─┼────────►│   CatalogGateway │
//! └─────────────────┘         └──────────────────┘
//! ```
//!
//! All calls are read-only reference-data queries except
//! [`CatalogGateway::create_custom_settlement`], the escape hatch for
//! settlements missing from the catalog.

use async_trait::async_trait;
use domicilio_core::{
    DomicilioError, GeoState, Municipality, MunicipalityId, NewCustomSettlement, PostalCode,
    PostalCodeUsage, Settlement, StateId,
};
use serde::{Deserialize, Serialize};

/// Result of resolving a complete postal code against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostalCodeLookup {
    /// The code exists; its state and municipality are unique, the covered
    /// settlements may number zero or more.
    Found {
        /// State the code belongs to
        state: GeoState,
        /// Municipality the code belongs to
        municipality: Municipality,
        /// Settlements covered by the code
        settlements: Vec<Settlement>,
    },
    /// The code is absent from the catalog.
    NotFound,
}

impl PostalCodeLookup {
    /// Whether the lookup found the code.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Read/write access to the geographic reference catalog.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently; the cache layer coalesces duplicate in-flight reads but
/// does not serialize distinct keys.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// List every state.
    async fn list_states(&self) -> Result<Vec<GeoState>, DomicilioError>;

    /// List the municipalities of one state.
    async fn list_municipalities(
        &self,
        state_id: StateId,
    ) -> Result<Vec<Municipality>, DomicilioError>;

    /// Resolve a complete postal code to its state, municipality, and
    /// covered settlements.
    async fn lookup_postal_code(
        &self,
        code: &PostalCode,
    ) -> Result<PostalCodeLookup, DomicilioError>;

    /// List settlements of a municipality, server-filtered and paginated.
    ///
    /// Settlement lists are large enough that filtering happens on the
    /// catalog side; `search_term` is matched accent-insensitively by the
    /// backend.
    async fn list_settlements(
        &self,
        municipality_id: MunicipalityId,
        search_term: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Settlement>, DomicilioError>;

    /// List the postal codes used within a municipality, with the number of
    /// settlements each one spans.
    async fn list_postal_codes(
        &self,
        municipality_id: MunicipalityId,
    ) -> Result<Vec<PostalCodeUsage>, DomicilioError>;

    /// Register a settlement that is missing from the catalog. The catalog
    /// assigns the identifier.
    async fn create_custom_settlement(
        &self,
        request: NewCustomSettlement,
    ) -> Result<Settlement, DomicilioError>;
}
