//! Domicilio core: reference data model for hierarchical address resolution
//!
//! This crate holds the pure data model shared by every Domicilio component:
//! identifier newtypes for the geographic catalog, the catalog entity types
//! (state → municipality → settlement → postal code, with settlements and
//! postal codes related many-to-many), the mutable [`AddressSelection`]
//! aggregate that one form session owns, and the unified error type.
//!
//! Nothing in this crate performs I/O or holds locks. Higher layers
//! (`domicilio-app`) drive the aggregate through its invariant-preserving
//! mutators and stay out of its fields.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod errors;
pub mod identifiers;
pub mod selection;

pub use catalog::{
    GeoState, Municipality, NewCustomSettlement, PostalCode, PostalCodeUsage, Settlement,
    SettlementKind,
};
pub use errors::DomicilioError;
pub use identifiers::{MunicipalityId, SettlementId, StateId};
pub use selection::{AddressSelection, EntryMode};
