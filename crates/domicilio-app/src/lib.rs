//! Domicilio application core: headless hierarchical address resolution
//!
//! This crate is the portable heart of the address subsystem: it owns the
//! resolution logic that backs tenant registration, patient intake, and
//! branch management forms, independent of any UI framework. Frontends bind
//! to it through two narrow surfaces:
//!
//! - **operations** on [`AddressResolver`] (one per user-observable action),
//! - **snapshots** ([`AddressSnapshot`]) re-read after every operation.
//!
//! # Architecture
//!
//! ```text
//! view event ──► DebounceScheduler ──► AddressResolver
//!                                          │
//!                                      CatalogCache ──► CatalogGateway
//!                                          │
//!                  view ◄── AddressSnapshot┘
//! ```
//!
//! A view raises an input event; the scheduler coalesces rapid edits and
//! issues a request token; the resolver consults the catalog through the
//! read-through cache and applies the response to the aggregate only if the
//! token is still the newest for its lane. The view re-renders from the next
//! snapshot. Stale responses are discarded silently — never applied, never
//! an error.
//!
//! The catalog itself stays behind the [`CatalogGateway`] trait; production
//! wires an HTTP backend, tests wire the `domicilio-testkit` fixture.

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod debounce;
pub mod gateway;
pub mod resolver;
pub mod search;
pub mod views;

pub use cache::CatalogCache;
pub use config::ResolverConfig;
pub use debounce::{DebounceScheduler, LookupKey, RequestToken};
pub use gateway::{CatalogGateway, PostalCodeLookup};
pub use resolver::AddressResolver;
pub use search::{fold_key, Named, SearchIndex};
pub use views::{AddressSnapshot, ResolutionStatus};

// Re-export the data model so frontends depend on one crate.
pub use domicilio_core::{
    AddressSelection, DomicilioError, EntryMode, GeoState, Municipality, MunicipalityId,
    NewCustomSettlement, PostalCode, PostalCodeUsage, Settlement, SettlementId, SettlementKind,
    StateId,
};
