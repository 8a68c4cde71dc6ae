//! # Geographic Catalog Types
//!
//! Immutable reference data mirroring the national postal catalog: states,
//! municipalities, settlements, and postal codes. A postal code can span
//! several settlements and a settlement can carry several postal codes, so
//! the relation is modeled many-to-many throughout — no call site may assume
//! a settlement has exactly one code.

use crate::identifiers::{MunicipalityId, SettlementId, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Postal Code
// =============================================================================

/// A validated five-digit postal code.
///
/// Construction goes through [`PostalCode::parse`], which accepts exactly
/// five ASCII digits and nothing else. Partial user input never becomes a
/// `PostalCode`; forms keep raw fragments as plain strings until they are
/// complete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a postal code from a string of exactly five ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, crate::DomicilioError> {
        if raw.len() == 5 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(crate::DomicilioError::invalid(format!(
                "postal code must be exactly five digits, got {raw:?}"
            )))
        }
    }

    /// View the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalCode {
    type Err = crate::DomicilioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Catalog Entities
// =============================================================================

/// A state: top level of the geographic catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoState {
    /// Catalog key
    pub id: StateId,
    /// Official two-digit state code (zero-padded)
    pub code: String,
    /// Display name
    pub name: String,
}

/// A municipality, always belonging to one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    /// Catalog key
    pub id: MunicipalityId,
    /// Official three-digit municipality code (zero-padded, unique per state)
    pub code: String,
    /// Display name
    pub name: String,
    /// Parent state
    pub state_id: StateId,
}

/// Catalog classification of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SettlementKind {
    /// Urban neighborhood (the overwhelmingly common case)
    #[default]
    Colonia,
    /// Historic quarter
    Barrio,
    /// Village
    Pueblo,
    /// Planned housing development
    Fraccionamiento,
    /// Housing complex
    UnidadHabitacional,
    /// Communal agrarian land
    Ejido,
    /// Any other catalog classification
    Other,
}

impl SettlementKind {
    /// Get the display label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Colonia => "Colonia",
            Self::Barrio => "Barrio",
            Self::Pueblo => "Pueblo",
            Self::Fraccionamiento => "Fraccionamiento",
            Self::UnidadHabitacional => "Unidad Habitacional",
            Self::Ejido => "Ejido",
            Self::Other => "Otro",
        }
    }
}

impl fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A settlement ("colonia"): finest-grained catalog unit below municipality.
///
/// `postal_codes` is non-empty for catalog-sourced settlements; an empty set
/// is a catalog data anomaly that downstream code tolerates in a degraded
/// mode (manual postal-code entry stays possible).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Catalog key
    pub id: SettlementId,
    /// Display name
    pub name: String,
    /// Catalog classification
    pub kind: SettlementKind,
    /// Parent municipality
    pub municipality_id: MunicipalityId,
    /// All postal codes covering this settlement (many-to-many)
    pub postal_codes: BTreeSet<PostalCode>,
}

impl Settlement {
    /// The settlement's postal code, when it has exactly one.
    pub fn single_postal_code(&self) -> Option<&PostalCode> {
        if self.postal_codes.len() == 1 {
            self.postal_codes.iter().next()
        } else {
            None
        }
    }

    /// Whether `code` is one of this settlement's postal codes.
    pub fn covers_postal_code(&self, code: &PostalCode) -> bool {
        self.postal_codes.contains(code)
    }

    /// Whether the catalog row is missing postal codes entirely.
    pub fn is_postal_code_anomaly(&self) -> bool {
        self.postal_codes.is_empty()
    }
}

/// Aggregated postal-code usage within a municipality.
///
/// Returned by the catalog's per-municipality postal-code listing so pickers
/// can show how many settlements each code spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCodeUsage {
    /// The postal code
    pub postal_code: PostalCode,
    /// Number of settlements in the municipality covered by this code
    pub settlement_count: usize,
}

/// Request payload for registering a settlement missing from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomSettlement {
    /// Postal code the new settlement belongs to
    pub postal_code: PostalCode,
    /// User-provided settlement name
    pub name: String,
    /// Parent municipality
    pub municipality_id: MunicipalityId,
    /// Catalog classification
    pub kind: SettlementKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement(codes: &[&str]) -> Settlement {
        Settlement {
            id: SettlementId::new(1),
            name: "Juárez".to_string(),
            kind: SettlementKind::Colonia,
            municipality_id: MunicipalityId::new(15),
            postal_codes: codes.iter().map(|c| PostalCode::parse(c).unwrap()).collect(),
        }
    }

    #[test]
    fn test_postal_code_parse() {
        assert!(PostalCode::parse("06600").is_ok());
        assert!(PostalCode::parse("0660").is_err());
        assert!(PostalCode::parse("066000").is_err());
        assert!(PostalCode::parse("06a00").is_err());
        assert!(PostalCode::parse("").is_err());
        // Non-ASCII digits are rejected, not folded
        assert!(PostalCode::parse("٠٦٦٠٠").is_err());
    }

    #[test]
    fn test_single_postal_code() {
        assert_eq!(
            settlement(&["06600"]).single_postal_code().map(PostalCode::as_str),
            Some("06600")
        );
        assert_eq!(settlement(&["06000", "06010"]).single_postal_code(), None);
        assert_eq!(settlement(&[]).single_postal_code(), None);
    }

    #[test]
    fn test_anomaly_detection() {
        assert!(settlement(&[]).is_postal_code_anomaly());
        assert!(!settlement(&["06600"]).is_postal_code_anomaly());
    }
}
