//! Core identifier types for the geographic catalog
//!
//! Catalog rows carry small numeric keys assigned by the reference catalog
//! (they are stable across sessions, unlike display codes, which can be
//! zero-padded strings). Each level of the hierarchy gets its own newtype so
//! a municipality key can never be passed where a state key is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a state (first catalog level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub u32);

impl StateId {
    /// Create a state identifier from its raw catalog key.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw catalog key.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StateId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u32> for StateId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Identifier of a municipality (second catalog level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityId(pub u32);

impl MunicipalityId {
    /// Create a municipality identifier from its raw catalog key.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw catalog key.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MunicipalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MunicipalityId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u32> for MunicipalityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Identifier of a settlement ("colonia", finest catalog level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementId(pub u32);

impl SettlementId {
    /// Create a settlement identifier from its raw catalog key.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw catalog key.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SettlementId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u32> for SettlementId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_round_trip() {
        let id = StateId::new(9);
        assert_eq!(id.to_string(), "9");
        assert_eq!("9".parse::<StateId>().unwrap(), id);
        assert!("not-a-number".parse::<MunicipalityId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = SettlementId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: SettlementId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }
}
