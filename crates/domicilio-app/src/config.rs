//! Resolver runtime knobs
//!
//! One small configuration struct per resolver instance. Values outside the
//! supported ranges are clamped rather than rejected so an embedder can pass
//! whatever its settings screen produced.

use std::time::Duration;

/// Shortest accepted debounce quiet period.
const QUIET_MIN: Duration = Duration::from_millis(300);
/// Longest accepted debounce quiet period.
const QUIET_MAX: Duration = Duration::from_millis(500);

/// Runtime configuration for an [`AddressResolver`](crate::AddressResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Quiet period before a debounced lookup fires.
    pub debounce_quiet: Duration,
    /// Upper bound on any single catalog lookup.
    pub lookup_timeout: Duration,
    /// Page size for server-side settlement searches.
    pub settlement_page_size: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            debounce_quiet: Duration::from_millis(350),
            lookup_timeout: Duration::from_secs(10),
            settlement_page_size: 50,
        }
    }
}

impl ResolverConfig {
    /// Set the debounce quiet period, clamped into the 300–500 ms window.
    pub fn with_debounce_quiet(mut self, quiet: Duration) -> Self {
        self.debounce_quiet = quiet.clamp(QUIET_MIN, QUIET_MAX);
        self
    }

    /// Set the lookup timeout. Zero is treated as the default.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = if timeout.is_zero() {
            Self::default().lookup_timeout
        } else {
            timeout
        };
        self
    }

    /// Set the settlement page size. Zero is treated as the default.
    pub fn with_settlement_page_size(mut self, size: u32) -> Self {
        self.settlement_page_size = if size == 0 {
            Self::default().settlement_page_size
        } else {
            size
        };
        self
    }
}
