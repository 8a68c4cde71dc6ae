//! # Debounced, Cancellable Lookup Scheduling
//!
//! Raw text input (postal-code digits, search boxes) must not hit the
//! catalog on every keystroke. This module coalesces rapid edits into a
//! single lookup per quiet period and gives every dispatch a monotonically
//! increasing request token, the staleness check for responses that arrive
//! out of order.
//!
//! Staleness is explicit — a token is either the newest issued for its key
//! or it is not. Nothing here relies on closure identity or task handles to
//! decide whether a response may still be applied.

use async_lock::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Lookup families with independent token sequences.
///
/// Each key is a single-writer lane: at most one response per key may be
/// applied, and only the one carrying the key's newest token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// Postal-code resolution for the postal-first workflow
    PostalCode,
    /// State picker contents
    StateOptions,
    /// Municipality picker contents
    MunicipalityOptions,
    /// Settlement picker contents (initial prefetch and type-ahead search
    /// share the lane — they write the same field)
    SettlementOptions,
    /// Postal-code picker contents after choosing a municipality
    PostalCodeOptions,
    /// Custom-settlement persistence
    CustomSettlement,
}

impl LookupKey {
    /// Every key, for whole-scheduler invalidation.
    pub fn all() -> &'static [Self] {
        &[
            Self::PostalCode,
            Self::StateOptions,
            Self::MunicipalityOptions,
            Self::SettlementOptions,
            Self::PostalCodeOptions,
            Self::CustomSettlement,
        ]
    }
}

/// Monotonic request token, one sequence per [`LookupKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Coalesces rapid input events into one cancellable lookup per key.
///
/// Cloning is cheap; clones share one token table, so a resolver and the
/// tasks it spawns all see the same notion of "latest".
#[derive(Debug, Clone, Default)]
pub struct DebounceScheduler {
    tokens: Arc<Mutex<HashMap<LookupKey, u64>>>,
}

impl DebounceScheduler {
    /// Create a scheduler with all token sequences at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token for `key` without scheduling anything.
    ///
    /// Used to fence non-debounced async work (picker prefetches, custom
    /// settlement persistence) under the same staleness discipline, and to
    /// cancel whatever was previously scheduled for the key.
    pub async fn issue(&self, key: LookupKey) -> RequestToken {
        let mut tokens = self.tokens.lock().await;
        let counter = tokens.entry(key).or_insert(0);
        *counter += 1;
        RequestToken(*counter)
    }

    /// Invalidate every outstanding token for `key`.
    ///
    /// Any scheduled-but-unfired timer and any in-flight response for the
    /// key become stale and will be discarded.
    pub async fn invalidate(&self, key: LookupKey) {
        let _ = self.issue(key).await;
    }

    /// Invalidate every key at once (mode switches, form resets).
    pub async fn invalidate_all(&self) {
        let mut tokens = self.tokens.lock().await;
        for key in LookupKey::all() {
            *tokens.entry(*key).or_insert(0) += 1;
        }
    }

    /// Whether `token` is still the newest issued for `key`.
    ///
    /// Callers re-check this at response-arrival time; a stale response is
    /// silently discarded, never applied.
    pub async fn is_latest(&self, key: LookupKey, token: RequestToken) -> bool {
        let tokens = self.tokens.lock().await;
        tokens.get(&key).copied() == Some(token.0)
    }

    /// Schedule `f` to run after `delay` of inactivity on `key`.
    ///
    /// Every call supersedes the previous one for the same key: the timer of
    /// a superseded call still fires, finds its token stale, and expires
    /// silently, so `f` runs exactly once per quiet period — with the token
    /// of the last call. The token is returned immediately.
    pub async fn schedule<F, Fut>(&self, key: LookupKey, delay: Duration, f: F) -> RequestToken
    where
        F: FnOnce(RequestToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.issue(key).await;
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if scheduler.is_latest(key, token).await {
                f(token).await;
            }
        });
        token
    }
}
