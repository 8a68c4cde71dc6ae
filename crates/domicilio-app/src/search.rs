//! # Accent-Insensitive Search
//!
//! Type-ahead pickers for states and municipalities filter client-side over
//! cached catalog fragments. Catalog names are Spanish and accented
//! ("México", "Cuauhtémoc"); user queries usually are not, so matching runs
//! over a folded form: Unicode NFD, combining marks dropped, lowercased.
//!
//! Settlement lists are too large for this; they are filtered server-side by
//! the gateway and bypass this module entirely.

use domicilio_core::{GeoState, Municipality, Settlement};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a name for accent- and case-insensitive comparison.
///
/// NFD-decompose, drop combining marks, lowercase. "México" and "mexico"
/// fold to the same key.
pub fn fold_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Types with a canonical display name that can be matched accent- and
/// case-insensitively.
pub trait Named {
    /// The canonical display name used for matching.
    fn name(&self) -> &str;

    /// Folded equality with `q`.
    fn is_named(&self, q: &str) -> bool {
        fold_key(self.name()) == fold_key(q)
    }

    /// Folded substring match with `q`.
    fn name_contains(&self, q: &str) -> bool {
        fold_key(self.name()).contains(&fold_key(q))
    }
}

impl Named for GeoState {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Municipality {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Settlement {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Accent-insensitive substring filter over cached catalog entries.
pub struct SearchIndex;

impl SearchIndex {
    /// Return the entries whose folded name contains the folded query.
    ///
    /// An empty (or whitespace) query matches everything, so pickers can
    /// render the full list before the user types.
    pub fn filter<'a, T: Named>(entries: &'a [T], query: &str) -> Vec<&'a T> {
        let query = query.trim();
        if query.is_empty() {
            return entries.iter().collect();
        }
        let folded = fold_key(query);
        entries
            .iter()
            .filter(|e| fold_key(e.name()).contains(&folded))
            .collect()
    }
}
