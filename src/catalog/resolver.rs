//! Mapping user-supplied tokens onto catalog entries

use super::entry::{Catalog, CatalogEntry};

/// Split a comma-separated `--mcp` value into normalized tokens
///
/// Pieces are trimmed and lower-cased; empty pieces are dropped.
pub fn parse_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Plain decimal ordinal: ASCII digits only, no sign, no leading zero
fn parse_ordinal(token: &str) -> Option<u32> {
    if token.is_empty() || token.starts_with('0') || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Outcome of resolving a token list against the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    /// Matched entries in first-occurrence order, one per id
    pub entries: Vec<CatalogEntry>,
    /// Tokens that matched nothing, in input order
    pub unresolved: Vec<String>,
}

impl ResolvedSelection {
    /// True when every token matched an entry
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Ids of the resolved entries, in order
    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Whether any resolved entry needs a folder
    pub fn requires_folders(&self) -> bool {
        self.entries.iter().any(|entry| entry.requires_folders)
    }

    /// Whether nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog {
    /// Resolve tokens to entries
    ///
    /// Each token is tried as an exact id first, then as an ordinal. Unknown
    /// tokens are collected rather than aborting, and duplicates collapse onto
    /// the first occurrence.
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> ResolvedSelection {
        let mut selection = ResolvedSelection::default();

        for token in tokens {
            let token = token.as_ref();
            let entry = self
                .by_id(token)
                .or_else(|| parse_ordinal(token).and_then(|ordinal| self.by_ordinal(ordinal)));

            match entry {
                Some(entry) => {
                    if !selection.entries.iter().any(|seen| seen.id == entry.id) {
                        selection.entries.push(*entry);
                    }
                }
                None => {
                    tracing::debug!(token = %token, "Token does not match any catalog entry");
                    selection.unresolved.push(token.to_string());
                }
            }
        }

        selection
    }
}
