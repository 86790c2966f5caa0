//! Catalog entry and index types

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::builtin::builtin_entries;

/// The closed set of servers the assistant can launch
///
/// The launch command for each kind lives in the session assembler; the
/// catalog only describes what a server is and what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    Filesystem,
    Github,
    Git,
    Sqlite,
    Postgres,
    BraveSearch,
    Memory,
    Fetch,
}

/// A known MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Which server this is
    pub kind: ServerKind,
    /// Short, stable selector (`filesystem`, `github`, ...)
    pub id: &'static str,
    /// Stable numeric selector, starting at 1
    pub ordinal: u32,
    /// Human-readable label
    pub display_name: &'static str,
    /// One-line capability summary
    pub description: &'static str,
    /// Whether the server needs at least one `--folder`
    pub requires_folders: bool,
    /// Environment variables that must be set for the server to work
    pub required_env: &'static [&'static str],
    /// Environment variables forwarded to the server when present
    pub optional_env: &'static [&'static str],
}

/// Errors building a catalog
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Two entries share an id
    #[error("duplicate catalog id: {0}")]
    DuplicateId(&'static str),

    /// Two entries share an ordinal
    #[error("duplicate catalog ordinal: {0}")]
    DuplicateOrdinal(u32),

    /// Ordinals start at 1
    #[error("catalog ordinal for '{0}' must be positive")]
    ZeroOrdinal(&'static str),
}

static BUILTIN: Lazy<Catalog> =
    Lazy::new(|| Catalog::new(builtin_entries()).expect("built-in catalog has unique keys"));

/// Immutable table of catalog entries with lookup by id and by ordinal
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<&'static str, usize>,
    by_ordinal: HashMap<u32, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids or ordinals
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_ordinal = HashMap::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            if entry.ordinal == 0 {
                return Err(CatalogError::ZeroOrdinal(entry.id));
            }
            if by_id.insert(entry.id, index).is_some() {
                return Err(CatalogError::DuplicateId(entry.id));
            }
            if by_ordinal.insert(entry.ordinal, index).is_some() {
                return Err(CatalogError::DuplicateOrdinal(entry.ordinal));
            }
        }

        Ok(Self {
            entries,
            by_id,
            by_ordinal,
        })
    }

    /// The catalog shipped with the binary
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// All entries, in ordinal order as declared
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Look up an entry by exact id
    pub fn by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    /// Look up an entry by ordinal
    pub fn by_ordinal(&self, ordinal: u32) -> Option<&CatalogEntry> {
        self.by_ordinal.get(&ordinal).map(|&index| &self.entries[index])
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
