//! The built-in server table
//!
//! Ordinals are part of the entry, not its position. Adding a server takes
//! the next free ordinal; existing ordinals never move.

use super::entry::{CatalogEntry, ServerKind};

pub(super) fn builtin_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            kind: ServerKind::Filesystem,
            id: "filesystem",
            ordinal: 1,
            display_name: "Filesystem",
            description: "Read, search and edit files inside the granted folders",
            requires_folders: true,
            required_env: &[],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::Github,
            id: "github",
            ordinal: 2,
            display_name: "GitHub",
            description: "Repositories, issues and pull requests on GitHub",
            requires_folders: false,
            required_env: &["GITHUB_PERSONAL_ACCESS_TOKEN"],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::Git,
            id: "git",
            ordinal: 3,
            display_name: "Git",
            description: "Inspect history, diffs and branches of local git repositories",
            requires_folders: false,
            required_env: &[],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::Sqlite,
            id: "sqlite",
            ordinal: 4,
            display_name: "SQLite",
            description: "Query and analyze a SQLite database",
            requires_folders: false,
            required_env: &["SQLITE_DB_PATH"],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::Postgres,
            id: "postgres",
            ordinal: 5,
            display_name: "PostgreSQL",
            description: "Read-only queries against a PostgreSQL database",
            requires_folders: false,
            required_env: &["POSTGRES_CONNECTION_STRING"],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::BraveSearch,
            id: "brave-search",
            ordinal: 6,
            display_name: "Brave Search",
            description: "Web and local search through the Brave Search API",
            requires_folders: false,
            required_env: &["BRAVE_API_KEY"],
            optional_env: &[],
        },
        CatalogEntry {
            kind: ServerKind::Memory,
            id: "memory",
            ordinal: 7,
            display_name: "Memory",
            description: "Persistent knowledge graph that survives between sessions",
            requires_folders: false,
            required_env: &[],
            optional_env: &["MEMORY_FILE_PATH"],
        },
        CatalogEntry {
            kind: ServerKind::Fetch,
            id: "fetch",
            ordinal: 8,
            display_name: "Fetch",
            description: "Fetch web pages and convert them to markdown",
            requires_folders: false,
            required_env: &[],
            optional_env: &[],
        },
    ]
}
