//! Catalog of MCP servers the assistant knows how to launch
//!
//! The catalog is closed: every server a user can select is listed here,
//! addressable either by its short id (`filesystem`) or by its ordinal (`1`).
//!
//! - `entry`: entry type, the [`Catalog`] with its id and ordinal indexes
//! - `builtin`: the fixed table shipped with the binary
//! - `resolver`: mapping user tokens onto catalog entries

mod builtin;
mod entry;
mod resolver;

pub use entry::{Catalog, CatalogEntry, CatalogError, ServerKind};
pub use resolver::{ResolvedSelection, parse_tokens};

/// Server selected when the user does not pass `--mcp`
pub const DEFAULT_SERVER_ID: &str = "filesystem";
