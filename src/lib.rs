//! namesake - live duplicate-alias index for a markdown vault.
//!
//! Every document contributes raw aliases (its own name and the names listed
//! in its frontmatter). Each raw alias is normalized into generated aliases,
//! and documents sharing a generated alias are reported as duplicates. The
//! [`Engine`] keeps that index current as documents change, move or vanish.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extract;
pub mod frontmatter;
pub mod index;
pub mod locate;
pub mod normalize;
pub mod store;
pub mod view;
pub mod watch;

pub use config::{CompiledRules, Settings};
pub use document::{DocumentId, Origin, RawAlias};
pub use engine::{Engine, Navigator, StoreEvent};
pub use error::{Error, Result};
pub use index::{compare_lists, DuplicateIndex, ListDiff, ReconcileReport};
pub use locate::{locate, locate_in_document, Position, Selection};
pub use store::{DocumentStore, MemoryStore, VaultStore};
pub use view::{AliasListing, DuplicateReport};
