//! Read-only projections of the index for display.

pub mod duplicates;
pub mod list;

pub use duplicates::{render, DuplicateGroup, DuplicateReport, GroupEntry, Summary};
pub use list::{render_listing, AliasListing, ListAliasesView, ListedAlias};
