use ahash::AHashMap;
use serde::Serialize;

use crate::config::CompiledRules;
use crate::document::{DocumentId, Origin};
use crate::extract::extract_raw_aliases;
use crate::normalize::Normalizer;
use crate::store::DocumentStore;
use crate::view::GroupEntry;

/// The aliases of one document, with what each one normalizes to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasListing {
    pub document_id: DocumentId,
    pub aliases: Vec<ListedAlias>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedAlias {
    pub raw_alias: String,
    pub origin: Origin,
    pub generated: Vec<String>,
    /// 1-based position among same-text declared aliases; `None` for the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<usize>,
}

impl ListedAlias {
    /// Hover text: `Foo (from alias)`.
    pub fn title(&self) -> String {
        format!("{} ({})", self.raw_alias, self.origin.describe())
    }
}

impl AliasListing {
    /// Activation target for the alias at `index`.
    pub fn entry(&self, index: usize) -> Option<GroupEntry> {
        let alias = self.aliases.get(index)?;
        Some(GroupEntry {
            document_id: self.document_id.clone(),
            raw_alias: alias.raw_alias.clone(),
            origin: alias.origin,
            occurrence: alias.occurrence.unwrap_or(1),
        })
    }
}

/// Read-only listing of one document's aliases.
///
/// Nothing is stored in the duplicate index. Returns `None` when the
/// document sits in an ignored folder or yields no aliases.
pub fn render_listing(
    document_id: &DocumentId,
    store: &dyn DocumentStore,
    rules: &CompiledRules,
    inject_name: bool,
    normalizer: &mut Normalizer,
) -> Option<AliasListing> {
    if rules.in_ignored_folder(document_id.as_str()) {
        return None;
    }

    let metadata = store.metadata(document_id);
    let extraction = extract_raw_aliases(document_id, metadata.as_ref(), inject_name, rules);
    if extraction.aliases.is_empty() {
        return None;
    }

    let mut occurrences: AHashMap<&str, usize> = AHashMap::new();
    let mut aliases = Vec::with_capacity(extraction.aliases.len());

    for alias in &extraction.aliases {
        let occurrence = match alias.origin {
            Origin::FromName => None,
            Origin::FromAlias => {
                let seen = occurrences.entry(alias.text.as_str()).or_insert(0);
                *seen += 1;
                Some(*seen)
            }
        };

        aliases.push(ListedAlias {
            raw_alias: alias.text.clone(),
            origin: alias.origin,
            generated: normalizer.generate(&alias.text, alias.origin).iter().cloned().collect(),
            occurrence,
        });
    }

    Some(AliasListing {
        document_id: document_id.clone(),
        aliases,
    })
}

/// Tracks the displayed document and its current listing.
#[derive(Debug, Default)]
pub struct ListAliasesView {
    current: Option<DocumentId>,
    listing: Option<AliasListing>,
}

impl ListAliasesView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document the view follows, even when it rendered nothing.
    pub fn current(&self) -> Option<&DocumentId> {
        self.current.as_ref()
    }

    pub fn listing(&self) -> Option<&AliasListing> {
        self.listing.as_ref()
    }

    pub fn is_showing(&self, document_id: &DocumentId) -> bool {
        self.current.as_ref() == Some(document_id)
    }

    pub fn show(&mut self, document_id: DocumentId, listing: Option<AliasListing>) {
        self.current = Some(document_id);
        self.listing = listing;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.listing = None;
    }
}
