//! The duplicate index.
//!
//! Buckets map every generated alias to the `(document, raw alias, origin)`
//! entries producing it. Alongside them the index keeps the last indexed raw
//! aliases of each document (the "before" image for diffing) and the set of
//! documents whose injected name was excluded.
//!
//! All mutation goes through [`DuplicateIndex::reconcile`],
//! [`DuplicateIndex::rename`] and [`DuplicateIndex::delete`] once the index
//! has been built, so a changed document only touches the buckets its diff
//! names.

use std::hash::Hash;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde::Serialize;

use crate::config::CompiledRules;
use crate::document::{DocumentId, Origin, RawAlias};
use crate::extract::{extract_raw_aliases, Extraction};
use crate::normalize::Normalizer;
use crate::store::DocumentStore;

/// Identity of an index entry inside one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryKey {
    pub document_id: DocumentId,
    pub raw_alias: String,
    pub origin: Origin,
}

impl EntryKey {
    fn matches(&self, document_id: &DocumentId, alias: &RawAlias) -> bool {
        self.origin == alias.origin && self.raw_alias == alias.text && &self.document_id == document_id
    }
}

/// One bucket entry. `count` > 1 when a document lists the same raw alias
/// more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: EntryKey,
    pub count: usize,
}

/// Multiset difference between two lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDiff<T> {
    pub removed: Vec<T>,
    pub added: Vec<T>,
}

/// Compare two lists as multisets: an element listed twice before and once
/// after is removed once. Output follows first appearance.
pub fn compare_lists<T: Eq + Hash + Clone>(old: &[T], new: &[T]) -> ListDiff<T> {
    let old_counts = count_elements(old);
    let new_counts = count_elements(new);

    let mut removed = Vec::new();
    for (item, &count) in &old_counts {
        let new_count = new_counts.get(*item).copied().unwrap_or(0);
        for _ in new_count..count {
            removed.push((*item).clone());
        }
    }

    let mut added = Vec::new();
    for (item, &count) in &new_counts {
        let old_count = old_counts.get(*item).copied().unwrap_or(0);
        for _ in old_count..count {
            added.push((*item).clone());
        }
    }

    ListDiff { removed, added }
}

fn count_elements<T: Eq + Hash>(list: &[T]) -> IndexMap<&T, usize> {
    let mut counts = IndexMap::new();
    for item in list {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The old id was never indexed; the caller indexes the new document.
    NotIndexed,
    /// Aliases were carried over to the new id.
    Carried(ReconcileReport),
    /// The new id lies in an ignored folder; the document left the index.
    Dropped { removed: usize },
}

#[derive(Debug, Default)]
pub struct DuplicateIndex {
    buckets: AHashMap<String, Vec<IndexEntry>>,
    snapshots: AHashMap<DocumentId, Vec<RawAlias>>,
    name_ignored: AHashSet<DocumentId>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.snapshots.clear();
        self.name_ignored.clear();
    }

    /// Clear everything and index every document outside the ignored folders.
    pub fn rebuild(
        &mut self,
        normalizer: &mut Normalizer,
        rules: &CompiledRules,
        inject_name: bool,
        store: &dyn DocumentStore,
    ) {
        self.clear();

        let mut skipped = 0;
        for id in store.documents() {
            if rules.in_ignored_folder(id.as_str()) {
                skipped += 1;
                continue;
            }
            let metadata = store.metadata(&id);
            let extraction = extract_raw_aliases(&id, metadata.as_ref(), inject_name, rules);
            self.set_name_ignored(&id, extraction.name_ignored);
            self.insert(normalizer, &id, extraction.aliases);
        }

        tracing::info!(
            documents = self.snapshots.len(),
            skipped,
            buckets = self.buckets.len(),
            "rebuilt duplicate index"
        );
    }

    /// Index a document's raw aliases and store them as its snapshot.
    pub fn insert(&mut self, normalizer: &mut Normalizer, document_id: &DocumentId, aliases: Vec<RawAlias>) {
        self.add_entries(normalizer, document_id, &aliases);
        self.snapshots.insert(document_id.clone(), aliases);
    }

    /// Remove the entries of `aliases` from every bucket they generate.
    ///
    /// Entries that cannot be found are skipped. The snapshot is untouched.
    pub fn remove(&mut self, normalizer: &mut Normalizer, document_id: &DocumentId, aliases: &[RawAlias]) {
        for alias in aliases {
            for generated in normalizer.generate(&alias.text, alias.origin) {
                let Some(bucket) = self.buckets.get_mut(generated) else {
                    tracing::debug!(%document_id, alias = %alias.text, generated = %generated, "bucket missing on remove");
                    continue;
                };

                let Some(pos) = bucket.iter().position(|e| e.key.matches(document_id, alias)) else {
                    tracing::debug!(%document_id, alias = %alias.text, generated = %generated, "entry missing on remove");
                    continue;
                };

                bucket[pos].count -= 1;
                if bucket[pos].count == 0 {
                    bucket.remove(pos);
                }
                if bucket.is_empty() {
                    self.buckets.remove(generated);
                }
            }
        }
    }

    /// Bring a document's entries in line with a fresh extraction.
    ///
    /// Only the multiset difference against the stored snapshot is applied.
    /// A document without a snapshot is inserted as a whole.
    pub fn reconcile(
        &mut self,
        normalizer: &mut Normalizer,
        document_id: &DocumentId,
        extraction: Extraction,
    ) -> ReconcileReport {
        self.set_name_ignored(document_id, extraction.name_ignored);
        let aliases = extraction.aliases;

        let Some(previous) = self.snapshots.get(document_id) else {
            let report = ReconcileReport {
                added: aliases.len(),
                removed: 0,
            };
            self.insert(normalizer, document_id, aliases);
            return report;
        };

        let diff = compare_lists(previous, &aliases);
        if !diff.removed.is_empty() {
            self.remove(normalizer, document_id, &diff.removed);
        }
        if !diff.added.is_empty() {
            self.add_entries(normalizer, document_id, &diff.added);
        }
        self.snapshots.insert(document_id.clone(), aliases);

        let report = ReconcileReport {
            added: diff.added.len(),
            removed: diff.removed.len(),
        };
        tracing::debug!(%document_id, added = report.added, removed = report.removed, "reconciled document");
        report
    }

    /// Move a document's entries from `old_id` to `new_id`.
    ///
    /// The stored raw aliases are carried over rather than re-read: the
    /// from-name alias at index 0 is replaced by the new display name, spliced
    /// out when the new name is excluded, or spliced in when the old name was
    /// excluded and the new one is not. Old entries are removed before new
    /// ones are added.
    pub fn rename(
        &mut self,
        normalizer: &mut Normalizer,
        rules: &CompiledRules,
        inject_name: bool,
        new_id: &DocumentId,
        old_id: &DocumentId,
    ) -> RenameOutcome {
        let Some(mut aliases) = self.snapshots.remove(old_id) else {
            return RenameOutcome::NotIndexed;
        };
        self.name_ignored.remove(old_id);
        self.remove(normalizer, old_id, &aliases);

        if rules.in_ignored_folder(new_id.as_str()) {
            tracing::debug!(%old_id, %new_id, "document moved into an ignored folder");
            return RenameOutcome::Dropped {
                removed: aliases.len(),
            };
        }

        // A stale entry under the target id would otherwise be orphaned.
        if let Some(stale) = self.snapshots.remove(new_id) {
            self.remove(normalizer, new_id, &stale);
        }

        let removed = aliases.len();
        if inject_name {
            let new_name = new_id.display_name();
            let has_name = aliases.first().is_some_and(|a| a.origin == Origin::FromName);

            if rules.is_excluded(new_name) {
                if has_name {
                    aliases.remove(0);
                }
                self.name_ignored.insert(new_id.clone());
            } else if has_name {
                aliases[0] = RawAlias::from_name(new_name);
            } else {
                aliases.insert(0, RawAlias::from_name(new_name));
            }
        }

        let added = aliases.len();
        self.insert(normalizer, new_id, aliases);
        RenameOutcome::Carried(ReconcileReport { added, removed })
    }

    /// Drop every trace of a document. Returns false if it was not indexed.
    pub fn delete(&mut self, normalizer: &mut Normalizer, document_id: &DocumentId) -> bool {
        self.name_ignored.remove(document_id);
        match self.snapshots.remove(document_id) {
            Some(aliases) => {
                self.remove(normalizer, document_id, &aliases);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, document_id: &DocumentId) -> Option<&[RawAlias]> {
        self.snapshots.get(document_id).map(Vec::as_slice)
    }

    pub fn is_name_ignored(&self, document_id: &DocumentId) -> bool {
        self.name_ignored.contains(document_id)
    }

    pub fn bucket(&self, generated_alias: &str) -> Option<&[IndexEntry]> {
        self.buckets.get(generated_alias).map(Vec::as_slice)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[IndexEntry])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn document_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn set_name_ignored(&mut self, document_id: &DocumentId, ignored: bool) {
        if ignored {
            self.name_ignored.insert(document_id.clone());
        } else {
            self.name_ignored.remove(document_id);
        }
    }

    fn add_entries(&mut self, normalizer: &mut Normalizer, document_id: &DocumentId, aliases: &[RawAlias]) {
        for alias in aliases {
            for generated in normalizer.generate(&alias.text, alias.origin) {
                let bucket = self.buckets.entry(generated.clone()).or_default();
                match bucket.iter_mut().find(|e| e.key.matches(document_id, alias)) {
                    Some(entry) => entry.count += 1,
                    None => bucket.push(IndexEntry {
                        key: EntryKey {
                            document_id: document_id.clone(),
                            raw_alias: alias.text.clone(),
                            origin: alias.origin,
                        },
                        count: 1,
                    }),
                }
            }
        }
    }
}
