use std::cmp::Ordering;

use ahash::AHashSet;
use serde::Serialize;

use crate::document::{DocumentId, Origin};
use crate::index::DuplicateIndex;

/// One rendered row: a single occurrence of a raw alias in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupEntry {
    pub document_id: DocumentId,
    pub raw_alias: String,
    pub origin: Origin,
    /// 1-based, counts repeats of the same raw alias within the document.
    pub occurrence: usize,
}

impl GroupEntry {
    /// Hover text: `folder/Note.md (from filename)`.
    pub fn title(&self) -> String {
        format!("{} ({})", self.document_id, self.origin.describe())
    }
}

/// Entries sharing one generated alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub label: String,
    pub entries: Vec<GroupEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_entries: usize,
    pub total_groups: usize,
    /// Groups with distinct sets of rows.
    pub distinct_groups: usize,
}

impl Summary {
    pub fn text(&self) -> String {
        format!(
            "{} links in {} list{}",
            self.total_entries,
            self.total_groups,
            if self.total_groups != 1 { "s" } else { "" }
        )
    }

    /// Header hover text; the distinct count only shows with several groups.
    pub fn title(&self) -> String {
        if self.total_groups <= 1 {
            return self.text();
        }
        format!(
            "{} ({} unique list{})",
            self.text(),
            self.distinct_groups,
            if self.distinct_groups > 1 { "s" } else { "" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub summary: Summary,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Project the index into sorted duplicate groups.
///
/// Buckets with fewer than two rows are dropped. Groups are ordered by row
/// count, most first with `sort_desc`; ties break on the label in the
/// opposite direction. Within a group, name rows come first.
pub fn render(index: &DuplicateIndex, sort_desc: bool) -> DuplicateReport {
    let mut groups: Vec<DuplicateGroup> = index
        .buckets()
        .filter_map(|(label, bucket)| {
            let mut entries = Vec::new();
            for entry in bucket {
                for occurrence in 1..=entry.count {
                    entries.push(GroupEntry {
                        document_id: entry.key.document_id.clone(),
                        raw_alias: entry.key.raw_alias.clone(),
                        origin: entry.key.origin,
                        occurrence,
                    });
                }
            }
            (entries.len() >= 2).then(|| DuplicateGroup {
                label: label.to_string(),
                entries,
            })
        })
        .collect();

    for group in &mut groups {
        group.entries.sort_by_key(|e| e.origin != Origin::FromName);
    }

    groups.sort_by(|a, b| {
        let by_count = a.entries.len().cmp(&b.entries.len());
        let by_label = collate(&a.label, &b.label);
        if sort_desc {
            by_count.reverse().then(by_label)
        } else {
            by_count.then(by_label.reverse())
        }
    });

    let summary = summarize(&groups);
    DuplicateReport { groups, summary }
}

fn summarize(groups: &[DuplicateGroup]) -> Summary {
    let mut signatures: AHashSet<Vec<(Origin, &str, &DocumentId)>> = AHashSet::new();
    for group in groups {
        let mut signature: Vec<_> = group
            .entries
            .iter()
            .map(|e| (e.origin, e.raw_alias.as_str(), &e.document_id))
            .collect();
        signature.sort();
        signatures.insert(signature);
    }

    Summary {
        total_entries: groups.iter().map(|g| g.entries.len()).sum(),
        total_groups: groups.len(),
        distinct_groups: signatures.len(),
    }
}

/// Label order: case-folded first, then exact. Ordinal, not locale-aware;
/// accented letters sort after the ASCII range.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
