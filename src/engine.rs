//! The live engine: owns settings, the compiled rules, the normalizer cache
//! and whichever views are open, and applies store events to them in order.

use crate::config::{CompiledRules, Settings};
use crate::document::{DocumentId, Origin};
use crate::extract::extract_raw_aliases;
use crate::index::{DuplicateIndex, ReconcileReport, RenameOutcome};
use crate::locate::{locate_in_document, Selection};
use crate::normalize::{NormalizeOptions, Normalizer};
use crate::store::DocumentStore;
use crate::view::{self, AliasListing, DuplicateReport, GroupEntry, ListAliasesView};

/// A change reported by the document store or the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Content or metadata of a document changed, or it was created.
    Changed(DocumentId),
    Renamed { from: DocumentId, to: DocumentId },
    Deleted(DocumentId),
    /// The editor focused another document, or none.
    ActiveSwitched(Option<DocumentId>),
}

/// Whatever can open a document and put a selection in it.
pub trait Navigator {
    type Handle;

    fn open_document(&mut self, document_id: &DocumentId) -> Option<Self::Handle>;

    fn set_selection(&mut self, handle: &Self::Handle, selection: Selection);
}

#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    rules: CompiledRules,
    normalizer: Normalizer,
    duplicates: Option<DuplicateIndex>,
    list_view: Option<ListAliasesView>,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        let rules = CompiledRules::compile(&settings);
        let normalizer = Normalizer::new(NormalizeOptions::from(&settings), rules.rewrites.clone());
        Self {
            settings,
            rules,
            normalizer,
            duplicates: None,
            list_view: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rules(&self) -> &CompiledRules {
        &self.rules
    }

    /// Build the duplicate index from every document in `store`.
    pub fn open_duplicate_view(&mut self, store: &dyn DocumentStore) {
        let mut index = DuplicateIndex::new();
        index.rebuild(
            &mut self.normalizer,
            &self.rules,
            self.settings.add_filename_to_aliases,
            store,
        );
        self.duplicates = Some(index);
    }

    pub fn close_duplicate_view(&mut self) {
        self.duplicates = None;
    }

    pub fn duplicate_index(&self) -> Option<&DuplicateIndex> {
        self.duplicates.as_ref()
    }

    /// Current duplicate groups, `None` while the duplicate view is closed.
    pub fn duplicate_report(&self) -> Option<DuplicateReport> {
        self.duplicates
            .as_ref()
            .map(|index| view::render(index, self.settings.sort_desc))
    }

    /// Open the list view on `active`, or empty when nothing is active.
    pub fn open_list_view(&mut self, active: Option<DocumentId>, store: &dyn DocumentStore) {
        self.list_view = Some(ListAliasesView::new());
        self.show_in_list_view(active, store);
    }

    pub fn close_list_view(&mut self) {
        self.list_view = None;
    }

    pub fn listing(&self) -> Option<&AliasListing> {
        self.list_view.as_ref().and_then(ListAliasesView::listing)
    }

    pub fn list_view(&self) -> Option<&ListAliasesView> {
        self.list_view.as_ref()
    }

    /// Apply one store event to every open view.
    pub fn handle(&mut self, event: StoreEvent, store: &dyn DocumentStore) {
        tracing::debug!(?event, "handling store event");
        match event {
            StoreEvent::Changed(id) => {
                self.reconcile_changed(&id, store);
                if self.list_view.as_ref().is_some_and(|v| v.is_showing(&id)) {
                    self.show_in_list_view(Some(id), store);
                }
            }
            StoreEvent::Renamed { from, to } => {
                self.rename(&to, &from, store);
                let follow = self.list_view.as_ref().is_some_and(|v| {
                    v.current().is_none() || v.is_showing(&from) || v.is_showing(&to)
                });
                if follow {
                    self.show_in_list_view(Some(to), store);
                }
            }
            StoreEvent::Deleted(id) => {
                if let Some(index) = self.duplicates.as_mut() {
                    index.delete(&mut self.normalizer, &id);
                }
                if let Some(list_view) = self.list_view.as_mut() {
                    if list_view.is_showing(&id) {
                        list_view.clear();
                    }
                }
            }
            StoreEvent::ActiveSwitched(active) => {
                let Some(list_view) = self.list_view.as_ref() else {
                    return;
                };
                let already_shown = active.as_ref().is_some_and(|id| list_view.is_showing(id));
                if !already_shown {
                    self.show_in_list_view(active, store);
                }
            }
        }
    }

    /// Swap in new settings: rules are recompiled, the normalizer cache is
    /// dropped and every open view is rebuilt.
    pub fn apply_settings(&mut self, settings: Settings, store: &dyn DocumentStore) {
        self.rules = CompiledRules::compile(&settings);
        self.normalizer
            .reset(NormalizeOptions::from(&settings), self.rules.rewrites.clone());
        self.settings = settings;

        if self.duplicates.is_some() {
            self.open_duplicate_view(store);
        }
        if let Some(current) = self.list_view.as_ref().map(|v| v.current().cloned()) {
            self.show_in_list_view(current, store);
        }
        tracing::info!("settings applied");
    }

    /// Open the entry's document and, for declared aliases, select the
    /// occurrence in its frontmatter. The document stays open when the alias
    /// cannot be found.
    pub fn activate_entry<N: Navigator>(
        &self,
        navigator: &mut N,
        store: &dyn DocumentStore,
        entry: &GroupEntry,
    ) -> Option<N::Handle> {
        let handle = navigator.open_document(&entry.document_id)?;
        if entry.origin == Origin::FromName {
            return Some(handle);
        }

        let selection = store
            .read(&entry.document_id)
            .and_then(|content| locate_in_document(&content, &entry.raw_alias, entry.occurrence));

        match selection {
            Some(selection) => navigator.set_selection(&handle, selection),
            None => tracing::debug!(
                document_id = %entry.document_id,
                alias = %entry.raw_alias,
                occurrence = entry.occurrence,
                "alias not found in frontmatter"
            ),
        }
        Some(handle)
    }

    fn reconcile_changed(&mut self, id: &DocumentId, store: &dyn DocumentStore) -> Option<ReconcileReport> {
        let index = self.duplicates.as_mut()?;
        if self.rules.in_ignored_folder(id.as_str()) {
            tracing::debug!(%id, "change in ignored folder");
            return None;
        }

        let metadata = store.metadata(id);
        let extraction =
            extract_raw_aliases(id, metadata.as_ref(), self.settings.add_filename_to_aliases, &self.rules);
        Some(index.reconcile(&mut self.normalizer, id, extraction))
    }

    fn rename(&mut self, to: &DocumentId, from: &DocumentId, store: &dyn DocumentStore) {
        let Some(index) = self.duplicates.as_mut() else {
            return;
        };

        let inject_name = self.settings.add_filename_to_aliases;
        let outcome = index.rename(&mut self.normalizer, &self.rules, inject_name, to, from);
        tracing::debug!(%from, %to, ?outcome, "renamed document");

        if outcome == RenameOutcome::NotIndexed && !self.rules.in_ignored_folder(to.as_str()) {
            let metadata = store.metadata(to);
            let extraction = extract_raw_aliases(to, metadata.as_ref(), inject_name, &self.rules);
            index.reconcile(&mut self.normalizer, to, extraction);
        }
    }

    fn show_in_list_view(&mut self, active: Option<DocumentId>, store: &dyn DocumentStore) {
        let Some(list_view) = self.list_view.as_mut() else {
            return;
        };

        match active {
            Some(id) => {
                let listing = view::render_listing(
                    &id,
                    store,
                    &self.rules,
                    self.settings.add_filename_to_aliases,
                    &mut self.normalizer,
                );
                list_view.show(id, listing);
            }
            None => list_view.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct RecordingNavigator {
        opened: Vec<DocumentId>,
        selections: Vec<Selection>,
        missing: Vec<DocumentId>,
    }

    impl Navigator for RecordingNavigator {
        type Handle = usize;

        fn open_document(&mut self, document_id: &DocumentId) -> Option<usize> {
            if self.missing.contains(document_id) {
                return None;
            }
            self.opened.push(document_id.clone());
            Some(self.opened.len())
        }

        fn set_selection(&mut self, _handle: &usize, selection: Selection) {
            self.selections.push(selection);
        }
    }

    fn labels(engine: &Engine) -> Vec<String> {
        engine
            .duplicate_report()
            .map(|r| r.groups.into_iter().map(|g| g.label).collect())
            .unwrap_or_default()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert("Alpha.md", "---\naliases: [Shared]\n---\n");
        store.insert("Beta.md", "---\naliases: [shared]\n---\n");
        store.insert("Gamma.md", "");
        store
    }

    #[test]
    fn test_open_duplicate_view() {
        let store = store();
        let mut engine = Engine::new(Settings::default());
        assert!(engine.duplicate_report().is_none());

        engine.open_duplicate_view(&store);
        assert_eq!(labels(&engine), vec!["shared"]);

        engine.close_duplicate_view();
        assert!(engine.duplicate_report().is_none());
    }

    #[test]
    fn test_changed_event_reconciles() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        engine.open_duplicate_view(&store);

        store.insert("Gamma.md", "---\naliases: [Alpha]\n---\n");
        engine.handle(StoreEvent::Changed(DocumentId::new("Gamma.md")), &store);
        assert_eq!(labels(&engine), vec!["alpha", "shared"]);

        store.insert("Beta.md", "");
        engine.handle(StoreEvent::Changed(DocumentId::new("Beta.md")), &store);
        assert_eq!(labels(&engine), vec!["alpha"]);
    }

    #[test]
    fn test_changes_in_ignored_folders_are_skipped() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        engine.open_duplicate_view(&store);

        store.insert("assets/Shared.md", "");
        engine.handle(StoreEvent::Changed(DocumentId::new("assets/Shared.md")), &store);
        assert_eq!(engine.duplicate_report().unwrap().groups[0].entries.len(), 2);
    }

    #[test]
    fn test_rename_and_delete_events() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        engine.open_duplicate_view(&store);

        let old = DocumentId::new("Gamma.md");
        store.rename(&old, "Shared.md");
        engine.handle(
            StoreEvent::Renamed {
                from: old,
                to: DocumentId::new("Shared.md"),
            },
            &store,
        );
        let report = engine.duplicate_report().unwrap();
        assert_eq!(report.groups[0].entries.len(), 3);
        assert_eq!(report.groups[0].entries[0].document_id.as_str(), "Shared.md");

        let beta = DocumentId::new("Beta.md");
        store.remove(&beta);
        engine.handle(StoreEvent::Deleted(beta), &store);
        assert_eq!(engine.duplicate_report().unwrap().summary.total_entries, 2);
    }

    #[test]
    fn test_rename_of_unindexed_document_indexes_it() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        engine.open_duplicate_view(&store);

        store.insert("Delta.md", "---\naliases: [shared]\n---\n");
        engine.handle(
            StoreEvent::Renamed {
                from: DocumentId::new("outside.md"),
                to: DocumentId::new("Delta.md"),
            },
            &store,
        );
        assert_eq!(engine.duplicate_report().unwrap().summary.total_entries, 3);
    }

    #[test]
    fn test_list_view_follows_active_document() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        let alpha = DocumentId::new("Alpha.md");

        engine.open_list_view(Some(alpha.clone()), &store);
        let listing = engine.listing().unwrap();
        assert_eq!(listing.document_id, alpha);
        assert_eq!(listing.aliases.len(), 2);

        store.insert("Alpha.md", "---\naliases: [Shared, More]\n---\n");
        engine.handle(StoreEvent::Changed(alpha.clone()), &store);
        assert_eq!(engine.listing().unwrap().aliases.len(), 3);

        // Changes to other documents leave the view alone.
        engine.handle(StoreEvent::Changed(DocumentId::new("Beta.md")), &store);
        assert_eq!(engine.listing().unwrap().document_id, alpha);

        engine.handle(StoreEvent::ActiveSwitched(Some(DocumentId::new("Beta.md"))), &store);
        assert_eq!(engine.listing().unwrap().document_id.as_str(), "Beta.md");

        engine.handle(StoreEvent::ActiveSwitched(None), &store);
        assert!(engine.listing().is_none());
        assert!(engine.list_view().unwrap().current().is_none());
    }

    #[test]
    fn test_list_view_rename_and_delete() {
        let mut store = store();
        let mut engine = Engine::new(Settings::default());
        let alpha = DocumentId::new("Alpha.md");
        engine.open_list_view(Some(alpha.clone()), &store);

        store.rename(&alpha, "Omega.md");
        engine.handle(
            StoreEvent::Renamed {
                from: alpha,
                to: DocumentId::new("Omega.md"),
            },
            &store,
        );
        let listing = engine.listing().unwrap();
        assert_eq!(listing.aliases[0].raw_alias, "Omega");

        let omega = DocumentId::new("Omega.md");
        store.remove(&omega);
        engine.handle(StoreEvent::Deleted(omega), &store);
        assert!(engine.listing().is_none());
    }

    #[test]
    fn test_apply_settings_rebuilds_views() {
        let store = store();
        let mut engine = Engine::new(Settings::default());
        engine.open_duplicate_view(&store);
        engine.open_list_view(Some(DocumentId::new("Alpha.md")), &store);

        let settings = Settings {
            case_insensitive: false,
            add_filename_to_aliases: false,
            ..Settings::default()
        };
        engine.apply_settings(settings, &store);

        assert!(labels(&engine).is_empty());
        let listing = engine.listing().unwrap();
        assert_eq!(listing.aliases.len(), 1);
        assert_eq!(listing.aliases[0].generated[0], "Shared");
    }

    #[test]
    fn test_activate_entry() {
        let mut store = MemoryStore::new();
        store.insert("Note.md", "---\naliases: [\"x\", \"x\"]\n---\nbody");
        let engine = Engine::new(Settings::default());
        let mut navigator = RecordingNavigator::default();

        let entry = GroupEntry {
            document_id: DocumentId::new("Note.md"),
            raw_alias: "x".to_string(),
            origin: Origin::FromAlias,
            occurrence: 2,
        };
        assert_eq!(engine.activate_entry(&mut navigator, &store, &entry), Some(1));
        assert_eq!(navigator.selections.len(), 1);
        assert_eq!(navigator.selections[0].from.column, 13);

        let name_entry = GroupEntry {
            origin: Origin::FromName,
            raw_alias: "Note".to_string(),
            occurrence: 1,
            ..entry.clone()
        };
        assert_eq!(engine.activate_entry(&mut navigator, &store, &name_entry), Some(2));
        assert_eq!(navigator.selections.len(), 1);

        // Locator miss still opens the document.
        let missing_alias = GroupEntry {
            raw_alias: "nowhere".to_string(),
            ..entry.clone()
        };
        assert_eq!(engine.activate_entry(&mut navigator, &store, &missing_alias), Some(3));
        assert_eq!(navigator.selections.len(), 1);

        navigator.missing.push(DocumentId::new("Note.md"));
        assert!(engine.activate_entry(&mut navigator, &store, &entry).is_none());
    }
}
