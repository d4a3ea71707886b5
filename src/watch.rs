//! Filesystem notifications -> store events.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::engine::{Engine, StoreEvent};
use crate::error::Result;
use crate::store::VaultStore;

/// Map one notify event onto the store events it implies.
///
/// Paths outside the vault and non-markdown files are dropped. A renamed
/// folder becomes one rename per markdown file below it.
pub fn translate(store: &VaultStore, event: &Event) -> Vec<StoreEvent> {
    let mut events = Vec::new();

    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            for path in &event.paths {
                if path.is_file() {
                    events.extend(store.id_for_path(path).map(StoreEvent::Changed));
                }
            }
        }
        EventKind::Remove(_) => {
            events.extend(event.paths.iter().filter_map(|p| store.id_for_path(p)).map(StoreEvent::Deleted));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            translate_rename(store, &event.paths[0], &event.paths[1], &mut events);
        }
        EventKind::Modify(ModifyKind::Name(mode)) => {
            for path in &event.paths {
                let Some(id) = store.id_for_path(path) else {
                    continue;
                };
                let arrived = match mode {
                    RenameMode::From => false,
                    RenameMode::To => true,
                    _ => path.is_file(),
                };
                events.push(if arrived {
                    StoreEvent::Changed(id)
                } else {
                    StoreEvent::Deleted(id)
                });
            }
        }
        _ => {}
    }

    events
}

fn translate_rename(store: &VaultStore, from: &Path, to: &Path, events: &mut Vec<StoreEvent>) {
    if to.is_dir() {
        for new_path in store.markdown_files(to) {
            let Ok(relative) = new_path.strip_prefix(to) else {
                continue;
            };
            let old_path = from.join(relative);
            if let (Some(from), Some(to)) = (store.id_for_path(&old_path), store.id_for_path(&new_path)) {
                events.push(StoreEvent::Renamed { from, to });
            }
        }
        return;
    }

    match (store.id_for_path(from), store.id_for_path(to)) {
        (Some(from), Some(to)) => events.push(StoreEvent::Renamed { from, to }),
        (Some(from), None) => events.push(StoreEvent::Deleted(from)),
        (None, Some(to)) => events.push(StoreEvent::Changed(to)),
        (None, None) => {}
    }
}

/// How long an unpaired rename half waits before it is taken at face value.
const PAIRING_WINDOW: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct PendingRename {
    tracker: usize,
    from: Event,
    to: Option<Event>,
}

/// Holds back tracked `Name(From)` / `Name(To)` halves while the combined
/// `Name(Both)` event for the same tracker is still expected.
#[derive(Debug, Default)]
pub struct RenamePairing {
    pending: Vec<PendingRename>,
}

impl RenamePairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that can be translated now.
    pub fn push(&mut self, event: Event) -> Vec<Event> {
        let mode = match event.kind {
            EventKind::Modify(ModifyKind::Name(mode)) => mode,
            _ => return vec![event],
        };
        let Some(tracker) = event.tracker() else {
            return vec![event];
        };

        match mode {
            RenameMode::From => {
                self.pending.push(PendingRename {
                    tracker,
                    from: event,
                    to: None,
                });
                Vec::new()
            }
            RenameMode::To => match self.pending.iter_mut().find(|p| p.tracker == tracker) {
                Some(pending) => {
                    pending.to = Some(event);
                    Vec::new()
                }
                None => vec![event],
            },
            RenameMode::Both => {
                self.pending.retain(|p| p.tracker != tracker);
                vec![event]
            }
            _ => vec![event],
        }
    }

    /// Release every held half as-is.
    pub fn flush(&mut self) -> Vec<Event> {
        self.pending
            .drain(..)
            .flat_map(|p| std::iter::once(p.from).chain(p.to))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Watch the vault and feed every change into `engine`, calling `on_update`
/// after each batch that produced events. Returns when the watcher shuts down.
pub fn watch_vault<F>(engine: &mut Engine, store: &VaultStore, mut on_update: F) -> Result<()>
where
    F: FnMut(&Engine),
{
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(store.root(), RecursiveMode::Recursive)?;
    tracing::info!(root = %store.root().display(), "watching vault");

    let mut pairing = RenamePairing::new();
    loop {
        let events = match rx.recv_timeout(PAIRING_WINDOW) {
            Ok(Ok(event)) => pairing.push(event),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "watcher error");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => pairing.flush(),
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let store_events: Vec<StoreEvent> = events.iter().flat_map(|event| translate(store, event)).collect();
        if store_events.is_empty() {
            continue;
        }

        for store_event in store_events {
            engine.handle(store_event, store);
        }
        on_update(engine);
    }

    Ok(())
}
