//! Document sources the engine reads from.
//!
//! [`VaultStore`] reads a markdown vault on disk; [`MemoryStore`] keeps
//! documents in memory and is what tests and embedders drive directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::frontmatter::{extract_frontmatter, Frontmatter};

pub trait DocumentStore {
    /// Every document currently in the store.
    fn documents(&self) -> Vec<DocumentId>;

    /// Parsed frontmatter, `None` when the document is missing or has none.
    fn metadata(&self, id: &DocumentId) -> Option<Frontmatter> {
        self.read(id).and_then(|content| extract_frontmatter(&content))
    }

    /// Full text of a document.
    fn read(&self, id: &DocumentId) -> Option<String>;
}

/// Markdown files below a root directory, honouring `.gitignore`.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    /// Open a vault. The root is canonicalized so that walker and watcher
    /// paths share one prefix.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|e| Error::io(root, e))?;
        let metadata = fs::metadata(&root).map_err(|e| Error::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(Error::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "vault root is not a directory"),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Document id of a path inside the vault, if it is a markdown file.
    pub fn id_for_path(&self, path: &Path) -> Option<DocumentId> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if !is_markdown(relative) {
            return None;
        }

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(DocumentId::new(parts.join("/")))
    }

    /// Markdown files below `dir`, skipping hidden and git-ignored entries.
    pub fn markdown_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(dir);
        builder.hidden(true).git_ignore(true).git_global(true);

        builder
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| is_markdown(path))
            .collect()
    }
}

impl DocumentStore for VaultStore {
    fn documents(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self
            .markdown_files(&self.root)
            .iter()
            .filter_map(|path| self.id_for_path(path))
            .collect();

        ids.sort();
        ids
    }

    fn read(&self, id: &DocumentId) -> Option<String> {
        let path = self.path_of(id);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "could not read document");
                None
            }
        }
    }
}

/// In-memory documents keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: BTreeMap<DocumentId, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<DocumentId>, content: impl Into<String>) {
        self.documents.insert(id.into(), content.into());
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<String> {
        self.documents.remove(id)
    }

    pub fn rename(&mut self, old: &DocumentId, new: impl Into<DocumentId>) {
        if let Some(content) = self.documents.remove(old) {
            self.documents.insert(new.into(), content);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn documents(&self) -> Vec<DocumentId> {
        self.documents.keys().cloned().collect()
    }

    fn read(&self, id: &DocumentId) -> Option<String> {
        self.documents.get(id).cloned()
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}
