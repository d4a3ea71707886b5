use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, path-like identifier of a document, relative to the vault root
/// and always `/`-separated (`folder/Note.md`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without its final extension: `folder/Note.md` -> `Note`.
    pub fn display_name(&self) -> &str {
        let file_name = self.0.rsplit('/').next().unwrap_or(&self.0);
        match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a raw alias came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// The document's own name, injected as its first alias.
    FromName,
    /// Declared in the document's frontmatter.
    FromAlias,
}

impl Origin {
    /// Hover text shown next to a rendered alias link.
    pub fn describe(self) -> &'static str {
        match self {
            Origin::FromName => "from filename",
            Origin::FromAlias => "from alias",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawAlias {
    pub text: String,
    pub origin: Origin,
}

impl RawAlias {
    pub fn from_name(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::FromName,
        }
    }

    pub fn from_alias(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::FromAlias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(DocumentId::new("folder/Note.md").display_name(), "Note");
        assert_eq!(DocumentId::new("Note.md").display_name(), "Note");
        assert_eq!(DocumentId::new("a/b/v1.2 plan.md").display_name(), "v1.2 plan");
        assert_eq!(DocumentId::new("a/.hidden").display_name(), ".hidden");
        assert_eq!(DocumentId::new("a/README").display_name(), "README");
    }

    #[test]
    fn test_origin_serializes_kebab_case() {
        let json = serde_json::to_string(&Origin::FromName).unwrap();
        assert_eq!(json, "\"from-name\"");
    }
}
