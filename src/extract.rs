use crate::config::CompiledRules;
use crate::document::{DocumentId, RawAlias};
use crate::frontmatter::Frontmatter;

/// Raw aliases of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub aliases: Vec<RawAlias>,
    /// The injected name matched an exclusion rule and was dropped.
    pub name_ignored: bool,
}

/// Derive the ordered raw aliases of a document.
///
/// With `inject_name` the display name leads the list as a from-name alias,
/// unless an exclusion rule drops it. Declared aliases follow in frontmatter
/// order, minus blanks and excluded entries. Missing metadata means no
/// declared aliases.
pub fn extract_raw_aliases(
    document_id: &DocumentId,
    metadata: Option<&Frontmatter>,
    inject_name: bool,
    rules: &CompiledRules,
) -> Extraction {
    let declared = metadata
        .map(|fm| fm.alias_field().into_names())
        .unwrap_or_default();

    let mut extraction = Extraction {
        aliases: Vec::with_capacity(declared.len() + 1),
        name_ignored: false,
    };

    if inject_name {
        let name = document_id.display_name();
        if rules.is_excluded(name) {
            extraction.name_ignored = true;
        } else {
            extraction.aliases.push(RawAlias::from_name(name));
        }
    }

    extraction.aliases.extend(
        declared
            .into_iter()
            .filter(|alias| !rules.is_excluded(alias))
            .map(RawAlias::from_alias),
    );

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::document::Origin;
    use crate::frontmatter::extract_frontmatter;

    fn rules() -> CompiledRules {
        CompiledRules::compile(&Settings::default())
    }

    fn texts(extraction: &Extraction) -> Vec<&str> {
        extraction.aliases.iter().map(|a| a.text.as_str()).collect()
    }

    #[test]
    fn test_name_injected_first() {
        let fm = extract_frontmatter("---\naliases: [Alpha, Beta]\n---\n").unwrap();
        let id = DocumentId::new("notes/Gamma.md");
        let extraction = extract_raw_aliases(&id, Some(&fm), true, &rules());

        assert_eq!(texts(&extraction), vec!["Gamma", "Alpha", "Beta"]);
        assert_eq!(extraction.aliases[0].origin, Origin::FromName);
        assert!(extraction.aliases[1..].iter().all(|a| a.origin == Origin::FromAlias));
        assert!(!extraction.name_ignored);
    }

    #[test]
    fn test_excluded_name_is_recorded() {
        let fm = extract_frontmatter("---\naliases: [Intro]\n---\n").unwrap();
        let id = DocumentId::new("README.md");
        let extraction = extract_raw_aliases(&id, Some(&fm), true, &rules());

        assert_eq!(texts(&extraction), vec!["Intro"]);
        assert_eq!(extraction.aliases[0].origin, Origin::FromAlias);
        assert!(extraction.name_ignored);
    }

    #[test]
    fn test_declared_aliases_filtered() {
        let fm = extract_frontmatter("---\naliases: [general, '  ', Keep]\n---\n").unwrap();
        let id = DocumentId::new("Note.md");
        let extraction = extract_raw_aliases(&id, Some(&fm), false, &rules());

        assert_eq!(texts(&extraction), vec!["Keep"]);
        assert!(!extraction.name_ignored);
    }

    #[test]
    fn test_no_metadata() {
        let id = DocumentId::new("Note.md");
        let with_name = extract_raw_aliases(&id, None, true, &rules());
        assert_eq!(texts(&with_name), vec!["Note"]);

        let without_name = extract_raw_aliases(&id, None, false, &rules());
        assert!(without_name.aliases.is_empty());
    }

    #[test]
    fn test_from_name_only_at_index_zero() {
        let fm = extract_frontmatter("---\naliases: [Note, Note]\n---\n").unwrap();
        let id = DocumentId::new("Note.md");
        let extraction = extract_raw_aliases(&id, Some(&fm), true, &rules());

        for (i, alias) in extraction.aliases.iter().enumerate() {
            assert_eq!(alias.origin == Origin::FromName, i == 0);
        }
    }
}
