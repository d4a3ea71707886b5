//! Raw alias -> generated aliases.
//!
//! A generated alias is the key duplicates are matched on. Every raw alias
//! yields an insertion-ordered set: the (optionally lower-cased) input first,
//! then its word-sorted form, then rewrite-rule variants and their sorted forms.

use ahash::AHashMap;
use indexmap::IndexSet;

use crate::config::{RewriteRule, Settings};
use crate::document::Origin;

/// Normalization options, split out of [`Settings`] so the normalizer does not
/// depend on unrelated toggles.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub case_insensitive: bool,
    pub sort_name_words: bool,
    pub sort_alias_words: bool,
}

impl From<&Settings> for NormalizeOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            case_insensitive: settings.case_insensitive,
            sort_name_words: settings.sort_filename_words,
            sort_alias_words: settings.sort_alias_words,
        }
    }
}

impl NormalizeOptions {
    fn sorts(&self, origin: Origin) -> bool {
        match origin {
            Origin::FromName => self.sort_name_words,
            Origin::FromAlias => self.sort_alias_words,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    raw_alias: String,
    sorted: bool,
}

/// Generates and caches alias variants.
#[derive(Debug)]
pub struct Normalizer {
    options: NormalizeOptions,
    rewrites: Vec<RewriteRule>,
    cache: AHashMap<CacheKey, IndexSet<String>>,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions, rewrites: Vec<RewriteRule>) -> Self {
        Self {
            options,
            rewrites,
            cache: AHashMap::new(),
        }
    }

    /// Replace the options and rules; drops every cached result.
    pub fn reset(&mut self, options: NormalizeOptions, rewrites: Vec<RewriteRule>) {
        self.options = options;
        self.rewrites = rewrites;
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Generated aliases for `raw_alias`, computed once per process.
    pub fn generate(&mut self, raw_alias: &str, origin: Origin) -> &IndexSet<String> {
        let sorted = self.options.sorts(origin);
        let key = CacheKey {
            raw_alias: raw_alias.to_string(),
            sorted,
        };

        let options = &self.options;
        let rewrites = &self.rewrites;
        self.cache
            .entry(key)
            .or_insert_with(|| generate_aliases(raw_alias, sorted, options, rewrites))
    }
}

/// Uncached generation, see the module docs for the order of variants.
pub fn generate_aliases(
    raw_alias: &str,
    sort_words: bool,
    options: &NormalizeOptions,
    rewrites: &[RewriteRule],
) -> IndexSet<String> {
    let preprocessed = if options.case_insensitive {
        raw_alias.to_lowercase()
    } else {
        raw_alias.to_string()
    };

    let mut generated = IndexSet::new();
    if sort_words {
        let sorted = sort_words_in_string(&preprocessed);
        generated.insert(preprocessed);
        generated.insert(sorted);
    } else {
        generated.insert(preprocessed);
    }

    if rewrites.is_empty() {
        return generated;
    }

    for rule in rewrites {
        // Only variants present before this rule runs are rewritten by it,
        // so a first-match rule fires once per variant per pass.
        let pass_len = generated.len();
        for i in 0..pass_len {
            let rewritten = rule.apply(&generated[i]);
            if !rewritten.is_empty() {
                generated.insert(rewritten);
            }
        }
    }

    if sort_words {
        let pass_len = generated.len();
        for i in 0..pass_len {
            let sorted = sort_words_in_string(&generated[i]);
            generated.insert(sorted);
        }
    }

    generated
}

/// Sort space-separated words by ordinal comparison.
///
/// A string without spaces is returned as is.
pub fn sort_words_in_string(input: &str) -> String {
    let mut words: Vec<&str> = input.split(' ').collect();
    if words.len() == 1 {
        return input.to_string();
    }

    words.sort_unstable();
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_rewrite_rules;

    fn options(case_insensitive: bool, sort: bool) -> NormalizeOptions {
        NormalizeOptions {
            case_insensitive,
            sort_name_words: sort,
            sort_alias_words: sort,
        }
    }

    fn as_vec(set: &IndexSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_sort_words() {
        assert_eq!(sort_words_in_string("to go"), "go to");
        assert_eq!(sort_words_in_string("single"), "single");
        assert_eq!(sort_words_in_string("c b a"), "a b c");
        // Ordinal: uppercase sorts before lowercase
        assert_eq!(sort_words_in_string("b A"), "A b");
    }

    #[test]
    fn test_case_and_sort() {
        let mut normalizer = Normalizer::new(options(true, true), Vec::new());
        let generated = normalizer.generate("To Go", Origin::FromAlias);
        assert_eq!(as_vec(generated), vec!["to go", "go to"]);
    }

    #[test]
    fn test_case_sensitive_without_sorting() {
        let mut normalizer = Normalizer::new(options(false, false), Vec::new());
        let generated = normalizer.generate("To Go", Origin::FromAlias);
        assert_eq!(as_vec(generated), vec!["To Go"]);
    }

    #[test]
    fn test_sorting_is_per_origin() {
        let opts = NormalizeOptions {
            case_insensitive: true,
            sort_name_words: false,
            sort_alias_words: true,
        };
        let mut normalizer = Normalizer::new(opts, Vec::new());
        assert_eq!(as_vec(normalizer.generate("b a", Origin::FromName)), vec!["b a"]);
        assert_eq!(as_vec(normalizer.generate("b a", Origin::FromAlias)), vec!["b a", "a b"]);
        assert_eq!(normalizer.cached_len(), 2);
    }

    #[test]
    fn test_rewrite_chaining() {
        let rules = parse_rewrite_rules("s/[^\\w\\s]|_/ /g\ns/ //g");
        let mut normalizer = Normalizer::new(options(true, false), rules);
        let generated = normalizer.generate("foo-bar", Origin::FromAlias);
        assert!(generated.contains("foo-bar"));
        assert!(generated.contains("foo bar"));
        assert!(generated.contains("foobar"));
        assert_eq!(generated.len(), 3);
    }

    #[test]
    fn test_first_match_rule_applies_once_per_pass() {
        let rules = parse_rewrite_rules("s/-//");
        let mut normalizer = Normalizer::new(options(true, false), rules);
        assert_eq!(as_vec(normalizer.generate("a-b-c", Origin::FromAlias)), vec!["a-b-c", "ab-c"]);
    }

    #[test]
    fn test_rewrite_then_sort() {
        let rules = parse_rewrite_rules("s/_/ /g");
        let mut normalizer = Normalizer::new(options(true, true), rules);
        let generated = normalizer.generate("Zeta_Alpha", Origin::FromName);
        assert_eq!(as_vec(generated), vec!["zeta_alpha", "zeta alpha", "alpha zeta"]);
    }

    #[test]
    fn test_empty_rewrite_result_discarded() {
        let rules = parse_rewrite_rules("s/.*//");
        let mut normalizer = Normalizer::new(options(true, false), rules);
        assert_eq!(as_vec(normalizer.generate("abc", Origin::FromAlias)), vec!["abc"]);
    }

    #[test]
    fn test_reset_clears_cache() {
        let mut normalizer = Normalizer::new(options(true, false), Vec::new());
        normalizer.generate("Abc", Origin::FromAlias);
        assert_eq!(normalizer.cached_len(), 1);

        normalizer.reset(options(false, false), Vec::new());
        assert_eq!(normalizer.cached_len(), 0);
        assert_eq!(as_vec(normalizer.generate("Abc", Origin::FromAlias)), vec!["Abc"]);
    }
}
