//! User settings and the compiled rule sets derived from them.
//!
//! Settings are plain strings and toggles so they round-trip through TOML
//! unchanged. [`CompiledRules`] is the parsed form the engine works with. Rule
//! text that fails to parse is never an error for the caller: the whole rule
//! set falls back to empty and the failure is logged.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".namesake.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inject each document's own name as its first alias.
    pub add_filename_to_aliases: bool,
    /// Also index names with their words sorted (`to go` -> `go to`).
    pub sort_filename_words: bool,
    /// Also index declared aliases with their words sorted.
    pub sort_alias_words: bool,
    /// Compare aliases case-insensitively.
    pub case_insensitive: bool,
    /// Comma-separated folders whose documents are skipped.
    pub ignore_folders: String,
    /// One `s/pattern/replacement/flags` rule per line.
    pub replace_rules: String,
    /// One `pattern/flags` rule per line; matching aliases are dropped.
    pub exclude_rules: String,
    /// List the most duplicated aliases first.
    pub sort_desc: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            add_filename_to_aliases: true,
            sort_filename_words: true,
            sort_alias_words: true,
            case_insensitive: true,
            ignore_folders: "assets, images".to_string(),
            replace_rules: "s/[^\\w\\s]|_/ /g\ns/ //g".to_string(),
            exclude_rules: "^readme$/i\n^general$/i".to_string(),
            sort_desc: true,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the default settings to `path`.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(Error::ConfigExists(path.to_path_buf()));
        }

        let toml_string = toml::to_string_pretty(&Self::default())?;
        fs::write(path, toml_string).map_err(|e| Error::io(path, e))
    }
}

/// A find-and-replace rule parsed from one `s/pattern/replacement/flags` line.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub regex: Regex,
    /// Replacement in `regex` crate syntax (`${1}`, `$$`).
    pub replacement: String,
    /// `g` flag: replace every match instead of the first one.
    pub global: bool,
}

impl RewriteRule {
    pub fn apply(&self, input: &str) -> String {
        if self.global {
            self.regex
                .replace_all(input, self.replacement.as_str())
                .into_owned()
        } else {
            self.regex
                .replace(input, self.replacement.as_str())
                .into_owned()
        }
    }
}

/// Parsed form of the rule-bearing settings.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub rewrites: Vec<RewriteRule>,
    pub exclusions: Vec<Regex>,
    pub ignore_folders: Vec<String>,
}

impl CompiledRules {
    pub fn compile(settings: &Settings) -> Self {
        Self {
            rewrites: parse_rewrite_rules(&settings.replace_rules),
            exclusions: parse_exclusion_rules(&settings.exclude_rules),
            ignore_folders: split_csv(&settings.ignore_folders),
        }
    }

    /// True when any exclusion rule matches `alias`.
    pub fn is_excluded(&self, alias: &str) -> bool {
        self.exclusions.iter().any(|re| re.is_match(alias))
    }

    /// True when `document_id` lives below one of the ignored folders.
    pub fn in_ignored_folder(&self, document_id: &str) -> bool {
        self.ignore_folders.iter().any(|folder| {
            document_id
                .strip_prefix(folder.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

static SED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s/(.*?)/(.*?)/([gimy]*)$").expect("sed line pattern is valid")
});

static FLAGGED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)/([gimy]*)$").expect("flagged line pattern is valid"));

/// Parse `s/pattern/replacement/flags` lines.
///
/// Any malformed line rejects the whole set.
pub fn parse_rewrite_rules(input: &str) -> Vec<RewriteRule> {
    let mut rules = Vec::new();

    for line in rule_lines(input) {
        let parsed = SED_LINE.captures(line).and_then(|caps| {
            let pattern = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let replacement = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let flags = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            if pattern.is_empty() {
                return None;
            }
            Some((pattern, replacement, flags))
        });

        let Some((pattern, replacement, flags)) = parsed else {
            tracing::error!(line, "invalid rewrite rule syntax, ignoring all rewrite rules");
            return Vec::new();
        };

        match build_regex(pattern, flags) {
            Ok(regex) => rules.push(RewriteRule {
                regex,
                replacement: translate_replacement(replacement),
                global: flags.contains('g'),
            }),
            Err(e) => {
                tracing::error!(line, error = %e, "invalid rewrite regex, ignoring all rewrite rules");
                return Vec::new();
            }
        }
    }

    rules
}

/// Parse `pattern/flags` lines.
///
/// Any malformed line rejects the whole set.
pub fn parse_exclusion_rules(input: &str) -> Vec<Regex> {
    let mut rules = Vec::new();

    for line in rule_lines(input) {
        let parsed = FLAGGED_LINE.captures(line).and_then(|caps| {
            let pattern = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let flags = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            (!pattern.is_empty()).then_some((pattern, flags))
        });

        let Some((pattern, flags)) = parsed else {
            tracing::error!(line, "invalid exclusion rule syntax, ignoring all exclusion rules");
            return Vec::new();
        };

        match build_regex(pattern, flags) {
            Ok(regex) => rules.push(regex),
            Err(e) => {
                tracing::error!(line, error = %e, "invalid exclusion regex, ignoring all exclusion rules");
                return Vec::new();
            }
        }
    }

    rules
}

/// Split a comma-separated folder list, trimming whitespace and edge slashes.
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|item| item.trim().trim_matches('/').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn rule_lines(input: &str) -> impl Iterator<Item = &str> {
    input.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn build_regex(pattern: &str, flags: &str) -> std::result::Result<Regex, regex::Error> {
    // Sticky matching only ever starts at the beginning of the input here.
    let pattern = if flags.contains('y') {
        format!(r"\A(?:{pattern})")
    } else {
        pattern.to_string()
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .build()
}

/// Convert `$1`, `$&`, `$<name>` and `$$` to `regex` crate replacement syntax.
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 4);
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some('&') => {
                chars.next();
                out.push_str("${0}");
            }
            Some(d) if d.is_ascii_digit() && d != '0' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                    if digits.len() == 2 {
                        break;
                    }
                }
                out.push_str(&format!("${{{digits}}}"));
            }
            Some('<') => {
                let rest: String = chars.clone().skip(1).collect();
                match rest.find('>') {
                    Some(end) if end > 0 => {
                        let name = &rest[..end];
                        out.push_str(&format!("${{{name}}}"));
                        // '<', name, '>'
                        for _ in 0..name.chars().count() + 2 {
                            chars.next();
                        }
                    }
                    _ => out.push_str("$$"),
                }
            }
            _ => out.push_str("$$"),
        }
    }

    out
}
