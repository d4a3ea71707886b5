use std::collections::BTreeMap;
use std::ops::Range;

use serde_json::{Number, Value};

/// Parsed YAML frontmatter of a markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub fields: BTreeMap<String, Value>,
}

impl Frontmatter {
    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }

    pub fn alias_field(&self) -> AliasField {
        AliasField::from_fields(&self.fields)
    }
}

/// Byte range of the frontmatter block, from the opening `---` through the
/// end of the closing delimiter (line break excluded).
///
/// Returns `None` when the document does not start with `---` or the block is
/// never closed.
pub fn block_range(input: &str) -> Option<Range<usize>> {
    let mut offset = 0;
    let mut lines = input.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim_start_matches('\u{feff}').trim_end() != "---" {
        return None;
    }
    offset += first.len();

    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(0..offset + trimmed.len());
        }
        offset += line.len();
    }

    None
}

/// Extract and parse the YAML frontmatter of a markdown document.
///
/// Returns `None` when there is no closed block or the YAML does not parse
/// to a mapping.
pub fn extract_frontmatter(input: &str) -> Option<Frontmatter> {
    let range = block_range(input)?;
    let block = &input[range];

    // Drop the two delimiter lines.
    let mut lines: Vec<&str> = block.lines().skip(1).collect();
    lines.pop();
    let raw_yaml = lines.join("\n");

    if raw_yaml.trim().is_empty() {
        return Some(Frontmatter::default());
    }

    parse_yaml_to_json_map(&raw_yaml).map(Frontmatter::from_fields)
}

fn parse_yaml_to_json_map(yaml: &str) -> Option<BTreeMap<String, Value>> {
    let yaml_value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "frontmatter is not valid yaml");
            return None;
        }
    };
    let json_value: Value = serde_json::to_value(yaml_value).ok()?;

    match json_value {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

/// One value of a name-list field.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    /// Null, booleans, nested lists and maps. Never yields a name.
    Other,
}

impl Scalar {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Scalar::Text(s.clone()),
            Value::Number(n) => Scalar::Number(n.clone()),
            _ => Scalar::Other,
        }
    }

    /// The name this value contributes, if any. Text is trimmed and blank text
    /// yields nothing; numbers use their shortest decimal form.
    pub fn to_name(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Scalar::Number(n) => Some(format_number(n)),
            Scalar::Other => None,
        }
    }
}

/// The name-list metadata of a document, resolved from either the `aliases`
/// field or the legacy `alias` field.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasField {
    Absent,
    Single(Scalar),
    List(Vec<Scalar>),
}

impl AliasField {
    pub fn from_fields(fields: &BTreeMap<String, Value>) -> Self {
        if let Some(value) = fields.get("aliases").filter(|v| is_truthy(v)) {
            return match value {
                Value::Array(items) => AliasField::List(items.iter().map(Scalar::from_value).collect()),
                other => AliasField::Single(Scalar::from_value(other)),
            };
        }

        match fields.get("alias").filter(|v| is_truthy(v)) {
            // Legacy comma-separated form
            Some(Value::String(s)) => {
                AliasField::List(s.split(',').map(|part| Scalar::Text(part.to_string())).collect())
            }
            Some(Value::Array(items)) => AliasField::List(items.iter().map(Scalar::from_value).collect()),
            Some(other) => AliasField::Single(Scalar::from_value(other)),
            None => AliasField::Absent,
        }
    }

    /// Cleaned, ordered names: blanks and non-scalars dropped.
    pub fn into_names(self) -> Vec<String> {
        match self {
            AliasField::Absent => Vec::new(),
            AliasField::Single(scalar) => scalar.to_name().into_iter().collect(),
            AliasField::List(items) => items.iter().filter_map(Scalar::to_name).collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
