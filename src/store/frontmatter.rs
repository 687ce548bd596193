//! YAML frontmatter: split a note into metadata + body, and put it back.

use serde_yaml::{Mapping, Value};

/// A note split at its frontmatter block.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<'a> {
    /// `None` when the note has no (terminated) frontmatter block.
    pub metadata: Option<Mapping>,
    /// Everything after the closing delimiter line.
    pub body: &'a str,
    /// The note started with a byte-order mark.
    pub bom: bool,
}

impl Parsed<'_> {
    /// The note rewritten with `metadata` as its frontmatter, body and BOM kept.
    pub fn with_metadata(&self, metadata: &Mapping) -> Result<String, String> {
        let text = compose(metadata, self.body)?;
        Ok(if self.bom { format!("\u{feff}{text}") } else { text })
    }
}

/// Split `text` into frontmatter and body.
///
/// The first line must be `---` (an optional BOM is skipped and recorded in
/// [`Parsed::bom`]); the block ends
/// at the next `---` or `...` line. An unterminated block is treated as body.
/// Returns an error only when a terminated block is not a YAML mapping.
pub fn split(text: &str) -> Result<Parsed<'_>, String> {
    let (content, bom) = match text.strip_prefix('\u{feff}') {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let no_frontmatter = Parsed {
        metadata: None,
        body: content,
        bom,
    };

    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(no_frontmatter);
    };
    if first.trim_end() != "---" {
        return Ok(no_frontmatter);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let metadata = parse_mapping(&content[yaml_start..offset])?;
            return Ok(Parsed {
                metadata: Some(metadata),
                body: &content[offset + line.len()..],
                bom,
            });
        }
        offset += line.len();
    }

    Ok(no_frontmatter)
}

fn parse_mapping(yaml: &str) -> Result<Mapping, String> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err("frontmatter is not a key/value mapping".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Render `metadata` as a frontmatter block followed by `body`.
pub fn compose(metadata: &Mapping, body: &str) -> Result<String, String> {
    if metadata.is_empty() {
        return Ok(format!("---\n---\n{body}"));
    }
    let yaml = serde_yaml::to_string(metadata).map_err(|e| e.to_string())?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

/// Cell text for a frontmatter value.
///
/// Strings verbatim, scalars via `Display`, sequences joined with `", "`,
/// null as empty text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Mapping(_) => serde_yaml::to_string(value)
            .map(|s| s.trim().replace('\n', " "))
            .unwrap_or_default(),
        Value::Tagged(tagged) => value_text(&tagged.value),
    }
}
