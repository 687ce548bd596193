//! Table renderer: rows → Markdown table, and splicing it into a document.
//!
//! The rendered block is one header line, one divider line and one line per
//! row, joined by `\n` with no trailing newline:
//!
//! ```text
//! |Title|POV|Group|Page Count|
//! |---|---|---|---|
//! |<span class="alice"></span>[[Heist]]|Alice|act one|2.00|
//! ```
//!
//! A document's table block is the first maximal run of lines that start
//! and end with `|`. Every rendered line has that shape (cell text is
//! escaped so it can never introduce a line break), so replacing the block
//! with a fresh render always swaps the complete previous table and re-runs
//! are byte-stable.

use super::pages::format_pages;
use crate::config::{ColumnRole, TimelineConfig};
use crate::output::Row;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

const PAGE_COUNT_HEADING: &str = "Page Count";
const MISSING: &str = "none";

/// Render the full table block for `rows`.
pub fn render_table(config: &TimelineConfig, rows: &[Row]) -> String {
    let visible: Vec<(usize, ColumnRole<'_>)> = (0..config.columns.len())
        .filter(|&i| config.is_column_visible(i))
        .filter_map(|i| config.column_role(i).map(|role| (i, role)))
        .collect();
    let trailing_pages = config.has_trailing_page_count();

    let mut headings: Vec<String> = visible
        .iter()
        .map(|(i, _)| escape_cell(config.columns[*i].heading()))
        .collect();
    if trailing_pages {
        headings.push(PAGE_COUNT_HEADING.to_string());
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(table_line(&headings));
    lines.push(table_line(&vec!["---".to_string(); headings.len()]));

    let colour_key = colour_key(config);
    for row in rows {
        let mut cells: Vec<String> = visible
            .iter()
            .map(|(_, role)| escape_cell(&cell_text(role, row)))
            .collect();
        if trailing_pages {
            cells.push(page_cell(row));
        }
        if let Some(class) = colour_key.and_then(|key| style_class(row.value(key))) {
            if let Some(first) = cells.first_mut() {
                first.insert_str(0, &format!("<span class=\"{class}\"></span>"));
            }
        }
        lines.push(table_line(&cells));
    }

    lines.join("\n")
}

fn table_line(cells: &[String]) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push_str(cell);
        line.push('|');
    }
    line
}

fn cell_text(role: &ColumnRole<'_>, row: &Row) -> String {
    match role {
        ColumnRole::Title => match &row.title {
            Some(title) => format!("[[{title}]]"),
            None => MISSING.to_string(),
        },
        ColumnRole::Group => row.group_label.clone(),
        ColumnRole::PageCount => page_cell(row),
        ColumnRole::Property("") => String::new(),
        ColumnRole::Property(key) => row.value(key).to_string(),
    }
}

fn page_cell(row: &Row) -> String {
    row.page_count
        .map(format_pages)
        .unwrap_or_else(|| MISSING.to_string())
}

/// Frontmatter key of the colour column, when it is a valid property column.
fn colour_key(config: &TimelineConfig) -> Option<&str> {
    match config.column_role(config.colour_index()?)? {
        ColumnRole::Property(key) if !key.is_empty() => Some(key),
        _ => None,
    }
}

/// Keep cell text on one line and inside its cell.
pub fn escape_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_CLASS_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]").unwrap());

/// CSS class derived from a cell value; `None` if nothing usable remains.
pub fn style_class(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let dashed = RE_WHITESPACE.replace_all(&lowered, "-");
    let class = RE_CLASS_JUNK.replace_all(&dashed, "").into_owned();
    (!class.is_empty()).then_some(class)
}

// ── Document splicing ────────────────────────────────────────────────────

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Byte range of the first table block in `doc`, excluding the line break
/// after its last row.
pub fn find_table_block(doc: &str) -> Option<Range<usize>> {
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;

    for line in doc.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if is_table_row(content) {
            start.get_or_insert(offset);
            end = offset + content.len();
        } else if start.is_some() {
            break;
        }
        offset += line.len();
    }

    start.map(|s| s..end)
}

/// `doc` with its first table block replaced by `table`; `None` when the
/// document has no table block.
pub fn replace_table_block(doc: &str, table: &str) -> Option<String> {
    let range = find_table_block(doc)?;
    let mut out = String::with_capacity(doc.len() + table.len());
    out.push_str(&doc[..range.start]);
    out.push_str(table);
    out.push_str(&doc[range.end..]);
    Some(out)
}
