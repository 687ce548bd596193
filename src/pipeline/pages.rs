//! Page-count estimation from a note's word count.

use crate::output::Row;
use crate::store::frontmatter;

/// Estimated pages for `body`: whitespace-separated words ÷ `words_per_page`.
pub fn estimate_pages(body: &str, words_per_page: u32) -> f64 {
    let words = body.split_whitespace().count();
    words as f64 / f64::from(words_per_page.max(1))
}

/// The part of a note that counts towards its length.
///
/// The frontmatter block is excluded, so adding metadata never changes the
/// estimate. Malformed frontmatter counts as body.
pub fn note_body(text: &str) -> &str {
    match frontmatter::split(text) {
        Ok(parsed) => parsed.body,
        Err(_) => text,
    }
}

/// Cell text for a page count.
pub fn format_pages(pages: f64) -> String {
    format!("{pages:.2}")
}

/// Sum of every enabled row's page count, rounded to the nearest page.
///
/// `None` when no row carries a count.
pub fn total_pages(rows: &[Row]) -> Option<u64> {
    let mut any = false;
    let mut sum = 0.0;
    for pages in rows.iter().filter_map(|r| r.page_count) {
        any = true;
        sum += pages;
    }
    any.then(|| sum.max(0.0).round() as u64)
}
