//! Result types returned by the update entry points.

use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel reported by [`Row::page_slot`] when page counting is disabled.
pub const PAGE_COUNT_DISABLED: f64 = -1.0;

/// One table row, produced fresh on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// 0-indexed position in the table (canvas group/sort order).
    pub position: usize,

    /// Vault path from the canvas node, if it had one.
    pub note_path: Option<String>,

    /// Note basename; `None` when the note could not be resolved.
    pub title: Option<String>,

    /// Lower-cased group label, `unknown` or `ungrouped`.
    pub group_label: String,

    /// Frontmatter key → cell text, for every configured property key.
    pub values: BTreeMap<String, String>,

    /// Estimated pages; `None` when page counting is disabled.
    pub page_count: Option<f64>,
}

impl Row {
    /// Cell text for a metadata key; `none` when the key was never populated.
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("none")
    }

    /// Page count, or [`PAGE_COUNT_DISABLED`].
    pub fn page_slot(&self) -> f64 {
        self.page_count.unwrap_or(PAGE_COUNT_DISABLED)
    }
}

/// What happened to the target document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStatus {
    /// The table block was replaced with new content.
    Updated,
    /// The rendered table equals the existing block; nothing was written.
    Unchanged,
    /// The target document has no table block; nothing was written.
    NothingToReplace,
    /// The canvas or the target document is missing; no write of any kind
    /// happened (metadata included).
    SourceUnavailable { path: String },
}

impl UpdateStatus {
    /// `true` only when the target document was rewritten.
    pub fn did_write(&self) -> bool {
        matches!(self, UpdateStatus::Updated)
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineStats {
    /// Group regions on the canvas.
    pub groups: usize,
    /// Note-reference nodes on the canvas.
    pub canvas_notes: usize,
    /// Rows in the rendered table.
    pub rows: usize,
    /// Canvas notes that fell outside every group and were left out.
    pub dropped_notes: usize,
    /// Sum of row page counts rounded to the nearest page; `None` when
    /// page counting is disabled.
    pub total_pages: Option<u64>,
    /// Wall-clock time of the run.
    pub duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineOutput {
    /// Target document the run was for.
    pub target_document: String,
    pub status: UpdateStatus,
    /// The rendered table block (empty when the source was unavailable).
    pub table: String,
    pub rows: Vec<Row>,
    /// Per-note failures, in row order.
    pub note_errors: Vec<NoteError>,
    pub stats: TimelineStats,
}

impl TimelineOutput {
    /// Output for a run that stopped before touching anything.
    pub(crate) fn source_unavailable(target_document: &str, path: &str, duration_ms: u64) -> Self {
        Self {
            target_document: target_document.to_string(),
            status: UpdateStatus::SourceUnavailable {
                path: path.to_string(),
            },
            table: String::new(),
            rows: Vec::new(),
            note_errors: Vec::new(),
            stats: TimelineStats {
                duration_ms,
                ..TimelineStats::default()
            },
        }
    }
}
