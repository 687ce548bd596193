//! Error types for the canvas-timeline library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`TimelineError`] — **Fatal**: the update cannot proceed at all
//!   (invalid configuration, unreadable settings file, the target document
//!   could not be written). Returned as `Err(TimelineError)` from the
//!   top-level `update*` functions.
//!
//! * [`NoteError`] — **Non-fatal**: a single note could not be resolved or
//!   its frontmatter could not be read/written, but every other row is fine.
//!   Collected in [`crate::output::TimelineOutput::note_errors`]; the row
//!   still renders at its sorted position.
//!
//! * [`StoreError`] — raised by a [`crate::store::NoteStore`] implementation.
//!   The pipeline converts it into one of the two above depending on which
//!   stage hit it.
//!
//! A missing canvas or target document is none of these: it is reported as
//! [`crate::output::UpdateStatus::SourceUnavailable`] so the last good table
//! is preserved without surfacing an error.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the canvas-timeline library.
#[derive(Debug, Error)]
pub enum TimelineError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or settings validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The settings file could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::config::TimelineSettings`].
    #[error("Settings file '{path}' is invalid: {detail}")]
    SettingsParse { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The rendered table could not be written back into the target document.
    #[error("Failed to update '{path}': {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: StoreError,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single note.
///
/// The affected row still appears in the table; see the variant docs for
/// which values it falls back to.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NoteError {
    /// The canvas node has no note path, or the path does not resolve to a note.
    /// Every metadata cell renders as `none`.
    #[error("Row {position}: note '{}' could not be resolved", .path.as_deref().unwrap_or("<missing>"))]
    Unresolvable {
        position: usize,
        path: Option<String>,
    },

    /// Frontmatter could not be read. Every metadata cell renders as `none`.
    #[error("Row {position}: reading metadata of '{path}' failed: {detail}")]
    MetadataRead {
        position: usize,
        path: String,
        detail: String,
    },

    /// Missing keys could not be written back. Cells use the values read
    /// before the failed write.
    #[error("Row {position}: writing metadata of '{path}' failed: {detail}")]
    MetadataWrite {
        position: usize,
        path: String,
        detail: String,
    },

    /// The note body could not be read for page counting; the count is 0.
    #[error("Row {position}: reading body of '{path}' failed: {detail}")]
    BodyRead {
        position: usize,
        path: String,
        detail: String,
    },
}

impl NoteError {
    /// Canonical row position the error belongs to.
    pub fn position(&self) -> usize {
        match self {
            NoteError::Unresolvable { position, .. }
            | NoteError::MetadataRead { position, .. }
            | NoteError::MetadataWrite { position, .. }
            | NoteError::BodyRead { position, .. } => *position,
        }
    }
}

/// Errors raised at the note-storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing exists at this vault path.
    #[error("'{path}' not found")]
    NotFound { path: String },

    /// The path exists but is not a Markdown note (e.g. an image).
    #[error("'{path}' is not a Markdown note")]
    NotANote { path: String },

    /// The path is absolute or escapes the vault.
    #[error("'{path}' is not a valid vault path")]
    InvalidPath { path: String },

    /// Underlying I/O failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The frontmatter block exists but is not a YAML mapping.
    #[error("Frontmatter of '{path}' is invalid: {detail}")]
    Frontmatter { path: String, detail: String },
}

impl StoreError {
    /// `true` when the error means "there is nothing there" rather than
    /// "something went wrong".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::NotANote { .. } | StoreError::InvalidPath { .. }
        )
    }
}
