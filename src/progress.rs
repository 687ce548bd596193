//! Progress-callback trait for per-note update events.
//!
//! Inject an [`Arc<dyn UpdateProgressCallback>`] via
//! [`crate::config::RunOptions::progress_callback`] to receive events as the
//! reconciler works through the notes of a timeline.
//!
//! # Example
//!
//! ```rust
//! use canvas_timeline::{RunOptions, UpdateProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl UpdateProgressCallback for CountingCallback {
//!     fn on_note_complete(&self, position: usize, total: usize, title: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", position + 1, total, title);
//!     }
//! }
//!
//! let options = RunOptions::default()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }));
//! ```

use std::sync::Arc;

/// Called by the update pipeline as it reconciles each note.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With `RunOptions::concurrency > 1`, the per-note methods may be called
/// concurrently and out of canvas order. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives.
pub trait UpdateProgressCallback: Send + Sync {
    /// Called once before any note is reconciled.
    ///
    /// # Arguments
    /// * `total_notes` — number of rows that will be produced
    fn on_update_start(&self, total_notes: usize) {
        let _ = total_notes;
    }

    /// Called before a note is resolved.
    ///
    /// # Arguments
    /// * `position` — 0-indexed row position in the final table
    /// * `total`    — total rows
    fn on_note_start(&self, position: usize, total: usize) {
        let _ = (position, total);
    }

    /// Called when a note was reconciled without error.
    ///
    /// # Arguments
    /// * `position` — 0-indexed row position
    /// * `total`    — total rows
    /// * `title`    — the row's display title
    fn on_note_complete(&self, position: usize, total: usize, title: &str) {
        let _ = (position, total, title);
    }

    /// Called when a note's row fell back to `none` values.
    ///
    /// # Arguments
    /// * `position` — 0-indexed row position
    /// * `total`    — total rows
    /// * `error`    — human-readable error description
    fn on_note_error(&self, position: usize, total: usize, error: &str) {
        let _ = (position, total, error);
    }

    /// Called once after every note has been attempted.
    ///
    /// # Arguments
    /// * `total`         — total rows
    /// * `success_count` — rows reconciled without error
    fn on_update_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UpdateProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunOptions`].
pub type ProgressCallback = Arc<dyn UpdateProgressCallback>;
