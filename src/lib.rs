//! # canvas-timeline
//!
//! Turn a spatial canvas of notes into a chronological Markdown table.
//!
//! ## Why this crate?
//!
//! Writers lay out scenes on a canvas: group regions for acts or chapters
//! from left to right, note cards within each group from top to bottom. That
//! layout already *is* the timeline. This crate reads it back out and
//! renders it as a table inside a Markdown document, pulling per-note columns
//! (point of view, date, location, …) from each note's frontmatter and
//! making sure every note carries those keys so they can be filled in later.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Plot.canvas
//!  │
//!  ├─ 1. Parse      canvas JSON → group regions + note refs
//!  ├─ 2. Group      groups by x, notes by y then x
//!  ├─ 3. Reconcile  resolve notes, set missing frontmatter keys (set-if-absent)
//!  ├─ 4. Pages      word count ÷ words per page (optional)
//!  ├─ 5. Render     Markdown table, one row per note
//!  └─ 6. Replace    swap the target document's table block
//! ```
//!
//! Every run rebuilds the table from scratch. Once the vault has converged,
//! a second run writes nothing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use canvas_timeline::{update_timeline, ColumnSpec, FsStore, RunOptions, TimelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FsStore::new("/path/to/vault");
//!     let config = TimelineConfig::builder("Plot.canvas", "Timeline.md")
//!         .columns(["Title", "POV | point_of_view", "Group"].map(ColumnSpec::parse))
//!         .group_column_index(Some(2))
//!         .show_page_count(true)
//!         .build()?;
//!
//!     let output = update_timeline(&store, &config, &RunOptions::default()).await?;
//!     println!("{:?}: {} rows", output.status, output.rows.len());
//!     for error in &output.note_errors {
//!         eprintln!("{error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `canvas-timeline` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! canvas-timeline = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod timeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ColumnRole, ColumnSpec, RunOptions, TimelineConfig, TimelineConfigBuilder, TimelineSettings,
    DEFAULT_GROUP_KEY, DEFAULT_WORDS_PER_PAGE,
};
pub use error::{NoteError, StoreError, TimelineError};
pub use output::{Row, TimelineOutput, TimelineStats, UpdateStatus, PAGE_COUNT_DISABLED};
pub use pipeline::canvas::{parse_canvas, CanvasGraph, GroupRegion, NoteRef};
pub use pipeline::grouping::{assign_groups, NoteGroup};
pub use pipeline::table::{render_table, replace_table_block};
pub use progress::{NoopProgressCallback, ProgressCallback, UpdateProgressCallback};
pub use store::{ContentChange, FsStore, MemoryStore, Metadata, NoteHandle, NoteStore};
pub use timeline::{update_all, update_for_document, update_timeline, update_timeline_sync};
