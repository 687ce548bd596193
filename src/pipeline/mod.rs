//! Pipeline stages for canvas-to-table timelines.
//!
//! Each submodule implements exactly one transformation step. Only
//! [`reconcile`] touches the store; every other stage is a pure function of
//! its input.
//!
//! ## Data Flow
//!
//! ```text
//! canvas ──▶ grouping ──▶ reconcile ──▶ pages ──▶ table
//! (JSON)     (x-ranges)   (frontmatter)  (words)   (Markdown)
//! ```
//!
//! 1. [`canvas`]    — parse the canvas JSON into group regions and note refs
//! 2. [`grouping`]  — order groups left to right and notes top to bottom
//! 3. [`reconcile`] — resolve notes, fill missing frontmatter keys, build rows;
//!    the only stage with I/O
//! 4. [`pages`]     — estimate page counts from note bodies
//! 5. [`table`]     — render the rows and splice them over the document's
//!    table block

pub mod canvas;
pub mod grouping;
pub mod pages;
pub mod reconcile;
pub mod table;
