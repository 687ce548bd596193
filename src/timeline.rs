//! Update entry points: run the pipeline for one timeline or for every
//! configured timeline.
//!
//! ## Why a full rebuild every time?
//!
//! The table is a projection of the canvas plus note frontmatter. Rebuilding
//! it from scratch on every run means there is no cached state to drift out of
//! sync: the only persistent effects are the set-if-absent frontmatter writes
//! and the single table-block replacement, both of which are no-ops once the
//! vault has converged.

use crate::config::{RunOptions, TimelineConfig, TimelineSettings};
use crate::error::TimelineError;
use crate::output::{TimelineOutput, TimelineStats, UpdateStatus};
use crate::pipeline::{canvas, grouping, pages, reconcile, table};
use crate::store::{ContentChange, NoteStore};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rebuild the table of one timeline.
///
/// # Returns
/// `Ok(TimelineOutput)` whenever the run finished, including when the
/// canvas or target was missing ([`UpdateStatus::SourceUnavailable`]) or
/// some notes failed (see `output.note_errors`).
///
/// # Errors
/// Returns `Err(TimelineError)` only when the configuration is invalid or
/// the target document could not be written.
pub async fn update_timeline(
    store: &dyn NoteStore,
    config: &TimelineConfig,
    options: &RunOptions,
) -> Result<TimelineOutput, TimelineError> {
    let start = Instant::now();
    config.validate()?;
    info!(
        "Updating timeline: {} → {}",
        config.canvas_source, config.target_document
    );

    // ── Step 1: Read sources ─────────────────────────────────────────────
    let canvas_text = match store.read_text(&config.canvas_source).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Canvas unavailable, keeping current table: {}", e);
            return Ok(TimelineOutput::source_unavailable(
                &config.target_document,
                &config.canvas_source,
                elapsed_ms(start),
            ));
        }
    };
    if let Err(e) = store.read_text(&config.target_document).await {
        warn!("Target document unavailable, skipping: {}", e);
        return Ok(TimelineOutput::source_unavailable(
            &config.target_document,
            &config.target_document,
            elapsed_ms(start),
        ));
    }

    // ── Step 2: Parse and group ──────────────────────────────────────────
    let graph = canvas::parse_canvas(&canvas_text);
    let groups = grouping::assign_groups(&graph.groups, &graph.notes, config.include_ungrouped);
    let dropped_notes = if config.include_ungrouped {
        0
    } else {
        grouping::count_ungrouped(&graph.groups, &graph.notes)
    };
    if dropped_notes > 0 {
        debug!("{} canvas notes are outside every group", dropped_notes);
    }

    // ── Step 3: Reconcile notes ──────────────────────────────────────────
    let (rows, note_errors) = reconcile::reconcile_all(store, config, &groups, options).await;
    debug!(
        "Reconciled {} rows ({} with errors)",
        rows.len(),
        note_errors.len()
    );

    // ── Step 4: Render and replace ───────────────────────────────────────
    let rendered = table::render_table(config, &rows);
    let change = store
        .replace_content(&config.target_document, &|doc: &str| {
            table::replace_table_block(doc, &rendered)
        })
        .await
        .map_err(|e| TimelineError::WriteFailed {
            path: config.target_document.clone(),
            source: e,
        })?;
    let status = match change {
        ContentChange::Replaced => UpdateStatus::Updated,
        ContentChange::Unchanged => UpdateStatus::Unchanged,
        ContentChange::Declined => {
            warn!(
                "'{}' has no table block, nothing to replace",
                config.target_document
            );
            UpdateStatus::NothingToReplace
        }
    };

    let stats = TimelineStats {
        groups: graph.groups.len(),
        canvas_notes: graph.notes.len(),
        rows: rows.len(),
        dropped_notes,
        total_pages: pages::total_pages(&rows),
        duration_ms: elapsed_ms(start),
    };
    info!(
        "Timeline '{}' {:?}: {} rows in {}ms",
        config.target_document, status, stats.rows, stats.duration_ms
    );

    Ok(TimelineOutput {
        target_document: config.target_document.clone(),
        status,
        table: rendered,
        rows,
        note_errors,
        stats,
    })
}

/// Rebuild the timeline whose table lives in `target_document`.
///
/// Returns `Ok(None)` when no timeline is configured for that document.
pub async fn update_for_document(
    store: &dyn NoteStore,
    settings: &TimelineSettings,
    target_document: &str,
    options: &RunOptions,
) -> Result<Option<TimelineOutput>, TimelineError> {
    match settings.find(target_document) {
        Some(config) => update_timeline(store, config, options).await.map(Some),
        None => {
            debug!("No timeline configured for '{}'", target_document);
            Ok(None)
        }
    }
}

/// Rebuild every configured timeline, one after another.
///
/// A fatal error for one timeline does not stop the others.
pub async fn update_all(
    store: &dyn NoteStore,
    settings: &TimelineSettings,
    options: &RunOptions,
) -> Vec<Result<TimelineOutput, TimelineError>> {
    let mut results = Vec::with_capacity(settings.timelines.len());
    for config in &settings.timelines {
        results.push(update_timeline(store, config, options).await);
    }
    results
}

/// Synchronous wrapper around [`update_timeline`].
///
/// Creates a temporary tokio runtime. Must not be called from inside an
/// async context.
pub fn update_timeline_sync(
    store: &dyn NoteStore,
    config: &TimelineConfig,
    options: &RunOptions,
) -> Result<TimelineOutput, TimelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TimelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(update_timeline(store, config, options))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSpec;
    use crate::store::MemoryStore;

    const CANVAS: &str = r#"{"nodes":[
        {"type":"group","label":"Act One","x":0,"y":0,"width":100,"height":100},
        {"type":"file","file":"A.md","x":10,"y":5},
        {"type":"file","file":"B.md","x":50,"y":5},
        {"type":"file","file":"C.md","x":20,"y":1}
    ]}"#;

    fn config() -> TimelineConfig {
        TimelineConfig::builder("Plot.canvas", "Timeline.md")
            .columns(["Title", "POV"].map(ColumnSpec::parse))
            .build()
            .unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with_files([
            ("Plot.canvas", CANVAS),
            ("A.md", "---\npov: Alice\n---\n"),
            ("B.md", ""),
            ("C.md", ""),
            ("Timeline.md", "# Timeline\n\n|old|\n|---|\n\nFooter\n"),
        ])
    }

    #[tokio::test]
    async fn act_one_table() {
        let store = store();
        let output = update_timeline(&store, &config(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(output.status, UpdateStatus::Updated);
        assert_eq!(
            output.table,
            "|Title|POV|\n|---|---|\n|[[C]]|none|\n|[[A]]|Alice|\n|[[B]]|none|"
        );
        assert_eq!(
            store.get("Timeline.md").unwrap(),
            format!("# Timeline\n\n{}\n\nFooter\n", output.table)
        );
        assert_eq!(output.stats.total_pages, None);
    }

    #[tokio::test]
    async fn missing_canvas_writes_nothing() {
        let store = store();
        let mut config = config();
        config.canvas_source = "Gone.canvas".into();
        let output = update_timeline(&store, &config, &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(
            output.status,
            UpdateStatus::SourceUnavailable {
                path: "Gone.canvas".into()
            }
        );
        assert_eq!(store.write_count("A.md"), 0);
        assert_eq!(store.write_count("Timeline.md"), 0);
    }

    #[tokio::test]
    async fn missing_target_skips_metadata_writes() {
        let store = MemoryStore::with_files([("Plot.canvas", CANVAS), ("A.md", "")]);
        let output = update_timeline(&store, &config(), &RunOptions::default())
            .await
            .unwrap();
        assert!(matches!(output.status, UpdateStatus::SourceUnavailable { .. }));
        assert_eq!(store.get("A.md").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn unknown_document_is_none() {
        let settings = TimelineSettings {
            timelines: vec![config()],
        };
        let result = update_for_document(&store(), &settings, "Other.md", &RunOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn sync_wrapper_runs() {
        let store = store();
        let output = update_timeline_sync(&store, &config(), &RunOptions::default()).unwrap();
        assert_eq!(output.rows.len(), 3);
    }
}
