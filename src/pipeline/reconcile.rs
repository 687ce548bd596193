//! Metadata reconciler: resolve each note, fill in missing frontmatter keys,
//! and produce its table row.
//!
//! Writes are set-if-absent. A key that already has a value is never
//! overwritten, and a note whose frontmatter already carries every key is
//! never rewritten, so repeated runs converge after the first.

use super::canvas::NoteRef;
use super::grouping::NoteGroup;
use super::pages::{estimate_pages, note_body};
use crate::config::{RunOptions, TimelineConfig};
use crate::error::NoteError;
use crate::output::Row;
use crate::store::frontmatter::value_text;
use crate::store::{Metadata, NoteHandle, NoteStore};
use futures::stream::{self, StreamExt};
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Value written for keys the note does not carry yet.
pub const MISSING_VALUE: &str = "none";

/// A row plus whatever went wrong producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub row: Row,
    pub errors: Vec<NoteError>,
}

/// Reconcile one canvas note at table `position`.
///
/// Never fails: every problem is recorded in [`Reconciled::errors`] and the
/// row falls back to `none` cells.
pub async fn reconcile(
    store: &dyn NoteStore,
    config: &TimelineConfig,
    group: &NoteGroup,
    note: &NoteRef,
    position: usize,
) -> Reconciled {
    let keys = config.metadata_keys();
    let mut errors = Vec::new();
    let mut row = Row {
        position,
        note_path: note.file.clone(),
        title: None,
        group_label: group.label.clone(),
        values: fallback_values(&keys),
        page_count: config.show_page_count.then_some(0.0),
    };

    // ── Step 1: Resolve ──────────────────────────────────────────────────
    let handle = match resolve(store, note).await {
        Ok(handle) => handle,
        Err(detail) => {
            warn!("Row {}: {}", position, detail);
            errors.push(NoteError::Unresolvable {
                position,
                path: note.file.clone(),
            });
            return Reconciled { row, errors };
        }
    };
    row.title = Some(handle.basename.clone());

    // ── Step 2: Fill missing keys ────────────────────────────────────────
    match store.metadata(&handle).await {
        Ok(snapshot) => {
            let metadata = fill_missing(store, config, group, &handle, &keys, snapshot, position)
                .await
                .unwrap_or_else(|(snapshot, error)| {
                    errors.push(error);
                    snapshot
                });
            row.values = cell_values(&keys, &metadata);
        }
        Err(e) => {
            warn!("Row {}: reading metadata failed: {}", position, e);
            errors.push(NoteError::MetadataRead {
                position,
                path: handle.path.clone(),
                detail: e.to_string(),
            });
        }
    }

    // ── Step 3: Page count ───────────────────────────────────────────────
    if config.show_page_count {
        match store.read_text(&handle.path).await {
            Ok(text) => {
                row.page_count = Some(estimate_pages(note_body(&text), config.words_per_page));
            }
            Err(e) => {
                warn!("Row {}: reading body failed: {}", position, e);
                errors.push(NoteError::BodyRead {
                    position,
                    path: handle.path.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }

    Reconciled { row, errors }
}

async fn resolve(store: &dyn NoteStore, note: &NoteRef) -> Result<NoteHandle, String> {
    let path = note
        .file
        .as_deref()
        .ok_or_else(|| "canvas node has no note path".to_string())?;
    store.resolve(path).await.map_err(|e| e.to_string())
}

/// Issue one set-if-absent write when the snapshot lacks any key.
///
/// On failure, returns the snapshot together with the error.
async fn fill_missing(
    store: &dyn NoteStore,
    config: &TimelineConfig,
    group: &NoteGroup,
    handle: &NoteHandle,
    keys: &[&str],
    snapshot: Metadata,
    position: usize,
) -> Result<Metadata, (Metadata, NoteError)> {
    let group_key = config.group_key.as_str();
    let group_value = group.metadata_label();

    let absent = !snapshot.contains_key(group_key)
        || keys.iter().any(|key| !snapshot.contains_key(*key));
    if !absent {
        return Ok(snapshot);
    }

    let mutator = |meta: &mut Metadata| {
        if !meta.contains_key(group_key) {
            meta.insert(Value::from(group_key), Value::from(group_value.as_str()));
        }
        for key in keys {
            if !meta.contains_key(*key) {
                meta.insert(Value::from(*key), Value::from(MISSING_VALUE));
            }
        }
    };

    match store.mutate_metadata(handle, &mutator).await {
        Ok(updated) => {
            debug!("Row {}: filled missing keys in {}", position, handle.path);
            Ok(updated)
        }
        Err(e) => {
            warn!("Row {}: writing metadata failed: {}", position, e);
            let error = NoteError::MetadataWrite {
                position,
                path: handle.path.clone(),
                detail: e.to_string(),
            };
            Err((snapshot, error))
        }
    }
}

fn fallback_values(keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .map(|k| (k.to_string(), MISSING_VALUE.to_string()))
        .collect()
}

fn cell_values(keys: &[&str], metadata: &Metadata) -> BTreeMap<String, String> {
    keys.iter()
        .map(|k| {
            let text = metadata
                .get(*k)
                .map(value_text)
                .unwrap_or_else(|| MISSING_VALUE.to_string());
            (k.to_string(), text)
        })
        .collect()
}

/// Reconcile every note of every group, in table order.
///
/// At most `options.concurrency` notes are in flight; rows come back sorted
/// by position whatever order they completed in.
pub async fn reconcile_all(
    store: &dyn NoteStore,
    config: &TimelineConfig,
    groups: &[NoteGroup],
    options: &RunOptions,
) -> (Vec<Row>, Vec<NoteError>) {
    let jobs: Vec<(usize, &NoteGroup, &NoteRef)> = groups
        .iter()
        .flat_map(|g| g.notes.iter().map(move |n| (g, n)))
        .enumerate()
        .map(|(position, (g, n))| (position, g, n))
        .collect();
    let total = jobs.len();
    let progress = options.progress_callback.as_ref();

    if let Some(cb) = progress {
        cb.on_update_start(total);
    }

    let pending = jobs.into_iter().map(move |(position, group, note)| {
        async move {
            if let Some(cb) = progress {
                cb.on_note_start(position, total);
            }
            let result = reconcile(store, config, group, note, position).await;
            if let Some(cb) = progress {
                match result.errors.first() {
                    None => cb.on_note_complete(
                        position,
                        total,
                        result.row.title.as_deref().unwrap_or(MISSING_VALUE),
                    ),
                    Some(e) => cb.on_note_error(position, total, &e.to_string()),
                }
            }
            result
        }
    });
    let mut results: Vec<Reconciled> = stream::iter(pending)
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|r| r.row.position);

    let success_count = results.iter().filter(|r| r.errors.is_empty()).count();
    if let Some(cb) = progress {
        cb.on_update_complete(total, success_count);
    }

    let mut rows = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        rows.push(result.row);
        errors.extend(result.errors);
    }
    (rows, errors)
}
