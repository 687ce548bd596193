//! Integration tests for canvas-timeline.
//!
//! Every test builds a small vault, either on disk (`tempfile`) through
//! `FsStore` or in memory through `MemoryStore`, and drives the public
//! update entry points end to end.

use canvas_timeline::{
    update_all, update_for_document, update_timeline, ColumnSpec, FsStore, MemoryStore,
    NoteError, NoteStore, RunOptions, TimelineConfig, TimelineError, TimelineSettings,
    UpdateProgressCallback, UpdateStatus,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Two acts side by side, defined right-to-left in the file, plus a text card
/// and a note outside both acts.
const CANVAS: &str = r#"{
  "nodes": [
    {"id":"g2","type":"group","label":"Act Two","x":600,"y":0,"width":500,"height":900},
    {"id":"g1","type":"group","label":"Act One","x":0,"y":0,"width":500,"height":900},
    {"id":"n1","type":"file","file":"Scenes/Arrival.md","x":20,"y":300,"width":200,"height":100},
    {"id":"n2","type":"file","file":"Scenes/Opening.md","x":20,"y":40,"width":200,"height":100},
    {"id":"n3","type":"file","file":"Scenes/Heist.md","x":620,"y":40,"width":200,"height":100},
    {"id":"n4","type":"file","file":"Scenes/Gone.md","x":700,"y":500,"width":200,"height":100},
    {"id":"t1","type":"text","text":"remember the dog","x":30,"y":600,"width":100,"height":50},
    {"id":"n5","type":"file","file":"Scenes/Cut.md","x":2000,"y":0,"width":200,"height":100}
  ],
  "edges": []
}"#;

const TIMELINE_DOC: &str = "# Timeline\n\n| Title | POV |\n|---|---|\n\nNotes below the table.\n";

fn config() -> TimelineConfig {
    TimelineConfig::builder("Plot.canvas", "Timeline.md")
        .columns(["Title", "POV | point_of_view", "Group"].map(ColumnSpec::parse))
        .group_column_index(Some(2))
        .build()
        .unwrap()
}

fn memory_vault() -> MemoryStore {
    MemoryStore::with_files([
        ("Plot.canvas", CANVAS),
        ("Timeline.md", TIMELINE_DOC),
        (
            "Scenes/Opening.md",
            "---\npoint_of_view: Alice\n---\nThe city wakes.\n",
        ),
        ("Scenes/Arrival.md", "Bob arrives by train.\n"),
        (
            "Scenes/Heist.md",
            "---\npoint_of_view: Mallory\ngroup: the heist\n---\nIt goes wrong.\n",
        ),
        ("Scenes/Cut.md", "Never used.\n"),
    ])
}

fn write_file(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

fn disk_vault() -> (tempfile::TempDir, FsStore) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, "Plot.canvas", CANVAS);
    write_file(root, "Timeline.md", TIMELINE_DOC);
    write_file(
        root,
        "Scenes/Opening.md",
        "---\npoint_of_view: Alice\n---\nThe city wakes.\n",
    );
    write_file(root, "Scenes/Arrival.md", "Bob arrives by train.\n");
    write_file(
        root,
        "Scenes/Heist.md",
        "---\npoint_of_view: Mallory\ngroup: the heist\n---\nIt goes wrong.\n",
    );
    let store = FsStore::new(root);
    (dir, store)
}

const EXPECTED_TABLE: &str = "|Title|POV|Group|\n\
|---|---|---|\n\
|[[Opening]]|Alice|act one|\n\
|[[Arrival]]|none|act one|\n\
|[[Heist]]|Mallory|act two|\n\
|none|none|act two|";

// ── End-to-end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_renders_table_in_canvas_order() {
    let store = memory_vault();
    let output = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(output.status, UpdateStatus::Updated);
    assert_eq!(output.table, EXPECTED_TABLE);
    assert_eq!(
        store.get("Timeline.md").unwrap(),
        format!("# Timeline\n\n{EXPECTED_TABLE}\n\nNotes below the table.\n")
    );

    assert_eq!(output.stats.groups, 2);
    assert_eq!(output.stats.canvas_notes, 5);
    assert_eq!(output.stats.rows, 4);
    assert_eq!(output.stats.dropped_notes, 1);
    assert_eq!(
        output.note_errors,
        vec![NoteError::Unresolvable {
            position: 3,
            path: Some("Scenes/Gone.md".into()),
        }]
    );
}

#[tokio::test]
async fn test_missing_keys_are_set_without_overwriting() {
    let store = memory_vault();
    update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();

    let arrival = store.get("Scenes/Arrival.md").unwrap();
    assert!(arrival.starts_with("---\n"), "got: {arrival}");
    assert!(arrival.contains("point_of_view: none"), "got: {arrival}");
    assert!(arrival.contains("group: act one"), "got: {arrival}");
    assert!(arrival.ends_with("---\nBob arrives by train.\n"), "got: {arrival}");

    // Existing values win over the canvas group.
    let heist = store.get("Scenes/Heist.md").unwrap();
    assert!(heist.contains("group: the heist"), "got: {heist}");
    assert_eq!(store.write_count("Scenes/Heist.md"), 0);

    // Outside every group: never touched.
    assert_eq!(store.get("Scenes/Cut.md").as_deref(), Some("Never used.\n"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = memory_vault();
    let options = RunOptions::default();
    let first = update_timeline(&store, &config(), &options).await.unwrap();
    let doc_after_first = store.get("Timeline.md").unwrap();
    let arrival_writes = store.write_count("Scenes/Arrival.md");
    assert_eq!(arrival_writes, 1);

    let second = update_timeline(&store, &config(), &options).await.unwrap();
    assert_eq!(second.status, UpdateStatus::Unchanged);
    assert_eq!(second.table, first.table);
    assert_eq!(store.get("Timeline.md").unwrap(), doc_after_first);
    assert_eq!(store.write_count("Timeline.md"), 1);
    assert_eq!(store.write_count("Scenes/Arrival.md"), arrival_writes);
    assert_eq!(store.write_count("Scenes/Opening.md"), 1);
}

#[tokio::test]
async fn test_disk_vault_round_trip() {
    let (dir, store) = disk_vault();
    let mut config = config();
    config.show_page_count = true;
    config.words_per_page = 2;

    let first = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(first.status, UpdateStatus::Updated);
    assert!(first.table.starts_with("|Title|POV|Group|Page Count|\n"));
    // "The city wakes." → 3 words / 2 per page.
    assert!(
        first.table.contains("|[[Opening]]|Alice|act one|1.50|"),
        "got: {}",
        first.table
    );
    // 3 + 4 + 3 words = 10 / 2 = 5 pages, plus 0 for the unresolved note.
    assert_eq!(first.stats.total_pages, Some(5));

    let doc = std::fs::read_to_string(dir.path().join("Timeline.md")).unwrap();
    assert!(doc.contains(&first.table));
    assert!(doc.ends_with("\n\nNotes below the table.\n"));

    let second = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(second.status, UpdateStatus::Unchanged);
    assert_eq!(second.table, first.table);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Timeline.md")).unwrap(),
        doc
    );
}

// ── Degraded inputs ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_target_without_table_is_nothing_to_replace() {
    let store = memory_vault();
    store.insert("Timeline.md", "# Timeline\n\nNo table yet.\n");
    let output = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.status, UpdateStatus::NothingToReplace);
    assert!(!output.status.did_write());
    assert_eq!(
        store.get("Timeline.md").as_deref(),
        Some("# Timeline\n\nNo table yet.\n")
    );
    assert_eq!(store.write_count("Timeline.md"), 0);
}

#[tokio::test]
async fn test_missing_canvas_preserves_everything() {
    let (dir, store) = disk_vault();
    std::fs::remove_file(dir.path().join("Plot.canvas")).unwrap();

    let output = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(
        output.status,
        UpdateStatus::SourceUnavailable {
            path: "Plot.canvas".into()
        }
    );
    assert!(output.rows.is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Timeline.md")).unwrap(),
        TIMELINE_DOC
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Scenes/Arrival.md")).unwrap(),
        "Bob arrives by train.\n"
    );
}

#[tokio::test]
async fn test_malformed_canvas_renders_empty_table() {
    let store = memory_vault();
    store.insert("Plot.canvas", "{ this is not json");
    let output = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.table, "|Title|POV|Group|\n|---|---|---|");
    assert_eq!(output.stats.rows, 0);
}

#[tokio::test]
async fn test_read_only_note_still_renders_its_row() {
    let store = memory_vault();
    store.set_read_only("Scenes/Arrival.md", true);
    let output = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.status, UpdateStatus::Updated);
    assert!(output.table.contains("|[[Arrival]]|none|act one|"));
    assert!(output
        .note_errors
        .iter()
        .any(|e| matches!(e, NoteError::MetadataWrite { position: 1, .. })));
}

#[tokio::test]
async fn test_unwritable_target_is_fatal() {
    let store = memory_vault();
    store.set_read_only("Timeline.md", true);
    let err = update_timeline(&store, &config(), &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimelineError::WriteFailed { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let store = memory_vault();
    let mut config = config();
    config.columns.clear();
    let err = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TimelineError::InvalidConfig(_)));
    assert_eq!(store.write_count("Timeline.md"), 0);
}

#[tokio::test]
async fn test_config_without_visible_columns_keeps_table() {
    let store = memory_vault();
    let mut config = config();
    config.columns = vec![ColumnSpec::Group];
    config.title_column_index = None;
    config.group_column_index = None;
    config.show_groups = false;

    for _ in 0..2 {
        let err = update_timeline(&store, &config, &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TimelineError::InvalidConfig(_)), "got: {err}");
    }
    assert_eq!(store.get("Timeline.md").as_deref(), Some(TIMELINE_DOC));
    assert_eq!(store.write_count("Timeline.md"), 0);
    assert_eq!(store.write_count("Scenes/Arrival.md"), 0);
}

#[tokio::test]
async fn test_empty_key_column_renders_blank_and_writes_nothing() {
    let store = memory_vault();
    let mut config = config();
    config.columns = ["Title", "Notes |"].map(ColumnSpec::parse).to_vec();
    config.group_column_index = None;

    let first = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    assert!(first.table.contains("|[[Opening]]||"), "got: {}", first.table);
    assert_eq!(store.write_count("Scenes/Heist.md"), 0);

    let second = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(second.status, UpdateStatus::Unchanged);
    assert_eq!(second.table, first.table);
}

// ── Options ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ungrouped_bucket_when_enabled() {
    let store = memory_vault();
    let mut config = config();
    config.include_ungrouped = true;
    let output = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.stats.dropped_notes, 0);
    assert!(output.table.ends_with("|[[Cut]]|none|ungrouped|"), "got: {}", output.table);
}

#[tokio::test]
async fn test_hidden_groups_and_colour() {
    let store = memory_vault();
    let mut config = config();
    config.show_groups = false;
    config.colour_column_index = Some(1);
    let output = update_timeline(&store, &config, &RunOptions::default())
        .await
        .unwrap();
    let lines: Vec<&str> = output.table.lines().collect();
    assert_eq!(lines[0], "|Title|POV|");
    assert_eq!(lines[2], "|<span class=\"alice\"></span>[[Opening]]|Alice|");
    assert_eq!(lines[5], "|<span class=\"none\"></span>none|none|");
}

#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    finished: Mutex<Option<(usize, usize)>>,
}

impl UpdateProgressCallback for Recorder {
    fn on_note_start(&self, _position: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_note_complete(&self, _position: usize, _total: usize, _title: &str) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_note_error(&self, _position: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_update_complete(&self, total: usize, success_count: usize) {
        *self.finished.lock().unwrap() = Some((total, success_count));
    }
}

#[tokio::test]
async fn test_concurrency_keeps_order_and_reports_progress() {
    let store = memory_vault();
    let recorder = Arc::new(Recorder::default());
    let options = RunOptions::default()
        .concurrency(4)
        .progress_callback(recorder.clone());

    let output = update_timeline(&store, &config(), &options).await.unwrap();
    assert_eq!(output.table, EXPECTED_TABLE);
    let positions: Vec<usize> = output.rows.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);

    assert_eq!(recorder.started.load(Ordering::SeqCst), 4);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.finished.lock().unwrap(), Some((4, 3)));
}

// ── Settings ─────────────────────────────────────────────────────────────────

const SETTINGS: &str = r#"{
  "timelines": [
    {
      "canvas_source": "Plot.canvas",
      "target_document": "Timeline.md",
      "columns": ["Title", "POV | point_of_view", "Group"],
      "group_column_index": 2
    },
    {
      "canvas_source": "Missing.canvas",
      "target_document": "Other.md",
      "columns": ["Title"]
    }
  ]
}"#;

#[tokio::test]
async fn test_update_for_document_uses_settings() {
    let store = memory_vault();
    let settings = TimelineSettings::from_json(SETTINGS).unwrap();

    let output = update_for_document(&store, &settings, "Timeline.md", &RunOptions::default())
        .await
        .unwrap()
        .expect("configured");
    assert_eq!(output.table, EXPECTED_TABLE);

    let none = update_for_document(&store, &settings, "Nope.md", &RunOptions::default())
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_update_all_reports_each_timeline() {
    let store = memory_vault();
    let settings = TimelineSettings::from_json(SETTINGS).unwrap();
    let results = update_all(&store, &settings, &RunOptions::default()).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().status, UpdateStatus::Updated);
    assert!(matches!(
        results[1].as_ref().unwrap().status,
        UpdateStatus::SourceUnavailable { .. }
    ));
}

#[tokio::test]
async fn test_settings_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timelines.json");
    std::fs::write(&path, SETTINGS).unwrap();
    let settings = TimelineSettings::load(&path).await.unwrap();
    assert_eq!(settings.timelines.len(), 2);

    let err = TimelineSettings::load(dir.path().join("absent.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, TimelineError::SettingsRead { .. }));
}

#[tokio::test]
async fn test_store_trait_object() {
    let store: Box<dyn NoteStore> = Box::new(memory_vault());
    let output = update_timeline(store.as_ref(), &config(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(output.rows.len(), 4);
}
