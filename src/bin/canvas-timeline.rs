//! CLI binary for canvas-timeline.
//!
//! A thin shim over the library crate that loads timeline settings, runs the
//! update for each requested target document and prints results.

use anyhow::{Context, Result};
use canvas_timeline::{
    update_timeline, FsStore, ProgressCallback, RunOptions, TimelineConfig, TimelineOutput,
    TimelineSettings, UpdateProgressCallback, UpdateStatus,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per note. Notes
/// may complete out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_update_start` reports how many notes there are.
    fn new_dynamic(target: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(format!("reading canvas for {target}…"));
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} notes  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reconciling");
    }

    fn elapsed_secs(&self, position: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&position)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Stop the bar when the run ended before any note was reconciled.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl UpdateProgressCallback for CliProgressCallback {
    fn on_update_start(&self, total_notes: usize) {
        self.activate_bar(total_notes);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reconciling {total_notes} notes…"))
        ));
    }

    fn on_note_start(&self, position: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(position, Instant::now());
        self.bar.set_message(format!("row {}", position + 1));
    }

    fn on_note_complete(&self, position: usize, total: usize, title: &str) {
        let secs = self.elapsed_secs(position);
        self.bar.println(format!(
            "  {} Row {:>3}/{:<3}  {}  {}",
            green("✓"),
            position + 1,
            total,
            title,
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_note_error(&self, position: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(position);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Row {:>3}/{:<3}  {}  {}",
            red("✗"),
            position + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_update_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} notes reconciled",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} notes reconciled  ({} with errors)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Update every configured timeline in the current vault
  canvas-timeline --settings timelines.json

  # Update one document's table
  canvas-timeline --vault ~/Novel --settings timelines.json Timeline.md

  # Show the rendered table as well
  canvas-timeline --settings timelines.json --print Timeline.md

  # Structured output for scripting
  canvas-timeline --settings timelines.json --json > result.json

SETTINGS FILE:
  {
    "timelines": [
      {
        "canvas_source": "Plot.canvas",
        "target_document": "Timeline.md",
        "columns": ["Title", "POV | point_of_view", "Group"],
        "title_column_index": 0,
        "group_column_index": 2,
        "colour_column_index": 1,
        "show_page_count": true
      }
    ]
  }

  Column strings: "title", "group", "page_count" are markers; "Heading | key"
  maps a heading to a frontmatter key; a bare "Heading" uses its lower-cased
  form as the key.

ENVIRONMENT VARIABLES:
  CANVAS_TIMELINE_VAULT     Vault directory (default: current directory)
  CANVAS_TIMELINE_SETTINGS  Settings file
  RUST_LOG                  Override the log filter (e.g. canvas_timeline=debug)
"#;

/// Rebuild Markdown timeline tables from canvas layouts.
#[derive(Parser, Debug)]
#[command(
    name = "canvas-timeline",
    version,
    about = "Rebuild Markdown timeline tables from canvas layouts",
    long_about = "Reads each configured canvas, orders its notes by group (left to right) and \
position (top to bottom), fills missing frontmatter keys in every note, and replaces the table \
block of the target document with a freshly rendered table.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Target documents to update. Default: every configured timeline.
    targets: Vec<String>,

    /// Vault directory; canvas and note paths are relative to it.
    #[arg(long, env = "CANVAS_TIMELINE_VAULT", default_value = ".")]
    vault: PathBuf,

    /// JSON settings file listing the timelines.
    #[arg(short, long, env = "CANVAS_TIMELINE_SETTINGS")]
    settings: PathBuf,

    /// Print each rendered table to stdout.
    #[arg(long, env = "CANVAS_TIMELINE_PRINT")]
    print: bool,

    /// Output structured JSON (a list of TimelineOutput) on stdout.
    #[arg(long, env = "CANVAS_TIMELINE_JSON")]
    json: bool,

    /// Number of notes reconciled concurrently.
    #[arg(short, long, env = "CANVAS_TIMELINE_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..=64))]
    concurrency: u32,

    /// Disable progress bar.
    #[arg(long, env = "CANVAS_TIMELINE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CANVAS_TIMELINE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CANVAS_TIMELINE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load settings ────────────────────────────────────────────────────
    let settings = TimelineSettings::load(&cli.settings)
        .await
        .context("Failed to load timeline settings")?;
    let selected = select_timelines(&settings, &cli.targets)?;
    if selected.is_empty() && !cli.quiet {
        eprintln!("{} no timelines configured", cyan("⚠"));
    }

    let store = FsStore::new(&cli.vault);

    // ── Run updates ──────────────────────────────────────────────────────
    let mut outputs: Vec<TimelineOutput> = Vec::with_capacity(selected.len());
    let mut failures = 0usize;

    for config in selected {
        let callback = show_progress.then(|| CliProgressCallback::new_dynamic(&config.target_document));
        let mut options = RunOptions::default().concurrency(cli.concurrency as usize);
        if let Some(cb) = &callback {
            options = options.progress_callback(Arc::clone(cb) as ProgressCallback);
        }

        let result = update_timeline(&store, config, &options).await;
        if let Some(cb) = &callback {
            cb.abandon();
        }

        match result {
            Ok(output) => {
                if !cli.quiet && !cli.json {
                    print_summary(&output);
                }
                outputs.push(output);
            }
            Err(e) => {
                failures += 1;
                eprintln!(
                    "{} {}  {}",
                    red("✘"),
                    bold(&config.target_document),
                    red(&format!("{e:#}"))
                );
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&outputs).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.print {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for (i, output) in outputs.iter().enumerate() {
            if output.table.is_empty() {
                continue;
            }
            if i > 0 {
                writeln!(handle).context("Failed to write to stdout")?;
            }
            writeln!(handle, "{}", output.table).context("Failed to write to stdout")?;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} timeline(s) could not be updated");
    }
    Ok(())
}

/// Timelines for the requested targets, or all of them when none are given.
fn select_timelines<'a>(
    settings: &'a TimelineSettings,
    targets: &[String],
) -> Result<Vec<&'a TimelineConfig>> {
    if targets.is_empty() {
        return Ok(settings.timelines.iter().collect());
    }
    targets
        .iter()
        .map(|target| {
            settings
                .find(target)
                .with_context(|| format!("No timeline is configured for '{target}'"))
        })
        .collect()
}

fn print_summary(output: &TimelineOutput) {
    let (mark, verb) = match &output.status {
        UpdateStatus::Updated => (green("✔"), "updated".to_string()),
        UpdateStatus::Unchanged => (green("✔"), "unchanged".to_string()),
        UpdateStatus::NothingToReplace => (cyan("⚠"), "has no table block".to_string()),
        UpdateStatus::SourceUnavailable { path } => {
            (cyan("⚠"), format!("skipped, '{path}' is unavailable"))
        }
    };
    eprintln!(
        "{}  {} {}  {}",
        mark,
        bold(&output.target_document),
        verb,
        dim(&format!(
            "{} rows, {}ms",
            output.stats.rows, output.stats.duration_ms
        )),
    );
    if let Some(pages) = output.stats.total_pages {
        eprintln!("   {} pages in total", dim(&pages.to_string()));
    }
    if output.stats.dropped_notes > 0 {
        eprintln!(
            "   {} notes outside every group were left out",
            dim(&output.stats.dropped_notes.to_string())
        );
    }
    for error in &output.note_errors {
        eprintln!("   {} {}", red("✗"), error);
    }
}
