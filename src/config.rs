//! Configuration types for timeline updates.
//!
//! A timeline is described by a [`TimelineConfig`]: which canvas to read,
//! which document holds the table, and which columns to render. Several
//! timelines live side by side in a [`TimelineSettings`] file keyed by their
//! target document. Per-invocation knobs that do not belong to any single
//! timeline (concurrency, progress reporting) live in [`RunOptions`].
//!
//! Configuration is immutable during a run: the pipeline only ever borrows
//! it, and the settings editor (outside this crate) produces new values
//! instead of mutating shared state.

use crate::error::TimelineError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default divisor for the page-count estimate.
pub const DEFAULT_WORDS_PER_PAGE: u32 = 250;

/// Default frontmatter key receiving a note's group label.
pub const DEFAULT_GROUP_KEY: &str = "group";

/// Configuration for a single canvas → table timeline.
///
/// Built via [`TimelineConfig::builder()`] or deserialised from a
/// [`TimelineSettings`] file.
///
/// # Example
/// ```rust
/// use canvas_timeline::{ColumnSpec, TimelineConfig};
///
/// let config = TimelineConfig::builder("Plot.canvas", "Timeline.md")
///     .columns(["Title", "POV", "Group"].map(ColumnSpec::parse))
///     .title_column_index(Some(0))
///     .colour_column_index(Some(1))
///     .show_page_count(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.columns.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Vault-relative path of the canvas graph.
    pub canvas_source: String,

    /// Vault-relative path of the document whose table block is replaced.
    pub target_document: String,

    /// Ordered column specs. At least one is required.
    pub columns: Vec<ColumnSpec>,

    /// Column rendered as a `[[link]]` to the note. Default: `Some(0)`.
    #[serde(default = "default_title_index")]
    pub title_column_index: Option<usize>,

    /// Column rendered as the row's group label. Default: `None`.
    #[serde(default)]
    pub group_column_index: Option<usize>,

    /// Column whose value becomes the row's style marker. Default: `None`.
    #[serde(default)]
    pub colour_column_index: Option<usize>,

    /// Append a `Page Count` column. Default: false.
    #[serde(default)]
    pub show_page_count: bool,

    /// Render group-role columns. Default: true.
    #[serde(default = "default_true")]
    pub show_groups: bool,

    /// Collect notes outside every group into a trailing `ungrouped` bucket
    /// instead of dropping them. Default: false.
    #[serde(default)]
    pub include_ungrouped: bool,

    /// Frontmatter key that receives the group label. Default: `group`.
    #[serde(default = "default_group_key")]
    pub group_key: String,

    /// Words per estimated page. Default: 250.
    #[serde(default = "default_words_per_page")]
    pub words_per_page: u32,
}

fn default_title_index() -> Option<usize> {
    Some(0)
}

fn default_true() -> bool {
    true
}

fn default_group_key() -> String {
    DEFAULT_GROUP_KEY.to_string()
}

fn default_words_per_page() -> u32 {
    DEFAULT_WORDS_PER_PAGE
}

/// What a column renders, after indices and markers are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole<'a> {
    /// Link to the note (`[[basename]]`).
    Title,
    /// The row's resolved group label.
    Group,
    /// The estimated page count.
    PageCount,
    /// A frontmatter value.
    Property(&'a str),
}

impl TimelineConfig {
    /// Create a new builder for `TimelineConfig`.
    pub fn builder(
        canvas_source: impl Into<String>,
        target_document: impl Into<String>,
    ) -> TimelineConfigBuilder {
        TimelineConfigBuilder {
            config: Self {
                canvas_source: canvas_source.into(),
                target_document: target_document.into(),
                columns: Vec::new(),
                title_column_index: default_title_index(),
                group_column_index: None,
                colour_column_index: None,
                show_page_count: false,
                show_groups: true,
                include_ungrouped: false,
                group_key: default_group_key(),
                words_per_page: DEFAULT_WORDS_PER_PAGE,
            },
        }
    }

    /// Check the constraints a run relies on.
    ///
    /// Out-of-range indices are *not* rejected here; they disable the
    /// corresponding feature.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.canvas_source.trim().is_empty() {
            return Err(TimelineError::InvalidConfig(
                "canvas_source must not be empty".into(),
            ));
        }
        if self.target_document.trim().is_empty() {
            return Err(TimelineError::InvalidConfig(
                "target_document must not be empty".into(),
            ));
        }
        if self.columns.is_empty() {
            return Err(TimelineError::InvalidConfig(format!(
                "timeline for '{}' has no columns",
                self.target_document
            )));
        }
        if !(0..self.columns.len()).any(|i| self.is_column_visible(i))
            && !self.has_trailing_page_count()
        {
            return Err(TimelineError::InvalidConfig(format!(
                "timeline for '{}' renders no visible columns",
                self.target_document
            )));
        }
        if self.group_key.trim().is_empty() {
            return Err(TimelineError::InvalidConfig(
                "group_key must not be empty".into(),
            ));
        }
        if self.words_per_page == 0 {
            return Err(TimelineError::InvalidConfig(
                "words_per_page must be ≥ 1".into(),
            ));
        }
        Ok(())
    }

    /// Title column index, if it points inside `columns`.
    pub fn title_index(&self) -> Option<usize> {
        self.checked_index(self.title_column_index)
    }

    /// Group column index, if it points inside `columns`.
    pub fn group_index(&self) -> Option<usize> {
        self.checked_index(self.group_column_index)
    }

    /// Colour column index, if it points inside `columns`.
    pub fn colour_index(&self) -> Option<usize> {
        self.checked_index(self.colour_column_index)
    }

    fn checked_index(&self, index: Option<usize>) -> Option<usize> {
        index.filter(|&i| i < self.columns.len())
    }

    /// Resolve what column `index` renders. The title index wins over the
    /// group index when both point at the same column.
    pub fn column_role(&self, index: usize) -> Option<ColumnRole<'_>> {
        let spec = self.columns.get(index)?;
        if self.title_index() == Some(index) {
            return Some(ColumnRole::Title);
        }
        if self.group_index() == Some(index) {
            return Some(ColumnRole::Group);
        }
        Some(match spec {
            ColumnSpec::Title => ColumnRole::Title,
            ColumnSpec::Group => ColumnRole::Group,
            ColumnSpec::PageCount => ColumnRole::PageCount,
            ColumnSpec::Property { key, .. } => ColumnRole::Property(key),
        })
    }

    /// Whether column `index` appears in the rendered table.
    pub fn is_column_visible(&self, index: usize) -> bool {
        match self.column_role(index) {
            Some(ColumnRole::Group) => self.show_groups,
            Some(ColumnRole::PageCount) => self.show_page_count,
            Some(_) => true,
            None => false,
        }
    }

    /// Whether a `Page Count` cell is appended after the configured columns.
    pub fn has_trailing_page_count(&self) -> bool {
        self.show_page_count && !self.columns.iter().any(|c| *c == ColumnSpec::PageCount)
    }

    /// Non-empty frontmatter keys the reconciler keeps in sync, in column order.
    pub fn metadata_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for spec in &self.columns {
            if let ColumnSpec::Property { key, .. } = spec {
                if !key.is_empty() && !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

/// Builder for [`TimelineConfig`].
#[derive(Debug)]
pub struct TimelineConfigBuilder {
    config: TimelineConfig,
}

impl TimelineConfigBuilder {
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.config.columns = columns.into_iter().collect();
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.config.columns.push(column);
        self
    }

    pub fn title_column_index(mut self, index: Option<usize>) -> Self {
        self.config.title_column_index = index;
        self
    }

    pub fn group_column_index(mut self, index: Option<usize>) -> Self {
        self.config.group_column_index = index;
        self
    }

    pub fn colour_column_index(mut self, index: Option<usize>) -> Self {
        self.config.colour_column_index = index;
        self
    }

    pub fn show_page_count(mut self, v: bool) -> Self {
        self.config.show_page_count = v;
        self
    }

    pub fn show_groups(mut self, v: bool) -> Self {
        self.config.show_groups = v;
        self
    }

    pub fn include_ungrouped(mut self, v: bool) -> Self {
        self.config.include_ungrouped = v;
        self
    }

    pub fn group_key(mut self, key: impl Into<String>) -> Self {
        self.config.group_key = key.into();
        self
    }

    pub fn words_per_page(mut self, n: u32) -> Self {
        self.config.words_per_page = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TimelineConfig, TimelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Columns ──────────────────────────────────────────────────────────────

/// One configured table column.
///
/// Serialised as its string form so settings files stay hand-editable:
///
/// | String | Column |
/// |--------|--------|
/// | `title` | [`ColumnSpec::Title`] |
/// | `group` | [`ColumnSpec::Group`] |
/// | `page_count` / `page count` | [`ColumnSpec::PageCount`] |
/// | `POV \| point_of_view` | heading `POV`, frontmatter key `point_of_view` |
/// | `POV` | heading `POV`, frontmatter key `pov` |
///
/// Markers match case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnSpec {
    /// Link to the note.
    Title,
    /// Group label.
    Group,
    /// Estimated page count.
    PageCount,
    /// A frontmatter key rendered under `heading`.
    Property { heading: String, key: String },
}

impl ColumnSpec {
    /// Parse the string form. Never fails; see the type docs.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "title" => return ColumnSpec::Title,
            "group" => return ColumnSpec::Group,
            "page_count" | "page count" => return ColumnSpec::PageCount,
            _ => {}
        }
        match trimmed.split_once('|') {
            Some((heading, key)) => ColumnSpec::Property {
                heading: heading.trim().to_string(),
                key: key.trim().to_lowercase(),
            },
            None => ColumnSpec::Property {
                heading: trimmed.to_string(),
                key: trimmed.to_lowercase(),
            },
        }
    }

    /// Convenience constructor for a property column.
    pub fn property(heading: impl Into<String>, key: impl Into<String>) -> Self {
        ColumnSpec::Property {
            heading: heading.into(),
            key: key.into(),
        }
    }

    /// Header cell text.
    pub fn heading(&self) -> &str {
        match self {
            ColumnSpec::Title => "Title",
            ColumnSpec::Group => "Group",
            ColumnSpec::PageCount => "Page Count",
            ColumnSpec::Property { heading, .. } => heading,
        }
    }
}

impl FromStr for ColumnSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ColumnSpec::parse(s))
    }
}

impl TryFrom<String> for ColumnSpec {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(ColumnSpec::parse(&s))
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSpec::Title => f.write_str("title"),
            ColumnSpec::Group => f.write_str("group"),
            ColumnSpec::PageCount => f.write_str("page_count"),
            ColumnSpec::Property { heading, key } => {
                let plain = heading.to_lowercase() == *key
                    && matches!(ColumnSpec::parse(heading), ColumnSpec::Property { .. });
                if plain {
                    f.write_str(heading)
                } else {
                    write!(f, "{heading} | {key}")
                }
            }
        }
    }
}

impl From<ColumnSpec> for String {
    fn from(spec: ColumnSpec) -> Self {
        spec.to_string()
    }
}

// ── Settings ─────────────────────────────────────────────────────────────

/// Every configured timeline, as stored by the external settings layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    #[serde(default)]
    pub timelines: Vec<TimelineConfig>,
}

impl TimelineSettings {
    /// Parse settings from JSON text and validate every timeline.
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        let settings: TimelineSettings =
            serde_json::from_str(json).map_err(|e| TimelineError::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TimelineError::SettingsRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_json(&json).map_err(|e| TimelineError::SettingsParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Validate every timeline.
    pub fn validate(&self) -> Result<(), TimelineError> {
        self.timelines.iter().try_for_each(TimelineConfig::validate)
    }

    /// The timeline that renders into `target_document`, if any.
    pub fn find(&self, target_document: &str) -> Option<&TimelineConfig> {
        self.timelines
            .iter()
            .find(|t| t.target_document == target_document)
    }
}

// ── Run options ──────────────────────────────────────────────────────────

/// Per-invocation options that are not part of a timeline.
#[derive(Clone)]
pub struct RunOptions {
    /// Maximum notes reconciled concurrently. Default: 1 (sequential).
    ///
    /// Row order never depends on this value; results are re-sorted into
    /// canvas order before rendering.
    pub concurrency: usize,

    /// Receives per-note progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn UpdateProgressCallback>"),
            )
            .finish()
    }
}

impl RunOptions {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }
}
