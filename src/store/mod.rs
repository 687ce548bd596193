//! The note-storage boundary.
//!
//! The pipeline never touches the file system directly. Everything it needs
//! from the vault goes through [`NoteStore`]: read a file, resolve a note,
//! read or mutate its frontmatter, and replace a document's content with a
//! pure text transform. Two implementations ship with the crate:
//!
//! * [`FsStore`] — a vault directory on disk (used by the CLI)
//! * [`MemoryStore`] — an in-memory vault for embedding and tests
//!
//! Stores fail fast: a missing file is [`StoreError::NotFound`], never a
//! wait. Timeouts and retries, if any, belong to the store implementation.

pub mod frontmatter;
mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::path::Path;

/// A note's frontmatter, in insertion order.
pub type Metadata = serde_yaml::Mapping;

/// Mutator applied to a note's frontmatter inside [`NoteStore::mutate_metadata`].
pub type MetadataMutator<'a> = &'a (dyn Fn(&mut Metadata) + Send + Sync);

/// Whole-document transform for [`NoteStore::replace_content`].
/// Returning `None` leaves the document untouched.
pub type ContentTransform<'a> = &'a (dyn Fn(&str) -> Option<String> + Send + Sync);

/// A resolved note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteHandle {
    /// Vault-relative path, as referenced by the canvas.
    pub path: String,
    /// File name without extension; the note's display title.
    pub basename: String,
}

impl NoteHandle {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let basename = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self { path, basename }
    }
}

/// Outcome of [`NoteStore::replace_content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChange {
    /// The transform produced new text and it was written.
    Replaced,
    /// The transform produced the current text; nothing was written.
    Unchanged,
    /// The transform returned `None`; nothing was written.
    Declined,
}

/// Everything the pipeline needs from the vault.
///
/// Implementations must be `Send + Sync`: with concurrent reconciliation,
/// several notes are processed at once against the same store.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Full text of the file at `path`.
    async fn read_text(&self, path: &str) -> Result<String, StoreError>;

    /// Resolve `path` to a Markdown note.
    async fn resolve(&self, path: &str) -> Result<NoteHandle, StoreError>;

    /// Current frontmatter of `note` (empty when it has none).
    async fn metadata(&self, note: &NoteHandle) -> Result<Metadata, StoreError>;

    /// Apply `mutator` to the frontmatter of `note` and persist the result.
    ///
    /// The read-modify-write must be atomic with respect to subsequent
    /// reads; the returned mapping is the persisted state.
    async fn mutate_metadata(
        &self,
        note: &NoteHandle,
        mutator: MetadataMutator<'_>,
    ) -> Result<Metadata, StoreError>;

    /// Apply `transform` to the whole text of `path` and write it back in
    /// one operation.
    async fn replace_content(
        &self,
        path: &str,
        transform: ContentTransform<'_>,
    ) -> Result<ContentChange, StoreError>;
}

/// `true` when `path` names a Markdown file.
pub(crate) fn is_markdown(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
