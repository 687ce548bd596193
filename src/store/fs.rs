//! A vault directory on disk.

use super::{
    frontmatter, is_markdown, ContentChange, ContentTransform, Metadata, MetadataMutator,
    NoteHandle, NoteStore,
};
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// [`NoteStore`] over a vault directory.
///
/// Paths are vault-relative with `/` separators, exactly as they appear in
/// canvas files. Absolute paths and `..` components are rejected. Writes go
/// to a temp file in the same directory and are renamed over the original,
/// so a crash never leaves a half-written note. All read-modify-write
/// operations are serialised, which keeps two canvas nodes pointing at the
/// same note from interleaving.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The vault directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, path: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(path);
        let valid = !path.trim().is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(rel))
    }

    async fn read_located(&self, path: &str, full: &Path) -> Result<String, StoreError> {
        tokio::fs::read_to_string(full)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn read_note(&self, note: &NoteHandle) -> Result<(String, PathBuf), StoreError> {
        let full = self.locate(&note.path)?;
        let text = self.read_located(&note.path, &full).await?;
        Ok((text, full))
    }
}

#[async_trait]
impl NoteStore for FsStore {
    async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        let full = self.locate(path)?;
        self.read_located(path, &full).await
    }

    async fn resolve(&self, path: &str) -> Result<NoteHandle, StoreError> {
        let full = self.locate(path)?;
        if !is_markdown(path) {
            return Err(StoreError::NotANote {
                path: path.to_string(),
            });
        }
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(NoteHandle::new(path)),
            Ok(_) => Err(StoreError::NotANote {
                path: path.to_string(),
            }),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn metadata(&self, note: &NoteHandle) -> Result<Metadata, StoreError> {
        let (text, _) = self.read_note(note).await?;
        let parsed = frontmatter::split(&text).map_err(|detail| StoreError::Frontmatter {
            path: note.path.clone(),
            detail,
        })?;
        Ok(parsed.metadata.unwrap_or_default())
    }

    async fn mutate_metadata(
        &self,
        note: &NoteHandle,
        mutator: MetadataMutator<'_>,
    ) -> Result<Metadata, StoreError> {
        let _guard = self.write_lock.lock().await;
        let (text, full) = self.read_note(note).await?;
        let parsed = frontmatter::split(&text).map_err(|detail| StoreError::Frontmatter {
            path: note.path.clone(),
            detail,
        })?;

        let before = parsed.metadata.clone().unwrap_or_default();
        let mut after = before.clone();
        mutator(&mut after);
        if after == before {
            return Ok(after);
        }

        let updated = parsed.with_metadata(&after).map_err(|detail| {
            StoreError::Frontmatter {
                path: note.path.clone(),
                detail,
            }
        })?;
        write_atomic(&note.path, full, updated).await?;
        debug!("Updated frontmatter of {}", note.path);
        Ok(after)
    }

    async fn replace_content(
        &self,
        path: &str,
        transform: ContentTransform<'_>,
    ) -> Result<ContentChange, StoreError> {
        let _guard = self.write_lock.lock().await;
        let full = self.locate(path)?;
        let current = self.read_located(path, &full).await?;

        let Some(updated) = transform(&current) else {
            return Ok(ContentChange::Declined);
        };
        if updated == current {
            return Ok(ContentChange::Unchanged);
        }

        write_atomic(path, full, updated).await?;
        Ok(ContentChange::Replaced)
    }
}

fn io_error(path: &str, e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound {
            path: path.to_string(),
        }
    } else {
        StoreError::Io {
            path: path.to_string(),
            source: e,
        }
    }
}

/// Atomic write: write to a temp file beside `full`, then rename.
async fn write_atomic(path: &str, full: PathBuf, contents: String) -> Result<(), StoreError> {
    let result = tokio::task::spawn_blocking(move || -> io::Result<()> {
        let dir = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&full).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| io::Error::other(format!("write task panicked: {e}")))
    .and_then(|r| r);

    result.map_err(|e| StoreError::Io {
        path: path.to_string(),
        source: e,
    })
}
