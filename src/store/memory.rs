//! An in-memory vault.

use super::{
    frontmatter, is_markdown, ContentChange, ContentTransform, Metadata, MetadataMutator,
    NoteHandle, NoteStore,
};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// [`NoteStore`] backed by a map of path → file text.
///
/// Useful when the host application already holds the vault in memory, and
/// for tests: [`MemoryStore::write_count`] tells how often a file was
/// rewritten and [`MemoryStore::set_read_only`] makes writes to a path fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, String>,
    read_only: BTreeSet<String>,
    writes: BTreeMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(path, text)` pairs.
    pub fn with_files<P, T>(files: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        let store = Self::new();
        for (path, text) in files {
            store.insert(path, text);
        }
        store
    }

    /// Create or overwrite a file. Does not count as a pipeline write.
    pub fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
        self.lock().files.insert(path.into(), text.into());
    }

    /// Current text of a file.
    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    /// Make every write to `path` fail with an I/O error.
    pub fn set_read_only(&self, path: impl Into<String>, read_only: bool) {
        let path = path.into();
        let mut inner = self.lock();
        if read_only {
            inner.read_only.insert(path);
        } else {
            inner.read_only.remove(&path);
        }
    }

    /// How many times the pipeline rewrote `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.lock().writes.get(path).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn text(&self, path: &str) -> Result<&String, StoreError> {
        self.files.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })
    }

    fn write(&mut self, path: &str, text: String) -> Result<(), StoreError> {
        if self.read_only.contains(path) {
            return Err(StoreError::Io {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.files.insert(path.to_string(), text);
        *self.writes.entry(path.to_string()).or_default() += 1;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        self.lock().text(path).cloned()
    }

    async fn resolve(&self, path: &str) -> Result<NoteHandle, StoreError> {
        let inner = self.lock();
        inner.text(path)?;
        if !is_markdown(path) {
            return Err(StoreError::NotANote {
                path: path.to_string(),
            });
        }
        Ok(NoteHandle::new(path))
    }

    async fn metadata(&self, note: &NoteHandle) -> Result<Metadata, StoreError> {
        let inner = self.lock();
        let text = inner.text(&note.path)?;
        let parsed = frontmatter::split(text).map_err(|detail| StoreError::Frontmatter {
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
        let mut inner = self.lock();
        let text = inner.text(&note.path)?;
        let parsed = frontmatter::split(text).map_err(|detail| StoreError::Frontmatter {
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
        inner.write(&note.path, updated)?;
        Ok(after)
    }

    async fn replace_content(
        &self,
        path: &str,
        transform: ContentTransform<'_>,
    ) -> Result<ContentChange, StoreError> {
        let mut inner = self.lock();
        let current = inner.text(path)?;
        let Some(updated) = transform(current) else {
            return Ok(ContentChange::Declined);
        };
        if updated == *current {
            return Ok(ContentChange::Unchanged);
        }
        inner.write(path, updated)?;
        Ok(ContentChange::Replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let store = MemoryStore::with_files([("a.md", "body")]);
        store.set_read_only("a.md", true);
        let h = store.resolve("a.md").await.unwrap();
        let err = store
            .mutate_metadata(&h, &|m: &mut Metadata| {
                m.insert("pov".into(), "none".into());
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.get("a.md").as_deref(), Some("body"));
        assert_eq!(store.write_count("a.md"), 0);
    }

    #[tokio::test]
    async fn writes_are_counted() {
        let store = MemoryStore::with_files([("a.md", "body")]);
        let h = store.resolve("a.md").await.unwrap();
        store
            .mutate_metadata(&h, &|m: &mut Metadata| {
                m.insert("pov".into(), "none".into());
            })
            .await
            .unwrap();
        assert_eq!(store.write_count("a.md"), 1);
        assert!(store.get("a.md").unwrap().ends_with("---\nbody"));
    }

    #[tokio::test]
    async fn metadata_write_keeps_bom() {
        let store = MemoryStore::with_files([("a.md", "\u{feff}body")]);
        let h = store.resolve("a.md").await.unwrap();
        store
            .mutate_metadata(&h, &|m: &mut Metadata| {
                m.insert("pov".into(), "none".into());
            })
            .await
            .unwrap();
        assert_eq!(
            store.get("a.md").as_deref(),
            Some("\u{feff}---\npov: none\n---\nbody")
        );
    }

    #[tokio::test]
    async fn non_markdown_is_not_a_note() {
        let store = MemoryStore::with_files([("map.png", "")]);
        assert!(matches!(
            store.resolve("map.png").await.unwrap_err(),
            StoreError::NotANote { .. }
        ));
    }
}
