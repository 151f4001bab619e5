//! In-memory object store.
//!
//! Useful for testing and single-process runs.

use super::{Namespace, ObjectEntry, ObjectStore};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory object store.
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(Namespace, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    /// Create a new in-memory object store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects in a namespace.
    pub fn count(&self, namespace: Namespace) -> usize {
        self.read().keys().filter(|(ns, _)| *ns == namespace).count()
    }

    /// Whether an object exists.
    pub fn contains(&self, namespace: Namespace, key: &str) -> bool {
        self.read().contains_key(&(namespace, key.to_string()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<(Namespace, String), Vec<u8>>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<(Namespace, String), Vec<u8>>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, namespace: Namespace, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut objects = self.write();
        let id = (namespace, key.to_string());
        if objects.contains_key(&id) {
            return Err(TldwError::Storage(format!("{}/{} already exists", namespace, key)));
        }
        objects.insert(id, bytes);
        Ok(())
    }

    async fn download(&self, namespace: Namespace, key: &str) -> Result<Vec<u8>> {
        self.read()
            .get(&(namespace, key.to_string()))
            .cloned()
            .ok_or_else(|| TldwError::ObjectNotFound(format!("{}/{}", namespace, key)))
    }

    async fn list(&self, namespace: Namespace, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let trimmed = prefix.trim_end_matches('/');
        let dir = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };

        // BTreeMap iteration is already sorted by key
        let entries = self
            .read()
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .filter_map(|(_, key)| key.strip_prefix(&dir))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(|name| ObjectEntry {
                name: name.to_string(),
            })
            .collect();

        Ok(entries)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<()> {
        self.write()
            .remove(&(namespace, key.to_string()))
            .map(|_| ())
            .ok_or_else(|| TldwError::ObjectNotFound(format!("{}/{}", namespace, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_object_store() {
        let store = MemoryObjectStore::new();

        store
            .upload(Namespace::Chunks, "chunks/v1/output001.mp3", b"b".to_vec())
            .await
            .unwrap();
        store
            .upload(Namespace::Chunks, "chunks/v1/output000.mp3", b"a".to_vec())
            .await
            .unwrap();
        store
            .upload(Namespace::Chunks, "chunks/v2/output000.mp3", b"c".to_vec())
            .await
            .unwrap();

        let listed = store.list(Namespace::Chunks, "chunks/v1").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["output000.mp3", "output001.mp3"]);

        assert_eq!(
            store.download(Namespace::Chunks, "chunks/v1/output000.mp3").await.unwrap(),
            b"a"
        );

        store.delete(Namespace::Chunks, "chunks/v1/output000.mp3").await.unwrap();
        assert_eq!(store.count(Namespace::Chunks), 2);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let store = MemoryObjectStore::new();

        let err = store.download(Namespace::Summaries, "abc.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let store = MemoryObjectStore::new();
        store
            .upload(Namespace::Transcriptions, "abc.txt", b"t".to_vec())
            .await
            .unwrap();

        assert!(store.download(Namespace::Summaries, "abc.txt").await.is_err());
        assert!(store.contains(Namespace::Transcriptions, "abc.txt"));
    }

    #[tokio::test]
    async fn test_upload_does_not_overwrite() {
        let store = MemoryObjectStore::new();
        store.upload(Namespace::Summaries, "abc.txt", b"one".to_vec()).await.unwrap();

        assert!(store
            .upload(Namespace::Summaries, "abc.txt", b"two".to_vec())
            .await
            .is_err());
        assert_eq!(store.download(Namespace::Summaries, "abc.txt").await.unwrap(), b"one");
    }
}
