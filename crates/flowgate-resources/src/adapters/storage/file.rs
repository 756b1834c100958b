use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::identity::{ResourceKey, ResourceRecord};
use crate::ports::outbound::AttributeStore;

/// Every record, ordered by key. Written to disk bincode-encoded.
type Records = BTreeMap<ResourceKey, Vec<u8>>;

/// File-backed attribute store.
///
/// Keeps every record in memory and rewrites the whole file on each mutation
/// (temp file + rename). Suitable for development and small deployments.
///
/// Writers are serialized by an async mutex and the file is written on the
/// blocking pool; the in-memory map is swapped only after the rename
/// succeeds, so readers never wait on disk.
pub struct FileAttributeStore {
    data: RwLock<Records>,
    writer: Mutex<()>,
    path: PathBuf,
}

impl FileAttributeStore {
    /// Open the store at `path`, loading existing records. A missing file is
    /// an empty store; a malformed one is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let data = match std::fs::read(&path) {
            Ok(bytes) => decode_snapshot(&bytes).map_err(|reason| {
                StoreError::Internal(format!("malformed store file {}: {reason}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Records::new(),
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        };

        tracing::info!(
            path = %path.display(),
            records = data.len(),
            "opened attribute store"
        );

        Ok(Self {
            data: RwLock::new(data),
            writer: Mutex::new(()),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the records, persist it, then publish it.
    async fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Records) -> Result<(), StoreError>,
    {
        let _writer = self.writer.lock().await;

        let mut next = self.data.read().clone();
        change(&mut next)?;

        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || {
            write_snapshot(&path, &next)?;
            Ok::<_, StoreError>(next)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("store writer failed: {e}")))??;

        *self.data.write() = next;
        Ok(())
    }
}

fn decode_snapshot(bytes: &[u8]) -> Result<Records, String> {
    bincode::deserialize(bytes).map_err(|e| e.to_string())
}

fn write_snapshot(path: &Path, records: &Records) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Unavailable(e.to_string());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = bincode::serialize(records).map_err(|e| StoreError::Internal(e.to_string()))?;

    let temp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&temp_path).map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    std::fs::rename(&temp_path, path).map_err(io_err)?;

    Ok(())
}

#[async_trait]
impl AttributeStore for FileAttributeStore {
    async fn get(&self, key: &ResourceKey) -> Result<Vec<u8>, StoreError> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, record: ResourceRecord) -> Result<(), StoreError> {
        self.mutate(|records| {
            records.insert(record.key, record.payload);
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.mutate(|records| {
            records
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(key.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::{ResourceIdentity, ResourceType};
    use std::sync::Arc;
    use std::time::Duration;

    fn record(workflow: &str, payload: &[u8]) -> ResourceRecord {
        ResourceRecord {
            key: ResourceIdentity::new("p", "d", workflow, "", ResourceType::ClusterResource)
                .unwrap()
                .key(),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.db");

        {
            let store = FileAttributeStore::open(&path).unwrap();
            store.put(record("w1", b"one")).await.unwrap();
            store.put(record("w2", b"two")).await.unwrap();
            store.delete(&record("w2", b"").key).await.unwrap();
        }

        let store = FileAttributeStore::open(&path).unwrap();
        assert_eq!(store.get(&record("w1", b"").key).await.unwrap(), b"one");
        assert!(matches!(
            store.get(&record("w2", b"").key).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAttributeStore::open(dir.path().join("nested/none.db")).unwrap();
        assert!(matches!(
            store.get(&record("w", b"").key).await,
            Err(StoreError::NotFound(_))
        ));
        store.put(record("w", b"x")).await.unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.db");
        std::fs::write(&path, [9u8, 0, 0, 0, 1]).unwrap();
        assert!(matches!(
            FileAttributeStore::open(&path),
            Err(StoreError::Internal(_))
        ));
    }

    #[test]
    fn test_truncated_snapshot_is_rejected() {
        let mut records = Records::new();
        records.insert(record("w", b"").key, b"payload".to_vec());
        let bytes = bincode::serialize(&records).unwrap();

        assert!(decode_snapshot(&bytes).is_ok());
        assert!(decode_snapshot(&bytes[..bytes.len() - 1]).is_err());
    }

    #[tokio::test]
    async fn test_reads_do_not_wait_for_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAttributeStore::open(dir.path().join("attributes.db")).unwrap();
        store.put(record("w", b"v1")).await.unwrap();

        let _writer = store.writer.lock().await;
        let read = tokio::time::timeout(Duration::from_secs(1), store.get(&record("w", b"").key))
            .await
            .expect("get blocked behind the writer");
        assert_eq!(read.unwrap(), b"v1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.db");
        let store = Arc::new(FileAttributeStore::open(&path).unwrap());

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .put(record(&format!("w{i}"), format!("v{i}").as_bytes()))
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let reopened = FileAttributeStore::open(&path).unwrap();
        for i in 0..16 {
            assert_eq!(
                reopened.get(&record(&format!("w{i}"), b"").key).await.unwrap(),
                format!("v{i}").into_bytes()
            );
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_records_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("state");
        let store = FileAttributeStore::open(parent.join("attributes.db")).unwrap();
        // A plain file where the store directory should be.
        std::fs::write(&parent, b"").unwrap();

        assert!(matches!(
            store.put(record("w", b"v")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.get(&record("w", b"").key).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
