//! JSON-file order store.
//!
//! All orders live in a single JSON array on disk. Writers are serialized
//! through a mutex and every write replaces the file atomically via a
//! temporary sibling, so readers never observe a half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::order::{NewOrder, OrderStore, StockOrder};

/// Order store backed by one JSON document.
#[derive(Debug)]
pub struct JsonFileOrderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileOrderStore {
    /// Open (or prepare to create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = parent_dir(&path);
        std::fs::create_dir_all(&dir)?;
        info!(path = %path.display(), "opened order file");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<Vec<StockOrder>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, orders: Vec<StockOrder>) -> StorageResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &orders))
            .await
            .map_err(|e| StorageError::Internal(format!("write task failed: {e}")))?
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_atomically(path: &Path, orders: &[StockOrder]) -> StorageResult<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    serde_json::to_writer_pretty(&mut tmp, orders)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl OrderStore for JsonFileOrderStore {
    async fn create(&self, order: NewOrder) -> StorageResult<StockOrder> {
        order.validate()?;
        let _guard = self.write_lock.lock().await;

        let mut orders = self.load().await?;
        let stored = order.into_order();
        orders.push(stored.clone());
        self.persist(orders).await?;

        debug!(order_id = %stored.id, path = %self.path.display(), "order written");
        Ok(stored)
    }

    async fn get_by_user(&self, user_id: &str) -> StorageResult<Vec<StockOrder>> {
        let mut orders = self.load().await?;
        orders.retain(|o| o.user_id == user_id);
        Ok(orders)
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<StockOrder>> {
        Ok(self.load().await?.into_iter().find(|o| o.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderType;
    use std::sync::Arc;

    fn order(user: &str) -> NewOrder {
        NewOrder {
            user_id: user.into(),
            symbol: "AAPL".into(),
            quantity: 3,
            price: 101.25,
            order_type: OrderType::Sell,
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileOrderStore::open(dir.path().join("orders.json")).unwrap();
        assert!(store.get_by_user("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/orders.json");

        let created = {
            let store = JsonFileOrderStore::open(&path).unwrap();
            store.create(order("u1")).await.unwrap()
        };

        let reopened = JsonFileOrderStore::open(&path).unwrap();
        assert_eq!(reopened.get_by_id(&created.id).await.unwrap(), Some(created));
        assert!(reopened.get_by_user("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileOrderStore::open(dir.path().join("orders.json")).unwrap());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.create(order("u1")).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.get_by_user("u1").await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileOrderStore::open(&path).unwrap();
        assert!(matches!(
            store.get_by_user("u1").await,
            Err(StorageError::Serialization(_))
        ));
    }
}
