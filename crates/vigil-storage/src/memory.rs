//! In-memory order store for tests and ephemeral deployments.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageResult;
use crate::order::{NewOrder, OrderStore, StockOrder};

/// Orders kept in a vector behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<StockOrder>>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Whether the store holds no orders.
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: NewOrder) -> StorageResult<StockOrder> {
        order.validate()?;
        let stored = order.into_order();
        self.orders.write().await.push(stored.clone());
        debug!(order_id = %stored.id, user_id = %stored.user_id, "order stored in memory");
        Ok(stored)
    }

    async fn get_by_user(&self, user_id: &str) -> StorageResult<Vec<StockOrder>> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<StockOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }
}
