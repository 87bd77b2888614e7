//! Order records and the [`OrderStore`] trait.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Buy shares.
    Buy,
    /// Sell shares.
    Sell,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(StorageError::InvalidOrder(format!(
                "order type must be BUY or SELL, got {other:?}"
            ))),
        }
    }
}

/// An order as submitted, before the store assigns identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Owner.
    pub user_id: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of shares.
    pub quantity: u64,
    /// Price per share.
    pub price: f64,
    /// Buy or sell.
    pub order_type: OrderType,
}

impl NewOrder {
    /// Check the order is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidOrder`] for an empty user or symbol,
    /// a zero quantity or a non-positive price.
    pub fn validate(&self) -> StorageResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(StorageError::InvalidOrder("userId must not be empty".into()));
        }
        if self.symbol.trim().is_empty() {
            return Err(StorageError::InvalidOrder("symbol must not be empty".into()));
        }
        if self.quantity == 0 {
            return Err(StorageError::InvalidOrder("quantity must be positive".into()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(StorageError::InvalidOrder("price must be positive".into()));
        }
        Ok(())
    }

    /// Assign a fresh id and the current timestamp.
    #[must_use]
    pub fn into_order(self) -> StockOrder {
        StockOrder {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            symbol: self.symbol,
            quantity: self.quantity,
            price: self.price,
            order_type: self.order_type,
            timestamp: Utc::now(),
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOrder {
    /// Store-assigned identifier.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of shares.
    pub quantity: u64,
    /// Price per share.
    pub price: f64,
    /// Buy or sell.
    pub order_type: OrderType,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

/// Append-only order persistence.
///
/// `create` is the only write and must be atomic per call; the orchestrator
/// relies on nothing stronger.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order and return it with its id and timestamp.
    async fn create(&self, order: NewOrder) -> StorageResult<StockOrder>;

    /// All orders of a user, oldest first.
    async fn get_by_user(&self, user_id: &str) -> StorageResult<Vec<StockOrder>>;

    /// Look up one order.
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<StockOrder>>;
}
