//! Vigil Storage - order persistence.
//!
//! The order tools are the only writers. Everything goes through the
//! [`OrderStore`] trait, which promises an atomic single-order `create` and
//! per-user queries, nothing more.
//!
//! # Backends
//!
//! | Backend | Durability | Use |
//! |---------|------------|-----|
//! | [`MemoryOrderStore`] | process lifetime | tests, demos |
//! | [`JsonFileOrderStore`] | one JSON file, atomic replace | single-node deployments |

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod file;
pub mod memory;
pub mod order;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileOrderStore;
pub use memory::MemoryOrderStore;
pub use order::{NewOrder, OrderStore, OrderType, StockOrder};
