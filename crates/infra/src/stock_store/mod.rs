//! Durable stock-event storage boundary.
//!
//! This module defines an infrastructure-facing abstraction for storing and
//! loading tenant-scoped stock streams without making any storage
//! assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockPersistence;
pub use r#trait::{StockPersistence, StockStoreError};
