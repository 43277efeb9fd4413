//! Infrastructure layer: persistence boundary and unit-of-work orchestration.

pub mod stock_store;
pub mod unit_of_work;


pub use stock_store::{InMemoryStockPersistence, StockPersistence, StockStoreError};
pub use unit_of_work::{StockUnitOfWork, UnitOfWorkError};
