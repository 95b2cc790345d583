pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod points;
pub mod store;

pub use config::StoreConfig;
pub use engine::{Engine, LedgerError, Reconciliation};
pub use model::{CustomerId, GiftId, Operation, StaffId};
pub use points::Points;
pub use store::{MemoryStore, Store, StoreError, Unit};
