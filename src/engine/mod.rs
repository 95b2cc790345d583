//! Ledger and redemption engine.
//!
//! The engine owns no state of its own: every balance and stock change runs
//! as one atomic unit against a [`Store`], under exclusive row locks taken in
//! [`lock_order`]. Each committed balance change is paired with exactly one
//! audit entry, so a customer's balance always equals the sum of its
//! transactions.
//!
//! Operations take `&self` and block; share an engine across threads to run
//! them concurrently.

use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::Points;
use crate::config::StoreConfig;
use crate::model::{Operation, RowRef};
use crate::store::{MemoryStore, Store, Unit};

mod audit;
mod catalog;
mod error;
mod ledger;
pub mod lock_order;
mod redeem;

pub use audit::Reconciliation;
pub use error::LedgerError;

/// The loyalty engine, generic over the backing store.
#[derive(Debug, Clone)]
pub struct Engine<S = MemoryStore> {
    store: S,
}

impl Engine<MemoryStore> {
    /// Engine over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_store(MemoryStore::new(config))
    }
}

impl Default for Engine<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Public API
impl<S: Store> Engine<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the engine over a stream of operations.
    ///
    /// A failing operation is logged and skipped; it never stops the run.
    pub async fn run(&self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(op) = stream.next().await {
            let _ = self.apply(op);
        }
    }

    /// Apply a single operation.
    pub fn apply(&self, op: Operation) -> Result<(), LedgerError> {
        let name = op.name();
        match op {
            Operation::OpenCustomer { customer } => {
                let result = self.open_customer(customer);
                Self::log_result(name, RowRef::Customer(customer), None, &result);
                result?;
            }
            Operation::AddGift {
                gift,
                name: gift_name,
                points_required,
                stock,
            } => {
                let result = self.add_gift(gift, gift_name, points_required, stock);
                Self::log_result(name, RowRef::Gift(gift), Some(points_required), &result);
                result?;
            }
            Operation::SetStock { gift, stock } => {
                let result = self.set_stock(gift, stock);
                Self::log_result(name, RowRef::Gift(gift), None, &result);
                result?;
            }
            Operation::Earn {
                customer,
                staff,
                amount,
                description,
            } => {
                let result = self.earn(customer, amount, description, staff);
                Self::log_result(name, RowRef::Customer(customer), Some(amount), &result);
                result?;
            }
            Operation::Deduct {
                customer,
                staff,
                amount,
                description,
            } => {
                let result = self.deduct(customer, amount, description, staff);
                Self::log_result(name, RowRef::Customer(customer), Some(amount), &result);
                result?;
            }
            Operation::Redeem {
                customer,
                gift,
                staff,
            } => {
                let result = self.redeem(customer, gift, staff);
                let row = RowRef::Customer(customer);
                match &result {
                    Ok(redemption) => {
                        info!(row = %row, gift, points = %redemption.points_used, "{name} applied");
                    }
                    Err(e) => {
                        info!(row = %row, gift, reason = %e, "{name} skipped");
                    }
                }
                result?;
            }
            Operation::RemoveCustomer { customer } => {
                let result = self.remove_customer(customer);
                Self::log_result(name, RowRef::Customer(customer), None, &result);
                result?;
            }
            Operation::RemoveGift { gift } => {
                let result = self.remove_gift(gift);
                Self::log_result(name, RowRef::Gift(gift), None, &result);
                result?;
            }
        }
        Ok(())
    }
}

/// Private API
impl<S: Store> Engine<S> {
    /// Run `body` inside a fresh unit: commit on success, abort on error.
    fn within_unit<T>(
        &self,
        body: impl FnOnce(&mut S::Unit) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut unit = self.store.begin()?;
        match body(&mut unit) {
            Ok(value) => {
                unit.commit()?;
                Ok(value)
            }
            Err(e) => {
                unit.abort();
                Err(e)
            }
        }
    }

    /// Small helper to log `apply` results
    fn log_result<T, E: std::fmt::Display>(
        op: &str,
        row: RowRef,
        points: Option<Points>,
        result: &Result<T, E>,
    ) {
        match (result, points) {
            (Ok(_), Some(points)) => {
                info!(row = %row, points = %points, "{op} applied");
            }
            (Ok(_), None) => {
                info!(row = %row, "{op} applied");
            }
            (Err(e), Some(points)) => {
                info!(row = %row, points = %points, reason = %e, "{op} skipped");
            }
            (Err(e), None) => {
                info!(row = %row, reason = %e, "{op} skipped");
            }
        }
    }
}
