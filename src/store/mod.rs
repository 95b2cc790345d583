//! Storage gateway: transactional row access with exclusive row locks.
//!
//! The engine only talks to storage through [`Store`] and [`Unit`]. A unit
//! stages writes and publishes them all at once on [`Unit::commit`]; any
//! unit that ends without committing leaves no trace.

use thiserror::Error;

use crate::model::{
    Customer, CustomerId, Gift, GiftId, NewRedemption, NewTransaction, Redemption, RowRef,
    Transaction,
};

mod locks;
mod memory;

pub use memory::{MemoryStore, MemoryUnit};

/// Failures reported by the storage gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("timed out waiting for the lock on {0}")]
    LockTimeout(RowRef),

    #[error("{0} is already locked by this unit")]
    AlreadyHeld(RowRef),

    #[error("{0} must be locked by this unit first")]
    NotLocked(RowRef),

    #[error("{0} is still referenced by redemptions")]
    Referenced(RowRef),

    #[error("commit failed: {0}")]
    Commit(String),
}

impl StoreError {
    /// Lock contention, as opposed to a broken store.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_) | StoreError::AlreadyHeld(_))
    }
}

/// A shared transactional store.
pub trait Store: Send + Sync {
    type Unit: Unit;

    /// Start a new atomic unit.
    fn begin(&self) -> Result<Self::Unit, StoreError>;

    /// Committed state of one customer.
    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    /// Committed state of one gift.
    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError>;

    /// All committed customers, ordered by id.
    fn customers(&self) -> Result<Vec<Customer>, StoreError>;

    /// The committed gift catalog, ordered by id.
    fn gifts(&self) -> Result<Vec<Gift>, StoreError>;

    /// A customer and its audit entries, read from one consistent snapshot.
    fn ledger(&self, id: CustomerId) -> Result<Option<(Customer, Vec<Transaction>)>, StoreError>;

    /// All committed redemptions, in insertion order.
    fn redemptions(&self) -> Result<Vec<Redemption>, StoreError>;
}

/// One atomic unit of reads and writes.
///
/// Customer and gift rows must be locked with [`Unit::lock`] before they are
/// read or written. Audit entries and redemptions are insert-only and need
/// the rows they reference to be locked.
pub trait Unit {
    /// Take the exclusive lock on `row`, blocking while another unit holds it.
    fn lock(&mut self, row: RowRef) -> Result<(), StoreError>;

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError>;

    fn put_customer(&mut self, customer: Customer) -> Result<(), StoreError>;

    fn put_gift(&mut self, gift: Gift) -> Result<(), StoreError>;

    /// Delete a customer; its transactions and redemptions go with it on commit.
    fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError>;

    /// Delete a gift. Redemptions keep pointing at their gift, so this fails
    /// with [`StoreError::Referenced`] while any exist.
    fn delete_gift(&mut self, id: GiftId) -> Result<(), StoreError>;

    /// Whether any committed or staged redemption references the gift.
    fn gift_redeemed(&self, id: GiftId) -> Result<bool, StoreError>;

    fn append_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, StoreError>;

    fn insert_redemption(&mut self, redemption: NewRedemption)
    -> Result<Redemption, StoreError>;

    /// Publish every staged write at once and release all locks.
    fn commit(self) -> Result<(), StoreError>;

    /// Drop every staged write and release all locks.
    fn abort(self);
}
