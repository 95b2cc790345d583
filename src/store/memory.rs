use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::locks::{LockTable, Owner};
use super::{Store, StoreError, Unit};
use crate::config::StoreConfig;
use crate::model::{
    Customer, CustomerId, Gift, GiftId, NewRedemption, NewTransaction, Redemption, RowRef,
    Transaction,
};

/// Committed state.
#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    gifts: HashMap<GiftId, Gift>,
    transactions: Vec<Transaction>,
    redemptions: Vec<Redemption>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    locks: LockTable,
    next_owner: AtomicU64,
    next_entry: AtomicU64,
    config: StoreConfig,
}

/// In-process [`Store`] keeping every table in memory.
///
/// Cloning is cheap and yields a handle to the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                locks: LockTable::default(),
                next_owner: AtomicU64::new(1),
                next_entry: AtomicU64::new(1),
                config,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Store for MemoryStore {
    type Unit = MemoryUnit;

    fn begin(&self) -> Result<MemoryUnit, StoreError> {
        let owner = self.shared.next_owner.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryUnit {
            shared: Arc::clone(&self.shared),
            owner,
            held: Vec::new(),
            customers: HashMap::new(),
            gifts: HashMap::new(),
            transactions: Vec::new(),
            redemptions: Vec::new(),
        })
    }

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.shared.tables.read().customers.get(&id).cloned())
    }

    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError> {
        Ok(self.shared.tables.read().gifts.get(&id).cloned())
    }

    fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut customers: Vec<Customer> =
            self.shared.tables.read().customers.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        Ok(customers)
    }

    fn gifts(&self) -> Result<Vec<Gift>, StoreError> {
        let mut gifts: Vec<Gift> = self.shared.tables.read().gifts.values().cloned().collect();
        gifts.sort_by_key(|g| g.id);
        Ok(gifts)
    }

    fn ledger(&self, id: CustomerId) -> Result<Option<(Customer, Vec<Transaction>)>, StoreError> {
        let tables = self.shared.tables.read();
        let Some(customer) = tables.customers.get(&id) else {
            return Ok(None);
        };
        let entries = tables
            .transactions
            .iter()
            .filter(|t| t.customer == id)
            .cloned()
            .collect();
        Ok(Some((customer.clone(), entries)))
    }

    fn redemptions(&self) -> Result<Vec<Redemption>, StoreError> {
        Ok(self.shared.tables.read().redemptions.clone())
    }
}

/// A unit of work against a [`MemoryStore`].
///
/// Writes are staged locally; readers of the store never see them until
/// [`Unit::commit`]. Dropping the unit without committing aborts it.
#[derive(Debug)]
pub struct MemoryUnit {
    shared: Arc<Shared>,
    owner: Owner,
    held: Vec<RowRef>,
    /// `None` marks a staged deletion.
    customers: HashMap<CustomerId, Option<Customer>>,
    gifts: HashMap<GiftId, Option<Gift>>,
    transactions: Vec<Transaction>,
    redemptions: Vec<Redemption>,
}

impl MemoryUnit {
    fn require(&self, row: RowRef) -> Result<(), StoreError> {
        if self.held.contains(&row) {
            Ok(())
        } else {
            Err(StoreError::NotLocked(row))
        }
    }

    fn next_entry_id(&self) -> u64 {
        self.shared.next_entry.fetch_add(1, Ordering::Relaxed)
    }

    fn release_locks(&mut self) {
        let held = mem::take(&mut self.held);
        self.shared.locks.release(self.owner, &held);
    }

    fn discard(&mut self) {
        self.customers.clear();
        self.gifts.clear();
        self.transactions.clear();
        self.redemptions.clear();
        self.release_locks();
    }
}

impl Unit for MemoryUnit {
    fn lock(&mut self, row: RowRef) -> Result<(), StoreError> {
        self.shared
            .locks
            .acquire(row, self.owner, self.shared.config.lock_timeout)?;
        self.held.push(row);
        Ok(())
    }

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        self.require(RowRef::Customer(id))?;
        if let Some(staged) = self.customers.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.shared.tables.read().customers.get(&id).cloned())
    }

    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError> {
        self.require(RowRef::Gift(id))?;
        if let Some(staged) = self.gifts.get(&id) {
            return Ok(staged.clone());
        }
        Ok(self.shared.tables.read().gifts.get(&id).cloned())
    }

    fn put_customer(&mut self, customer: Customer) -> Result<(), StoreError> {
        self.require(RowRef::Customer(customer.id))?;
        self.customers.insert(customer.id, Some(customer));
        Ok(())
    }

    fn put_gift(&mut self, gift: Gift) -> Result<(), StoreError> {
        self.require(RowRef::Gift(gift.id))?;
        self.gifts.insert(gift.id, Some(gift));
        Ok(())
    }

    fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError> {
        self.require(RowRef::Customer(id))?;
        self.customers.insert(id, None);
        self.transactions.retain(|t| t.customer != id);
        self.redemptions.retain(|r| r.customer != id);
        Ok(())
    }

    fn delete_gift(&mut self, id: GiftId) -> Result<(), StoreError> {
        if self.gift_redeemed(id)? {
            return Err(StoreError::Referenced(RowRef::Gift(id)));
        }
        self.gifts.insert(id, None);
        Ok(())
    }

    fn gift_redeemed(&self, id: GiftId) -> Result<bool, StoreError> {
        self.require(RowRef::Gift(id))?;
        if self.redemptions.iter().any(|r| r.gift == id) {
            return Ok(true);
        }
        Ok(self.shared.tables.read().redemptions.iter().any(|r| r.gift == id))
    }

    fn append_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, StoreError> {
        self.require(RowRef::Customer(entry.customer))?;
        let transaction = Transaction {
            id: self.next_entry_id(),
            customer: entry.customer,
            staff: entry.staff,
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description,
            created_at: Utc::now(),
        };
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    fn insert_redemption(
        &mut self,
        redemption: NewRedemption,
    ) -> Result<Redemption, StoreError> {
        self.require(RowRef::Customer(redemption.customer))?;
        self.require(RowRef::Gift(redemption.gift))?;
        let redemption = Redemption {
            id: self.next_entry_id(),
            customer: redemption.customer,
            gift: redemption.gift,
            staff: redemption.staff,
            points_used: redemption.points_used,
            created_at: Utc::now(),
        };
        self.redemptions.push(redemption.clone());
        Ok(redemption)
    }

    fn commit(mut self) -> Result<(), StoreError> {
        let mut tables = self.shared.tables.write();

        let mut deleted = Vec::new();
        for (id, staged) in self.customers.drain() {
            match staged {
                Some(customer) => {
                    tables.customers.insert(id, customer);
                }
                None => deleted.push(id),
            }
        }
        for (id, staged) in self.gifts.drain() {
            match staged {
                Some(gift) => {
                    tables.gifts.insert(id, gift);
                }
                None => {
                    tables.gifts.remove(&id);
                }
            }
        }
        tables.transactions.append(&mut self.transactions);
        tables.redemptions.append(&mut self.redemptions);

        // cascade
        for id in &deleted {
            tables.customers.remove(id);
            tables.transactions.retain(|t| t.customer != *id);
            tables.redemptions.retain(|r| r.customer != *id);
        }
        drop(tables);

        debug!(unit = self.owner, locks = self.held.len(), "unit committed");
        self.release_locks();
        Ok(())
    }

    fn abort(mut self) {
        debug!(unit = self.owner, locks = self.held.len(), "unit aborted");
        self.discard();
    }
}

impl Drop for MemoryUnit {
    fn drop(&mut self) {
        if !self.held.is_empty() {
            debug!(unit = self.owner, "unit dropped without commit");
            self.discard();
        }
    }
}
