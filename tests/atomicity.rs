//! A store whose commits can be made to fail, to check that a failed commit
//! leaves no partial state behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use loyalty_eng::model::{
    Customer, CustomerId, Gift, GiftId, NewRedemption, NewTransaction, Redemption, RowRef,
    Transaction,
};
use loyalty_eng::store::MemoryUnit;
use loyalty_eng::{Engine, LedgerError, MemoryStore, Points, Store, StoreError, Unit};

#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_commits: Arc<AtomicBool>,
}

struct FlakyUnit {
    inner: MemoryUnit,
    fail_commits: Arc<AtomicBool>,
}

impl Store for FlakyStore {
    type Unit = FlakyUnit;

    fn begin(&self) -> Result<FlakyUnit, StoreError> {
        Ok(FlakyUnit {
            inner: self.inner.begin()?,
            fail_commits: Arc::clone(&self.fail_commits),
        })
    }

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        self.inner.customer(id)
    }

    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError> {
        self.inner.gift(id)
    }

    fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.customers()
    }

    fn gifts(&self) -> Result<Vec<Gift>, StoreError> {
        self.inner.gifts()
    }

    fn ledger(&self, id: CustomerId) -> Result<Option<(Customer, Vec<Transaction>)>, StoreError> {
        self.inner.ledger(id)
    }

    fn redemptions(&self) -> Result<Vec<Redemption>, StoreError> {
        self.inner.redemptions()
    }
}

impl Unit for FlakyUnit {
    fn lock(&mut self, row: RowRef) -> Result<(), StoreError> {
        self.inner.lock(row)
    }

    fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        self.inner.customer(id)
    }

    fn gift(&self, id: GiftId) -> Result<Option<Gift>, StoreError> {
        self.inner.gift(id)
    }

    fn put_customer(&mut self, customer: Customer) -> Result<(), StoreError> {
        self.inner.put_customer(customer)
    }

    fn put_gift(&mut self, gift: Gift) -> Result<(), StoreError> {
        self.inner.put_gift(gift)
    }

    fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError> {
        self.inner.delete_customer(id)
    }

    fn delete_gift(&mut self, id: GiftId) -> Result<(), StoreError> {
        self.inner.delete_gift(id)
    }

    fn gift_redeemed(&self, id: GiftId) -> Result<bool, StoreError> {
        self.inner.gift_redeemed(id)
    }

    fn append_transaction(&mut self, entry: NewTransaction) -> Result<Transaction, StoreError> {
        self.inner.append_transaction(entry)
    }

    fn insert_redemption(
        &mut self,
        redemption: NewRedemption,
    ) -> Result<Redemption, StoreError> {
        self.inner.insert_redemption(redemption)
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            self.inner.abort();
            return Err(StoreError::Commit("injected failure".to_string()));
        }
        self.inner.commit()
    }

    fn abort(self) {
        self.inner.abort();
    }
}

fn setup() -> (Engine<FlakyStore>, Arc<AtomicBool>) {
    let store = FlakyStore::default();
    let switch = Arc::clone(&store.fail_commits);
    let engine = Engine::with_store(store);
    engine.open_customer(1).unwrap();
    engine.earn(1, Points::new(100), "visit", 1).unwrap();
    engine.add_gift(10, "Mug", Points::new(60), 1).unwrap();
    (engine, switch)
}

#[test]
fn failed_redeem_commit_leaves_no_trace() {
    let (engine, fail) = setup();
    fail.store(true, Ordering::SeqCst);

    let result = engine.redeem(1, 10, 1);
    assert!(matches!(
        result,
        Err(LedgerError::Internal(StoreError::Commit(_)))
    ));

    assert_eq!(engine.balance(1).unwrap(), Points::new(100));
    assert_eq!(engine.gift(10).unwrap().stock, 1);
    assert!(engine.redemptions().unwrap().is_empty());
    assert_eq!(engine.history(1).unwrap().len(), 1);

    // locks were released by the failed unit
    fail.store(false, Ordering::SeqCst);
    engine.redeem(1, 10, 1).unwrap();
    assert_eq!(engine.balance(1).unwrap(), Points::new(40));
}

#[test]
fn failed_gift_removal_keeps_the_gift() {
    let (engine, fail) = setup();
    fail.store(true, Ordering::SeqCst);

    assert!(matches!(
        engine.remove_gift(10),
        Err(LedgerError::Internal(StoreError::Commit(_)))
    ));
    assert_eq!(engine.gifts().unwrap().len(), 1);

    fail.store(false, Ordering::SeqCst);
    engine.remove_gift(10).unwrap();
    assert!(engine.gifts().unwrap().is_empty());
}

#[test]
fn failed_deduct_commit_leaves_no_trace() {
    let (engine, fail) = setup();
    fail.store(true, Ordering::SeqCst);

    let result = engine.deduct(1, Points::new(30), "fix", 1);
    assert!(matches!(result, Err(LedgerError::Internal(_))));

    let report = engine.reconcile(1).unwrap();
    assert_eq!(report.balance, Points::new(100));
    assert_eq!(report.entries, 1);
    assert!(report.is_balanced());
}
