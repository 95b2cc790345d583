//! Read paths over committed state, including the audit trail.
//!
//! The audit trail is append-only: nothing here or elsewhere in the engine
//! edits or removes an entry. Entries disappear only together with their
//! customer.

use super::{Engine, LedgerError};
use crate::Points;
use crate::model::{Customer, CustomerId, Gift, GiftId, Redemption, RowRef, Transaction};
use crate::store::Store;

/// A customer's stored balance next to the balance replayed from its audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub customer: CustomerId,
    pub balance: Points,
    pub ledger_sum: Points,
    pub entries: usize,
}

impl Reconciliation {
    fn from_ledger(customer: &Customer, entries: &[Transaction]) -> Self {
        Self {
            customer: customer.id,
            balance: customer.total_points,
            ledger_sum: entries.iter().map(|t| t.amount).sum(),
            entries: entries.len(),
        }
    }

    /// Whether the stored balance matches the sum of the audit entries.
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_sum
    }
}

impl<S: Store> Engine<S> {
    pub fn customer(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        self.store
            .customer(id)?
            .ok_or(LedgerError::NotFound(RowRef::Customer(id)))
    }

    pub fn balance(&self, id: CustomerId) -> Result<Points, LedgerError> {
        Ok(self.customer(id)?.total_points)
    }

    pub fn gift(&self, id: GiftId) -> Result<Gift, LedgerError> {
        self.store
            .gift(id)?
            .ok_or(LedgerError::NotFound(RowRef::Gift(id)))
    }

    /// Every customer, ordered by id.
    pub fn customers(&self) -> Result<Vec<Customer>, LedgerError> {
        Ok(self.store.customers()?)
    }

    /// The gift catalog, ordered by id.
    pub fn gifts(&self) -> Result<Vec<Gift>, LedgerError> {
        Ok(self.store.gifts()?)
    }

    /// A customer's audit entries, newest first.
    pub fn history(&self, id: CustomerId) -> Result<Vec<Transaction>, LedgerError> {
        let (_, mut entries) = self
            .store
            .ledger(id)?
            .ok_or(LedgerError::NotFound(RowRef::Customer(id)))?;
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(entries)
    }

    /// Every redemption, newest first.
    pub fn redemptions(&self) -> Result<Vec<Redemption>, LedgerError> {
        let mut redemptions = self.store.redemptions()?;
        redemptions.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(redemptions)
    }

    /// Replay a customer's audit trail against its stored balance.
    pub fn reconcile(&self, id: CustomerId) -> Result<Reconciliation, LedgerError> {
        let (customer, entries) = self
            .store
            .ledger(id)?
            .ok_or(LedgerError::NotFound(RowRef::Customer(id)))?;
        Ok(Reconciliation::from_ledger(&customer, &entries))
    }

    /// [`reconcile`](Self::reconcile) every customer, ordered by id.
    pub fn reconcile_all(&self) -> Result<Vec<Reconciliation>, LedgerError> {
        let mut report = Vec::new();
        for customer in self.store.customers()? {
            // removed between listing and replay
            let Some((customer, entries)) = self.store.ledger(customer.id)? else {
                continue;
            };
            report.push(Reconciliation::from_ledger(&customer, &entries));
        }
        Ok(report)
    }
}
