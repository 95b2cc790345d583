//! Single-customer point mutations.

use super::{Engine, LedgerError, lock_order};
use crate::Points;
use crate::model::{CustomerId, NewTransaction, RowRef, StaffId, TransactionKind};
use crate::store::{Store, Unit};

impl<S: Store> Engine<S> {
    /// Credit `amount` points to a customer and return the new balance.
    pub fn earn(
        &self,
        customer: CustomerId,
        amount: Points,
        description: impl Into<String>,
        actor: StaffId,
    ) -> Result<Points, LedgerError> {
        ensure_positive(amount)?;
        self.post(NewTransaction {
            customer,
            staff: actor,
            kind: TransactionKind::Earn,
            amount,
            description: description.into(),
        })
    }

    /// Remove `amount` points from a customer and return the new balance.
    ///
    /// Fails with [`LedgerError::InsufficientPoints`] rather than letting the
    /// balance go negative.
    pub fn deduct(
        &self,
        customer: CustomerId,
        amount: Points,
        description: impl Into<String>,
        actor: StaffId,
    ) -> Result<Points, LedgerError> {
        ensure_positive(amount)?;
        self.post(NewTransaction {
            customer,
            staff: actor,
            kind: TransactionKind::ManualAdjust,
            amount: -amount,
            description: description.into(),
        })
    }

    /// Apply a signed entry to one customer's balance and record it:
    /// - Lock the customer row
    /// - Re-read the balance under the lock
    /// - Reject a negative or overflowing result
    /// - Stage the new balance and the audit entry, commit both together
    fn post(&self, entry: NewTransaction) -> Result<Points, LedgerError> {
        let customer = entry.customer;
        let row = RowRef::Customer(customer);

        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            let mut account = unit.customer(customer)?.ok_or(LedgerError::NotFound(row))?;

            let balance = account
                .total_points
                .checked_add(entry.amount)
                .ok_or(LedgerError::BalanceOverflow(customer))?;
            if balance < Points::ZERO {
                return Err(LedgerError::InsufficientPoints {
                    customer,
                    balance: account.total_points,
                    required: -entry.amount,
                });
            }

            account.total_points = balance;
            unit.put_customer(account)?;
            unit.append_transaction(entry)?;
            Ok(balance)
        })
    }
}

fn ensure_positive(amount: Points) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}
