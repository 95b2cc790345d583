use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use super::StoreError;
use crate::model::RowRef;

/// Identifies the unit holding a lock.
pub(crate) type Owner = u64;

/// Exclusive row locks, keyed by row.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    owners: Mutex<HashMap<RowRef, Owner>>,
    released: Condvar,
}

impl LockTable {
    /// Block until `row` is free, then record `owner` as its holder.
    pub(crate) fn acquire(
        &self,
        row: RowRef,
        owner: Owner,
        timeout: Option<Duration>,
    ) -> Result<(), StoreError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut owners = self.owners.lock();

        loop {
            match owners.get(&row) {
                None => {
                    owners.insert(row, owner);
                    return Ok(());
                }
                Some(holder) if *holder == owner => return Err(StoreError::AlreadyHeld(row)),
                Some(_) => {}
            }

            match deadline {
                None => self.released.wait(&mut owners),
                Some(deadline) => {
                    let timed_out = self.released.wait_until(&mut owners, deadline).timed_out();
                    if timed_out && owners.contains_key(&row) {
                        warn!(row = %row, "lock wait timed out");
                        return Err(StoreError::LockTimeout(row));
                    }
                }
            }
        }
    }

    /// Release every row in `rows` still held by `owner` and wake waiters.
    pub(crate) fn release(&self, owner: Owner, rows: &[RowRef]) {
        if rows.is_empty() {
            return;
        }
        let mut owners = self.owners.lock();
        for row in rows {
            if owners.get(row) == Some(&owner) {
                owners.remove(row);
            }
        }
        drop(owners);
        self.released.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn holder(&self, row: RowRef) -> Option<Owner> {
        self.owners.lock().get(&row).copied()
    }
}
