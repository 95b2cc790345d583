//! Deadlock-free lock acquisition.
//!
//! Every unit that locks more than one row takes them in the order given by
//! [`acquisition_order`]: customers before gifts, then ascending id. Because
//! the order is total and shared by all units, a unit only ever waits for a
//! row that ranks above every row it already holds, so no cycle of waiting
//! units can form.

use crate::model::RowRef;
use crate::store::{StoreError, Unit};

/// Position of a row in the global acquisition order.
fn lock_key(row: &RowRef) -> (u8, u32) {
    match *row {
        RowRef::Customer(id) => (0, id),
        RowRef::Gift(id) => (1, id),
    }
}

/// Sort `rows` into acquisition order, dropping duplicates.
pub fn acquisition_order(rows: impl IntoIterator<Item = RowRef>) -> Vec<RowRef> {
    let mut rows: Vec<RowRef> = rows.into_iter().collect();
    rows.sort_by_key(lock_key);
    rows.dedup();
    rows
}

/// Lock every row in `rows` on `unit`, in acquisition order.
pub fn lock_all<U: Unit>(
    unit: &mut U,
    rows: impl IntoIterator<Item = RowRef>,
) -> Result<(), StoreError> {
    for row in acquisition_order(rows) {
        unit.lock(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ignores_call_order() {
        let a = acquisition_order([RowRef::Gift(1), RowRef::Customer(9)]);
        let b = acquisition_order([RowRef::Customer(9), RowRef::Gift(1)]);
        assert_eq!(a, b);
        assert_eq!(a, vec![RowRef::Customer(9), RowRef::Gift(1)]);
    }

    #[test]
    fn customers_rank_before_gifts_regardless_of_id() {
        let order = acquisition_order([RowRef::Gift(0), RowRef::Customer(u32::MAX)]);
        assert_eq!(order, vec![RowRef::Customer(u32::MAX), RowRef::Gift(0)]);
    }

    #[test]
    fn same_kind_sorted_by_id() {
        let order = acquisition_order([
            RowRef::Gift(5),
            RowRef::Customer(3),
            RowRef::Gift(2),
            RowRef::Customer(1),
        ]);
        assert_eq!(
            order,
            vec![
                RowRef::Customer(1),
                RowRef::Customer(3),
                RowRef::Gift(2),
                RowRef::Gift(5),
            ]
        );
    }

    #[test]
    fn duplicates_are_locked_once() {
        let order = acquisition_order([RowRef::Customer(1), RowRef::Customer(1)]);
        assert_eq!(order, vec![RowRef::Customer(1)]);
    }

    #[test]
    fn overlapping_sets_agree_on_relative_order() {
        let first = acquisition_order([RowRef::Gift(7), RowRef::Customer(2), RowRef::Gift(3)]);
        let second = acquisition_order([RowRef::Gift(3), RowRef::Customer(5), RowRef::Gift(7)]);

        let shared = |order: &[RowRef]| -> Vec<RowRef> {
            order
                .iter()
                .copied()
                .filter(|r| matches!(r, RowRef::Gift(3) | RowRef::Gift(7)))
                .collect()
        };
        assert_eq!(shared(&first), shared(&second));
    }
}
