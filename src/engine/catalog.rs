//! Customer and gift records.
//!
//! These operations touch the same rows as the ledger, so they go through the
//! same units and row locks.

use chrono::Utc;

use super::{Engine, LedgerError, lock_order};
use crate::Points;
use crate::model::{Customer, CustomerId, Gift, GiftEdit, GiftId, RowRef};
use crate::store::{Store, Unit};

impl<S: Store> Engine<S> {
    /// Register a customer with a zero balance.
    pub fn open_customer(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        let row = RowRef::Customer(id);
        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            if unit.customer(id)?.is_some() {
                return Err(LedgerError::AlreadyExists(row));
            }
            let customer = Customer::new(id);
            unit.put_customer(customer.clone())?;
            Ok(customer)
        })
    }

    /// Add a gift to the catalog.
    pub fn add_gift(
        &self,
        id: GiftId,
        name: impl Into<String>,
        points_required: Points,
        stock: u32,
    ) -> Result<Gift, LedgerError> {
        ensure_price(points_required)?;
        let row = RowRef::Gift(id);
        let name = name.into();
        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            if unit.gift(id)?.is_some() {
                return Err(LedgerError::AlreadyExists(row));
            }
            let gift = Gift {
                id,
                name,
                points_required,
                stock,
                created_at: Utc::now(),
            };
            unit.put_gift(gift.clone())?;
            Ok(gift)
        })
    }

    /// Update a gift's name, price or stock under its row lock.
    pub fn edit_gift(&self, id: GiftId, edit: GiftEdit) -> Result<Gift, LedgerError> {
        if let Some(price) = edit.points_required {
            ensure_price(price)?;
        }
        let row = RowRef::Gift(id);
        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            let mut gift = unit.gift(id)?.ok_or(LedgerError::NotFound(row))?;
            if let Some(name) = edit.name {
                gift.name = name;
            }
            if let Some(price) = edit.points_required {
                gift.points_required = price;
            }
            if let Some(stock) = edit.stock {
                gift.stock = stock;
            }
            unit.put_gift(gift.clone())?;
            Ok(gift)
        })
    }

    /// Overwrite a gift's stock count.
    pub fn set_stock(&self, id: GiftId, stock: u32) -> Result<Gift, LedgerError> {
        self.edit_gift(
            id,
            GiftEdit {
                stock: Some(stock),
                ..GiftEdit::default()
            },
        )
    }

    /// Remove a gift from the catalog.
    ///
    /// Redemptions keep referring to their gift, so a gift that was ever
    /// redeemed stays and the call fails with [`LedgerError::GiftInUse`].
    pub fn remove_gift(&self, id: GiftId) -> Result<(), LedgerError> {
        let row = RowRef::Gift(id);
        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            if unit.gift(id)?.is_none() {
                return Err(LedgerError::NotFound(row));
            }
            if unit.gift_redeemed(id)? {
                return Err(LedgerError::GiftInUse(id));
            }
            unit.delete_gift(id)?;
            Ok(())
        })
    }

    /// Delete a customer along with its transactions and redemptions.
    pub fn remove_customer(&self, id: CustomerId) -> Result<(), LedgerError> {
        let row = RowRef::Customer(id);
        self.within_unit(|unit| {
            lock_order::lock_all(unit, [row])?;
            if unit.customer(id)?.is_none() {
                return Err(LedgerError::NotFound(row));
            }
            unit.delete_customer(id)?;
            Ok(())
        })
    }
}

fn ensure_price(points_required: Points) -> Result<(), LedgerError> {
    if points_required.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(points_required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_customer_twice_fails() {
        let engine = Engine::new();
        engine.open_customer(1).unwrap();
        let result = engine.open_customer(1);
        assert!(matches!(
            result,
            Err(LedgerError::AlreadyExists(RowRef::Customer(1)))
        ));
    }

    #[test]
    fn add_gift_requires_positive_price() {
        let engine = Engine::new();
        let result = engine.add_gift(1, "Mug", Points::ZERO, 5);
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(
            engine.gift(1),
            Err(LedgerError::NotFound(RowRef::Gift(1)))
        ));
    }

    #[test]
    fn add_gift_twice_fails() {
        let engine = Engine::new();
        engine.add_gift(1, "Mug", Points::new(10), 5).unwrap();
        let result = engine.add_gift(1, "Cap", Points::new(20), 1);
        assert!(matches!(
            result,
            Err(LedgerError::AlreadyExists(RowRef::Gift(1)))
        ));
        assert_eq!(engine.gift(1).unwrap().name, "Mug");
    }

    #[test]
    fn edit_gift_updates_only_given_fields() {
        let engine = Engine::new();
        engine.add_gift(1, "Mug", Points::new(10), 5).unwrap();

        let gift = engine
            .edit_gift(
                1,
                GiftEdit {
                    points_required: Some(Points::new(15)),
                    ..GiftEdit::default()
                },
            )
            .unwrap();
        assert_eq!(gift.name, "Mug");
        assert_eq!(gift.points_required, Points::new(15));
        assert_eq!(gift.stock, 5);
    }

    #[test]
    fn edit_gift_rejects_non_positive_price() {
        let engine = Engine::new();
        engine.add_gift(1, "Mug", Points::new(10), 5).unwrap();
        let result = engine.edit_gift(
            1,
            GiftEdit {
                points_required: Some(Points::new(-1)),
                ..GiftEdit::default()
            },
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(engine.gift(1).unwrap().points_required, Points::new(10));
    }

    #[test]
    fn set_stock_restocks() {
        let engine = Engine::new();
        engine.add_gift(1, "Mug", Points::new(10), 0).unwrap();
        assert_eq!(engine.set_stock(1, 12).unwrap().stock, 12);
        assert!(matches!(
            engine.set_stock(2, 1),
            Err(LedgerError::NotFound(RowRef::Gift(2)))
        ));
    }

    #[test]
    fn remove_customer_drops_history_and_redemptions() {
        let engine = Engine::new();
        engine.open_customer(1).unwrap();
        engine.open_customer(2).unwrap();
        engine.add_gift(5, "Mug", Points::new(10), 3).unwrap();
        for customer in [1, 2] {
            engine.earn(customer, Points::new(30), "visit", 1).unwrap();
            engine.redeem(customer, 5, 1).unwrap();
        }

        engine.remove_customer(1).unwrap();

        assert!(matches!(
            engine.history(1),
            Err(LedgerError::NotFound(RowRef::Customer(1)))
        ));
        let redemptions = engine.redemptions().unwrap();
        assert_eq!(redemptions.len(), 1);
        assert_eq!(redemptions[0].customer, 2);
        assert_eq!(engine.history(2).unwrap().len(), 2);
        // stock handed out stays handed out
        assert_eq!(engine.gift(5).unwrap().stock, 1);
    }

    #[test]
    fn gifts_lists_the_catalog_by_id() {
        let engine = Engine::new();
        assert!(engine.gifts().unwrap().is_empty());
        engine.add_gift(3, "Cap", Points::new(25), 1).unwrap();
        engine.add_gift(1, "Mug", Points::new(10), 5).unwrap();
        engine.add_gift(2, "Tote", Points::new(40), 0).unwrap();

        let catalog: Vec<_> = engine
            .gifts()
            .unwrap()
            .into_iter()
            .map(|g| (g.id, g.name, g.stock))
            .collect();
        assert_eq!(
            catalog,
            vec![
                (1, "Mug".to_string(), 5),
                (2, "Tote".to_string(), 0),
                (3, "Cap".to_string(), 1),
            ]
        );
    }

    #[test]
    fn remove_gift_drops_it_from_the_catalog() {
        let engine = Engine::new();
        engine.add_gift(1, "Mug", Points::new(10), 5).unwrap();
        engine.add_gift(2, "Cap", Points::new(25), 1).unwrap();

        engine.remove_gift(1).unwrap();

        assert!(matches!(
            engine.gift(1),
            Err(LedgerError::NotFound(RowRef::Gift(1)))
        ));
        let ids: Vec<_> = engine.gifts().unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![2]);
        // the id is free again
        engine.add_gift(1, "Mug", Points::new(12), 1).unwrap();
    }

    #[test]
    fn remove_redeemed_gift_fails() {
        let engine = Engine::new();
        engine.open_customer(1).unwrap();
        engine.earn(1, Points::new(30), "visit", 1).unwrap();
        engine.add_gift(5, "Mug", Points::new(10), 3).unwrap();
        engine.redeem(1, 5, 1).unwrap();

        let result = engine.remove_gift(5);
        assert!(matches!(result, Err(LedgerError::GiftInUse(5))));
        assert_eq!(engine.gift(5).unwrap().stock, 2);
        assert_eq!(engine.redemptions().unwrap()[0].gift, 5);
    }

    #[test]
    fn gift_is_removable_once_its_redeemers_are_gone() {
        let engine = Engine::new();
        engine.open_customer(1).unwrap();
        engine.earn(1, Points::new(30), "visit", 1).unwrap();
        engine.add_gift(5, "Mug", Points::new(10), 3).unwrap();
        engine.redeem(1, 5, 1).unwrap();

        engine.remove_customer(1).unwrap();
        engine.remove_gift(5).unwrap();
        assert!(engine.gifts().unwrap().is_empty());
    }

    #[test]
    fn remove_unknown_gift_fails() {
        let engine = Engine::new();
        assert!(matches!(
            engine.remove_gift(9),
            Err(LedgerError::NotFound(RowRef::Gift(9)))
        ));
    }

    #[test]
    fn remove_unknown_customer_fails() {
        let engine = Engine::new();
        assert!(matches!(
            engine.remove_customer(4),
            Err(LedgerError::NotFound(RowRef::Customer(4)))
        ));
    }
}
