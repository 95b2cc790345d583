//! Exchange of points for gift stock.

use super::{Engine, LedgerError, lock_order};
use crate::Points;
use crate::model::{
    CustomerId, GiftId, NewRedemption, NewTransaction, Redemption, RowRef, StaffId,
    TransactionKind,
};
use crate::store::{Store, Unit};

impl<S: Store> Engine<S> {
    /// Exchange a customer's points for one unit of a gift.
    ///
    /// Balance, stock, the redemption record and its `redeem` audit entry are
    /// committed together or not at all:
    /// - Lock customer and gift rows in global lock order
    /// - Re-read both under the locks
    /// - Reject when the gift is out of stock, then when points are short
    /// - Take one unit of stock and `points_required` points
    /// - Record the redemption and its audit entry
    pub fn redeem(
        &self,
        customer: CustomerId,
        gift: GiftId,
        actor: StaffId,
    ) -> Result<Redemption, LedgerError> {
        let customer_row = RowRef::Customer(customer);
        let gift_row = RowRef::Gift(gift);

        self.within_unit(|unit| {
            lock_order::lock_all(unit, [gift_row, customer_row])?;

            let mut account = unit
                .customer(customer)?
                .ok_or(LedgerError::NotFound(customer_row))?;
            let mut item = unit.gift(gift)?.ok_or(LedgerError::NotFound(gift_row))?;

            if item.stock == 0 {
                return Err(LedgerError::OutOfStock(gift));
            }
            let price = item.points_required;
            let balance = account
                .total_points
                .checked_sub(price)
                .filter(|b| *b >= Points::ZERO)
                .ok_or(LedgerError::InsufficientPoints {
                    customer,
                    balance: account.total_points,
                    required: price,
                })?;

            item.stock -= 1;
            account.total_points = balance;
            let description = format!("Redeemed: {}", item.name);

            unit.put_gift(item)?;
            unit.put_customer(account)?;
            let redemption = unit.insert_redemption(NewRedemption {
                customer,
                gift,
                staff: actor,
                points_used: price,
            })?;
            unit.append_transaction(NewTransaction {
                customer,
                staff: actor,
                kind: TransactionKind::Redeem,
                amount: -price,
                description,
            })?;
            Ok(redemption)
        })
    }
}
