//! Core domain types for the loyalty engine.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::Points;

/// Customer identifier.
pub type CustomerId = u32;

/// Gift identifier.
pub type GiftId = u32;

/// Staff identifier, supplied by the caller and recorded on every audit entry.
pub type StaffId = u32;

/// Identifier of an audit entry or redemption, assigned by the store.
pub type EntryId = u64;

/// A customer holding a points balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub total_points: Points,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId) -> Self {
        Self {
            id,
            total_points: Points::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// A gift that can be exchanged for points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gift {
    pub id: GiftId,
    pub name: String,
    pub points_required: Points,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a gift; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct GiftEdit {
    pub name: Option<String>,
    pub points_required: Option<Points>,
    pub stock: Option<u32>,
}

/// Why a balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Earn,
    Redeem,
    ManualAdjust,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Earn => "earn",
            TransactionKind::Redeem => "redeem",
            TransactionKind::ManualAdjust => "manual_adjust",
        };
        f.write_str(name)
    }
}

/// Immutable audit entry for one balance change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: EntryId,
    pub customer: CustomerId,
    pub staff: StaffId,
    pub kind: TransactionKind,
    /// Signed change applied to the customer's balance.
    pub amount: Points,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Audit entry as handed to the store, before it gets an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub customer: CustomerId,
    pub staff: StaffId,
    pub kind: TransactionKind,
    pub amount: Points,
    pub description: String,
}

/// Immutable record of one gift handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub id: EntryId,
    pub customer: CustomerId,
    pub gift: GiftId,
    pub staff: StaffId,
    pub points_used: Points,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRedemption {
    pub customer: CustomerId,
    pub gift: GiftId,
    pub staff: StaffId,
    pub points_used: Points,
}

/// A mutable row that can be locked inside a unit of work.
///
/// Has no `Ord` on purpose: acquisition order comes from
/// [`lock_order`](crate::engine::lock_order) only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    Customer(CustomerId),
    Gift(GiftId),
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRef::Customer(id) => write!(f, "customer {id}"),
            RowRef::Gift(id) => write!(f, "gift {id}"),
        }
    }
}

/// An operation accepted by [`Engine::apply`](crate::Engine::apply).
#[derive(Debug, Clone)]
pub enum Operation {
    /// Register a customer with an empty balance.
    OpenCustomer { customer: CustomerId },
    /// Add a gift to the catalog.
    AddGift {
        gift: GiftId,
        name: String,
        points_required: Points,
        stock: u32,
    },
    /// Overwrite a gift's stock count (restock or correction).
    SetStock { gift: GiftId, stock: u32 },
    /// Credit points to a customer.
    Earn {
        customer: CustomerId,
        staff: StaffId,
        amount: Points,
        description: String,
    },
    /// Manually remove points from a customer.
    Deduct {
        customer: CustomerId,
        staff: StaffId,
        amount: Points,
        description: String,
    },
    /// Exchange points for one unit of a gift.
    Redeem {
        customer: CustomerId,
        gift: GiftId,
        staff: StaffId,
    },
    /// Delete a customer together with its audit trail and redemptions.
    RemoveCustomer { customer: CustomerId },
    /// Take a never-redeemed gift out of the catalog.
    RemoveGift { gift: GiftId },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::OpenCustomer { .. } => "open customer",
            Operation::AddGift { .. } => "add gift",
            Operation::SetStock { .. } => "set stock",
            Operation::Earn { .. } => "earn",
            Operation::Deduct { .. } => "deduct",
            Operation::Redeem { .. } => "redeem",
            Operation::RemoveCustomer { .. } => "remove customer",
            Operation::RemoveGift { .. } => "remove gift",
        }
    }
}
