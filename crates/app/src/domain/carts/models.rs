//! Cart Models

use std::str::FromStr;

use jiff::Timestamp;
use rust_decimal::Decimal;
use storefront::{
    catalog::{ProductUuid, VariantUuid},
    discounts::round_money,
    uuids::{TypedUuid, UserUuid},
};
use thiserror::Error;

use crate::pagination::PageRequest;

pub type CartUuid = TypedUuid<CartRecord>;
pub type CartItemUuid = TypedUuid<CartItem>;

/// Cart header row; one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub user: UserUuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A cart line with the unit price captured when it was last changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub uuid: CartItemUuid,
    pub cart: CartUuid,
    pub product: ProductUuid,
    pub variant: Option<VariantUuid>,
    pub variant_label: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Whether this item is the line for `product` purchased as `variant`.
    #[must_use]
    pub fn is_line_for(&self, product: ProductUuid, variant: Option<VariantUuid>) -> bool {
        self.product == product && self.variant == variant
    }
}

/// Cart Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub uuid: CartUuid,
    pub user: UserUuid,
    pub items: Vec<CartItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Cart {
    #[must_use]
    pub fn from_parts(record: CartRecord, items: Vec<CartItem>) -> Self {
        Self {
            uuid: record.uuid,
            user: record.user,
            items,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Sum of the stored line snapshots.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        round_money(self.items.iter().map(CartItem::line_total).sum())
    }

    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Request to add units of a product to the caller's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddCartItem {
    pub product: ProductUuid,
    pub variant: Option<VariantUuid>,
    pub quantity: u32,
}

/// One line of a cart built while signed out.
pub type GuestCartLine = AddCartItem;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown cart sort: {0}")]
pub struct UnknownCartSort(pub String);

/// Orderings offered by the admin cart listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSort {
    UpdatedDesc,
    UpdatedAsc,
    SubtotalDesc,
    SubtotalAsc,
    QuantityDesc,
    QuantityAsc,
}

impl CartSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdatedDesc => "updated_desc",
            Self::UpdatedAsc => "updated_asc",
            Self::SubtotalDesc => "subtotal_desc",
            Self::SubtotalAsc => "subtotal_asc",
            Self::QuantityDesc => "quantity_desc",
            Self::QuantityAsc => "quantity_asc",
        }
    }

    /// `ORDER BY` clause for the cart listing query.
    pub(crate) const fn order_by(self) -> &'static str {
        match self {
            Self::UpdatedDesc => "c.updated_at DESC, c.uuid",
            Self::UpdatedAsc => "c.updated_at ASC, c.uuid",
            Self::SubtotalDesc => "subtotal DESC, c.uuid",
            Self::SubtotalAsc => "subtotal ASC, c.uuid",
            Self::QuantityDesc => "total_quantity DESC, c.uuid",
            Self::QuantityAsc => "total_quantity ASC, c.uuid",
        }
    }
}

impl FromStr for CartSort {
    type Err = UnknownCartSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "updated_desc" => Ok(Self::UpdatedDesc),
            "updated_asc" => Ok(Self::UpdatedAsc),
            "subtotal_desc" => Ok(Self::SubtotalDesc),
            "subtotal_asc" => Ok(Self::SubtotalAsc),
            "quantity_desc" => Ok(Self::QuantityDesc),
            "quantity_asc" => Ok(Self::QuantityAsc),
            _ => Err(UnknownCartSort(s.to_string())),
        }
    }
}

/// Admin cart listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartListQuery {
    /// Matched against the owner's email and name, case-insensitively.
    pub search: Option<String>,
    pub sort: CartSort,
    pub page: PageRequest,
}

/// A row of the admin cart listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub cart: CartUuid,
    pub user: UserUuid,
    pub user_email: String,
    pub item_count: u64,
    pub total_quantity: u64,
    pub subtotal: Decimal,
    pub updated_at: Timestamp,
}
