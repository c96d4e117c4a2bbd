//! Order Models

use std::str::FromStr;

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use storefront::{
    catalog::{ProductUuid, VariantUuid},
    coupons::CouponUuid,
    discounts::Discount,
    quote::QuoteTotals,
    uuids::{TypedUuid, UserUuid},
};
use thiserror::Error;

pub type OrderUuid = TypedUuid<Order>;
pub type OrderLineUuid = TypedUuid<OrderLine>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            _ => Err(UnknownOrderStatus(s.to_string())),
        }
    }
}

/// A purchased line, frozen at placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub uuid: OrderLineUuid,
    pub product: ProductUuid,
    pub variant: Option<VariantUuid>,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub tax_inclusive_unit_price: Decimal,
    pub line_total: Decimal,
    pub line_tax: Decimal,
}

/// A coupon redeemed by an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCoupon {
    /// `None` once the coupon itself has been deleted.
    pub coupon: Option<CouponUuid>,
    pub code: String,
    pub discount: Discount,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub uuid: OrderUuid,

    /// Human readable number, `ORD-<n>`.
    pub number: String,

    pub user: UserUuid,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub coupons: Vec<OrderCoupon>,
    pub totals: QuoteTotals,
    pub shipping_details: Option<Map<String, Value>>,
    pub placed_at: Timestamp,
}

/// An order ready to be stored; the number is assigned on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub uuid: OrderUuid,
    pub user: UserUuid,
    pub lines: Vec<OrderLine>,
    pub coupons: Vec<OrderCoupon>,
    pub totals: QuoteTotals,
    pub shipping_details: Option<Map<String, Value>>,
    pub placed_at: Timestamp,
}

impl NewOrder {
    #[must_use]
    pub fn into_order(self, number: String) -> Order {
        Order {
            uuid: self.uuid,
            number,
            user: self.user,
            status: OrderStatus::Pending,
            lines: self.lines,
            coupons: self.coupons,
            totals: self.totals,
            shipping_details: self.shipping_details,
            placed_at: self.placed_at,
        }
    }
}

/// Shipping charge and the opaque delivery details supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shipping {
    pub amount: Decimal,
    pub details: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceOrder {
    pub coupon_codes: Vec<String>,
    pub shipping: Shipping,

    /// Empty the cart once the order is stored.
    pub clear_cart: bool,
}
