//! Storefront
//!
//! Cart pricing, stock guarding and coupon resolution for a storefront backend.
//! Everything here is pure: callers supply catalog snapshots and the current
//! instant, and persist the results themselves.

pub mod catalog;
pub mod coupons;
pub mod discounts;
pub mod prelude;
pub mod pricing;
pub mod quote;
pub mod stock;
pub mod uuids;
