//! Storefront domain concerns

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod coupons;
