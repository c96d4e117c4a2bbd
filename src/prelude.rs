//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    catalog::{
        ProductDiscount, ProductSnapshot, ProductUuid, TaxRate, TaxRateKind, TaxRateUuid,
        VariantNotFound, VariantSnapshot, VariantUuid,
    },
    coupons::{
        AssociationDiff, AssociationSet, Coupon, CouponContext, CouponDraft, CouponKind,
        CouponState, CouponStatus, CouponTarget, CouponUuid, CouponValidationError, Eligibility,
        Ineligibility, SignupAudience, resolve,
    },
    discounts::{Discount, DiscountKind, ValidityWindow, round_money},
    pricing::{PricedLine, price_line, tax_inclusive_price, unit_price},
    quote::{AppliedCoupon, Quote, QuoteError, QuoteTotals, RequestedCoupon},
    stock::{
        MAX_LINE_QUANTITY, QuantityError, StockCheckMode, StockDemand, StockTarget,
        available_stock, enforce_quantity_bounds, merge_quantities,
    },
    uuids::{CategoryUuid, TypedUuid, UserUuid},
};
