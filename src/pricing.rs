//! Pricing
//!
//! Effective unit price and tax-inclusive price for a product/variant pair.
//! Both calculations are pure and deterministic.

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;

use crate::{
    catalog::{ProductSnapshot, ProductUuid, TaxRate, TaxRateKind, VariantSnapshot, VariantUuid},
    discounts::round_money,
    uuids::CategoryUuid,
};

/// Effective unit price of `product` (and `variant`, if any) at `as_of`.
///
/// The base price has any active product discount subtracted, then the variant
/// adjustment added. The result is floored at zero and rounded half-up to two
/// digits.
#[must_use]
pub fn unit_price(
    product: &ProductSnapshot,
    variant: Option<&VariantSnapshot>,
    as_of: Timestamp,
) -> Decimal {
    let base = product.unit_price.unwrap_or(Decimal::ZERO);

    let discounted = match product.discount {
        Some(discount) if discount.is_active(as_of) => base - discount.discount.amount_off(base),
        _ => base,
    };

    let adjusted = discounted + variant.map_or(Decimal::ZERO, |v| v.price_adjustment);

    round_money(adjusted.max(Decimal::ZERO))
}

/// Discounted price plus every tax contribution, rounded half-up to two digits.
#[must_use]
pub fn tax_inclusive_price(discounted: Decimal, rates: &[TaxRate]) -> Decimal {
    let (percentage, flat) = rates.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(percentage, flat), rate| match rate.kind {
            TaxRateKind::Percentage => (percentage + rate.value, flat),
            TaxRateKind::Flat => (percentage, flat + rate.value),
        },
    );

    round_money(discounted + discounted * percentage / Decimal::ONE_HUNDRED + flat)
}

/// A cart line priced at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    /// Product on the line.
    pub product: ProductUuid,

    /// Variant on the line, if any.
    pub variant: Option<VariantUuid>,

    /// The product's categories, for coupon targeting.
    pub categories: FxHashSet<CategoryUuid>,

    /// Units on the line.
    pub quantity: u32,

    /// Effective unit price, before tax.
    pub unit_price: Decimal,

    /// Unit price with every tax contribution added.
    pub tax_inclusive_unit_price: Decimal,
}

impl PricedLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Tax portion of the line.
    #[must_use]
    pub fn line_tax(&self) -> Decimal {
        (self.tax_inclusive_unit_price - self.unit_price) * Decimal::from(self.quantity)
    }
}

/// Price `quantity` units of `product` (and `variant`) at `as_of`.
#[must_use]
pub fn price_line(
    product: &ProductSnapshot,
    variant: Option<&VariantSnapshot>,
    quantity: u32,
    as_of: Timestamp,
) -> PricedLine {
    let unit = unit_price(product, variant, as_of);

    PricedLine {
        product: product.uuid,
        variant: variant.map(|v| v.uuid),
        categories: product.categories.clone(),
        quantity,
        unit_price: unit,
        tax_inclusive_unit_price: tax_inclusive_price(unit, &product.tax_rates),
    }
}
