//! Stock Guard
//!
//! Quantity bounds shared by cart mutations (advisory) and order placement
//! (authoritative).

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::catalog::{ProductSnapshot, ProductUuid, VariantSnapshot, VariantUuid};

/// Largest quantity a single cart or order line can hold.
pub const MAX_LINE_QUANTITY: u32 = 0x7FFF_FFFF;

/// A requested quantity that cannot be satisfied.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero was requested.
    #[error("Quantity must be at least 1")]
    BelowOne,

    /// Fewer than the product's minimum purchase quantity was requested.
    #[error("Minimum purchase quantity is {minimum}")]
    BelowMinimum {
        /// Smallest quantity the product sells in.
        minimum: u32,
    },

    /// More than a single line can hold was requested.
    #[error("Quantity must not exceed {maximum}")]
    AboveMaximum {
        /// Largest quantity per line.
        maximum: u32,
    },

    /// More than the available stock was requested.
    #[error("Only {available} quantities are available in stock.")]
    ExceedsStock {
        /// Units currently available.
        available: u64,
    },
}

/// Whether a stock check is fast feedback or the gate before a real decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheckMode {
    /// Plain read; the result may be stale by the time it is acted on.
    Advisory,

    /// Read under a lock held until the surrounding transaction ends.
    Authoritative,
}

/// The counter a line draws stock from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StockTarget {
    /// The product's own counter.
    Product(ProductUuid),

    /// A variant carrying its own counter.
    Variant(VariantUuid),
}

impl StockTarget {
    /// Counter used by `product` purchased as `variant`.
    #[must_use]
    pub fn for_line(product: &ProductSnapshot, variant: Option<&VariantSnapshot>) -> Self {
        match variant {
            Some(variant) if variant.stock_quantity.is_some() => Self::Variant(variant.uuid),
            _ => Self::Product(product.uuid),
        }
    }
}

/// Units available for `product` purchased as `variant`; `None` means unlimited.
///
/// Variant stock wins when the variant carries one. Negative stored counts are
/// treated as zero.
#[must_use]
pub fn available_stock(product: &ProductSnapshot, variant: Option<&VariantSnapshot>) -> Option<u64> {
    variant
        .and_then(|v| v.stock_quantity)
        .or(product.stock_quantity)
        .map(|quantity| u64::try_from(quantity).unwrap_or(0))
}

/// Check `requested` against the product minimum and the available stock.
///
/// # Errors
///
/// - [`QuantityError::BelowOne`] when `requested` is zero.
/// - [`QuantityError::BelowMinimum`] when below the minimum purchase quantity.
/// - [`QuantityError::AboveMaximum`] when above [`MAX_LINE_QUANTITY`].
/// - [`QuantityError::ExceedsStock`] when above the available stock.
pub fn enforce_quantity_bounds(
    product: &ProductSnapshot,
    variant: Option<&VariantSnapshot>,
    requested: u32,
) -> Result<(), QuantityError> {
    if requested < 1 {
        return Err(QuantityError::BelowOne);
    }

    if let Some(minimum) = product.min_purchase_quantity
        && requested < minimum
    {
        return Err(QuantityError::BelowMinimum { minimum });
    }

    if requested > MAX_LINE_QUANTITY {
        return Err(QuantityError::AboveMaximum {
            maximum: MAX_LINE_QUANTITY,
        });
    }

    ensure_within(available_stock(product, variant), u64::from(requested))
}

fn ensure_within(available: Option<u64>, requested: u64) -> Result<(), QuantityError> {
    match available {
        Some(available) if requested > available => Err(QuantityError::ExceedsStock { available }),
        _ => Ok(()),
    }
}

/// Sum of two line quantities.
///
/// # Errors
///
/// Returns [`QuantityError::AboveMaximum`] when the sum exceeds
/// [`MAX_LINE_QUANTITY`].
pub fn merge_quantities(current: u32, added: u32) -> Result<u32, QuantityError> {
    current
        .checked_add(added)
        .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
        .ok_or(QuantityError::AboveMaximum {
            maximum: MAX_LINE_QUANTITY,
        })
}

#[derive(Debug, Clone, Copy)]
struct Demand {
    quantity: u64,
    available: Option<u64>,
}

/// Quantities requested per stock counter.
///
/// Several lines can draw from one counter, e.g. the base product and a variant
/// without its own stock, so they have to be checked together.
#[derive(Debug, Clone, Default)]
pub struct StockDemand {
    demands: FxHashMap<StockTarget, Demand>,
}

impl StockDemand {
    /// Empty demand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `quantity` units of `product` purchased as `variant`.
    pub fn add(
        &mut self,
        product: &ProductSnapshot,
        variant: Option<&VariantSnapshot>,
        quantity: u32,
    ) {
        let available = available_stock(product, variant);

        self.demands
            .entry(StockTarget::for_line(product, variant))
            .and_modify(|demand| demand.quantity += u64::from(quantity))
            .or_insert(Demand {
                quantity: u64::from(quantity),
                available,
            });
    }

    /// Check every counter's combined demand against its available stock.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::ExceedsStock`] for the first counter that cannot
    /// cover its demand.
    pub fn ensure_available(&self) -> Result<(), QuantityError> {
        let mut targets: Vec<_> = self.demands.iter().collect();
        targets.sort_by_key(|(target, _)| **target);

        targets
            .into_iter()
            .try_for_each(|(_, demand)| ensure_within(demand.available, demand.quantity))
    }

    /// Counters with a finite stock and how many units to take from each,
    /// in a stable order.
    #[must_use]
    pub fn decrements(&self) -> Vec<(StockTarget, u64)> {
        let mut decrements: Vec<_> = self
            .demands
            .iter()
            .filter(|(_, demand)| demand.available.is_some())
            .map(|(target, demand)| (*target, demand.quantity))
            .collect();

        decrements.sort_by_key(|(target, _)| *target);

        decrements
    }
}
