//! Catalog Snapshots
//!
//! Read-only product, variant and tax facts as they stood when they were read.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    discounts::{Discount, ValidityWindow},
    uuids::{CategoryUuid, TypedUuid},
};

/// Product identifier.
pub type ProductUuid = TypedUuid<ProductSnapshot>;

/// Variant identifier.
pub type VariantUuid = TypedUuid<VariantSnapshot>;

/// Tax rate identifier.
pub type TaxRateUuid = TypedUuid<TaxRate>;

/// A variant id was given that is not one of the product's variants.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Variant not found for product")]
pub struct VariantNotFound {
    /// Product that was asked for.
    pub product: ProductUuid,

    /// Variant that does not belong to it.
    pub variant: VariantUuid,
}

/// A product discount together with the window it is active in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductDiscount {
    /// Amount or percentage taken off the unit price.
    pub discount: Discount,

    /// Stored alongside the discount; carried through but not evaluated.
    pub min_quantity: Option<u32>,

    /// Stored alongside the discount; carried through but not evaluated.
    pub max_quantity: Option<u32>,

    /// When the discount applies.
    pub window: ValidityWindow,
}

impl ProductDiscount {
    /// A discount that is always active.
    #[must_use]
    pub const fn always(discount: Discount) -> Self {
        Self {
            discount,
            min_quantity: None,
            max_quantity: None,
            window: ValidityWindow::always(),
        }
    }

    /// Whether the discount applies at `at`.
    #[must_use]
    pub fn is_active(&self, at: Timestamp) -> bool {
        self.window.contains(at)
    }
}

/// Product variant facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSnapshot {
    /// Variant identifier.
    pub uuid: VariantUuid,

    /// Product the variant belongs to.
    pub product: ProductUuid,

    /// Display key, e.g. `"Red / XL"`.
    pub key: String,

    /// Signed amount added after any product discount.
    pub price_adjustment: Decimal,

    /// When set, authoritative over the product's stock for this variant.
    pub stock_quantity: Option<i64>,
}

/// Unrecognised tax rate kind name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tax rate kind: {0}")]
pub struct UnknownTaxRateKind(pub String);

/// How a tax rate value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxRateKind {
    /// Percent of the discounted price.
    Percentage,

    /// Fixed amount per unit.
    Flat,
}

impl TaxRateKind {
    /// Stored name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::Flat => "FLAT",
        }
    }
}

impl fmt::Display for TaxRateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxRateKind {
    type Err = UnknownTaxRateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENTAGE" => Ok(Self::Percentage),
            "FLAT" => Ok(Self::Flat),
            _ => Err(UnknownTaxRateKind(s.to_string())),
        }
    }
}

/// A tax rate associated with a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRate {
    /// Tax rate identifier.
    pub uuid: TaxRateUuid,

    /// Display name.
    pub name: String,

    /// Whether `value` is a percentage or a flat amount.
    pub kind: TaxRateKind,

    /// Percentage points or amount per unit, depending on `kind`.
    pub value: Decimal,
}

/// Product facts needed to price and stock-check a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product identifier.
    pub uuid: ProductUuid,

    /// Display name, copied onto order lines.
    pub name: String,

    /// Base unit price; missing prices are treated as zero.
    pub unit_price: Option<Decimal>,

    /// Product-level discount with its validity window.
    pub discount: Option<ProductDiscount>,

    /// `None` means unlimited stock.
    pub stock_quantity: Option<i64>,

    /// Smallest quantity a line may hold.
    pub min_purchase_quantity: Option<u32>,

    /// Categories the product belongs to.
    pub categories: FxHashSet<CategoryUuid>,

    /// Rates added on top of the discounted price.
    pub tax_rates: Vec<TaxRate>,

    /// Purchasable variants, if any.
    pub variants: Vec<VariantSnapshot>,
}

impl ProductSnapshot {
    /// A product with a price and nothing else configured.
    #[must_use]
    pub fn new(uuid: ProductUuid, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            uuid,
            name: name.into(),
            unit_price: Some(unit_price),
            discount: None,
            stock_quantity: None,
            min_purchase_quantity: None,
            categories: FxHashSet::default(),
            tax_rates: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Set the product discount.
    #[must_use]
    pub fn with_discount(mut self, discount: ProductDiscount) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Set a finite stock quantity.
    #[must_use]
    pub fn with_stock(mut self, quantity: i64) -> Self {
        self.stock_quantity = Some(quantity);
        self
    }

    /// Set the minimum purchase quantity.
    #[must_use]
    pub fn with_min_purchase(mut self, quantity: u32) -> Self {
        self.min_purchase_quantity = Some(quantity);
        self
    }

    /// Add a category.
    #[must_use]
    pub fn with_category(mut self, category: CategoryUuid) -> Self {
        self.categories.insert(category);
        self
    }

    /// Add a tax rate.
    #[must_use]
    pub fn with_tax_rate(mut self, kind: TaxRateKind, value: Decimal) -> Self {
        self.tax_rates.push(TaxRate {
            uuid: TaxRateUuid::new(),
            name: format!("{kind} {value}"),
            kind,
            value,
        });
        self
    }

    /// Add a variant with the given adjustment and optional own stock.
    #[must_use]
    pub fn with_variant(
        mut self,
        uuid: VariantUuid,
        key: impl Into<String>,
        price_adjustment: Decimal,
        stock_quantity: Option<i64>,
    ) -> Self {
        self.variants.push(VariantSnapshot {
            uuid,
            product: self.uuid,
            key: key.into(),
            price_adjustment,
            stock_quantity,
        });
        self
    }

    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, uuid: VariantUuid) -> Option<&VariantSnapshot> {
        self.variants.iter().find(|variant| variant.uuid == uuid)
    }

    /// Resolve an optional variant request against this product.
    ///
    /// # Errors
    ///
    /// Returns [`VariantNotFound`] when the id is not one of this product's variants.
    pub fn resolve_variant(
        &self,
        variant: Option<VariantUuid>,
    ) -> Result<Option<&VariantSnapshot>, VariantNotFound> {
        variant
            .map(|uuid| {
                self.variant(uuid).ok_or(VariantNotFound {
                    product: self.uuid,
                    variant: uuid,
                })
            })
            .transpose()
    }
}
