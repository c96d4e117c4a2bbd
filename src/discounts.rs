//! Discounts
//!
//! The FLAT/PERCENTAGE arithmetic shared by product discounts and coupons.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digits kept on money amounts.
pub const MONEY_SCALE: u32 = 2;

/// Digits kept on the intermediate `value / 100` percentage factor.
pub const PERCENTAGE_FACTOR_SCALE: u32 = 4;

/// Round a money amount half-up to two fractional digits.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a percentage (`10` meaning 10%) into a multiplicative factor,
/// rounded half-up to four fractional digits.
#[must_use]
pub fn percentage_factor(percentage: Decimal) -> Decimal {
    (percentage / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(PERCENTAGE_FACTOR_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Unrecognised discount kind name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown discount kind: {0}")]
pub struct UnknownDiscountKind(pub String);

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Subtract the value as a money amount.
    Flat,

    /// Subtract the value as a percentage of the base amount.
    Percentage,
}

impl DiscountKind {
    /// Stored name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Percentage => "PERCENTAGE",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountKind {
    type Err = UnknownDiscountKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FLAT" => Ok(Self::Flat),
            "PERCENTAGE" => Ok(Self::Percentage),
            _ => Err(UnknownDiscountKind(s.to_string())),
        }
    }
}

/// A discount of a given kind and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Interpretation of `value`.
    pub kind: DiscountKind,

    /// Money amount for [`DiscountKind::Flat`], percentage for [`DiscountKind::Percentage`].
    pub value: Decimal,
}

impl Discount {
    /// Flat money discount.
    #[must_use]
    pub const fn flat(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Flat,
            value,
        }
    }

    /// Percentage discount, `value` in percent.
    #[must_use]
    pub const fn percentage(value: Decimal) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    /// Raw amount this discount takes off `base`.
    ///
    /// Neither clamped nor rounded; callers decide how the result composes with
    /// other adjustments.
    #[must_use]
    pub fn amount_off(&self, base: Decimal) -> Decimal {
        match self.kind {
            DiscountKind::Flat => self.value,
            DiscountKind::Percentage => base * percentage_factor(self.value),
        }
    }

    /// Amount taken off `base`, clamped to `[0, base]` and rounded to money scale.
    #[must_use]
    pub fn capped_amount_off(&self, base: Decimal) -> Decimal {
        let base = base.max(Decimal::ZERO);

        round_money(self.amount_off(base).clamp(Decimal::ZERO, base))
    }
}

/// An inclusive validity window; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityWindow {
    /// First instant at which the window is open.
    pub starts_at: Option<Timestamp>,

    /// Last instant at which the window is open.
    pub ends_at: Option<Timestamp>,
}

impl ValidityWindow {
    /// A window with no bounds.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            starts_at: None,
            ends_at: None,
        }
    }

    /// Whether `at` falls within the window, both ends inclusive.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.starts_at.is_none_or(|start| start <= at) && self.ends_at.is_none_or(|end| at <= end)
    }
}
