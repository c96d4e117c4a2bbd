//! Coupon Definitions

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::ProductUuid,
    discounts::{Discount, DiscountKind},
    uuids::{CategoryUuid, TypedUuid, UserUuid},
};

/// Coupon identifier.
pub type CouponUuid = TypedUuid<Coupon>;

/// Unrecognised coupon kind, status or state name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {what}: {value}")]
pub struct UnknownCouponName {
    /// What was being parsed.
    pub what: &'static str,

    /// The rejected input.
    pub value: String,
}

macro_rules! named_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Stored name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownCouponName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(UnknownCouponName {
                        what: $what,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// What a coupon targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponKind {
    /// Specific products or categories.
    Product,

    /// Carts above a minimum value.
    CartValue,

    /// New users, either all of them or a chosen few.
    NewSignup,
}

named_enum!(CouponKind, "coupon kind", {
    Product => "PRODUCT",
    CartValue => "CART_VALUE",
    NewSignup => "NEW_SIGNUP",
});

/// Stored, admin-controlled switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    /// Usable within its validity window.
    Enabled,

    /// Switched off by an admin.
    Disabled,
}

named_enum!(CouponStatus, "coupon status", {
    Enabled => "ENABLED",
    Disabled => "DISABLED",
});

/// State derived from status and end date at a given instant; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponState {
    /// Enabled and not past its end date.
    Enabled,

    /// Enabled but past its end date.
    Expired,

    /// Switched off by an admin.
    Disabled,
}

named_enum!(CouponState, "coupon state", {
    Enabled => "ENABLED",
    Expired => "EXPIRED",
    Disabled => "DISABLED",
});

/// Who a NEW_SIGNUP coupon is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupAudience {
    /// Every new user.
    AllNewUsers,

    /// Only these users.
    Users(FxHashSet<UserUuid>),
}

/// Coupon type together with the associations that type uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponTarget {
    /// Lines whose product is listed, or whose product is in a listed category.
    Products {
        /// Directly targeted products.
        products: FxHashSet<ProductUuid>,

        /// Categories whose products are targeted.
        categories: FxHashSet<CategoryUuid>,
    },

    /// Whole carts whose pre-discount subtotal is at least the minimum.
    CartValue {
        /// Smallest qualifying subtotal.
        minimum_cart_value: Decimal,
    },

    /// Whole carts of the given audience.
    NewSignup(SignupAudience),
}

impl CouponTarget {
    /// Kind of this target.
    #[must_use]
    pub const fn kind(&self) -> CouponKind {
        match self {
            Self::Products { .. } => CouponKind::Product,
            Self::CartValue { .. } => CouponKind::CartValue,
            Self::NewSignup(_) => CouponKind::NewSignup,
        }
    }

    /// Minimum cart value, for CART_VALUE targets.
    #[must_use]
    pub const fn minimum_cart_value(&self) -> Option<Decimal> {
        match self {
            Self::CartValue { minimum_cart_value } => Some(*minimum_cart_value),
            Self::Products { .. } | Self::NewSignup(_) => None,
        }
    }

    /// Whether the target is every new user.
    #[must_use]
    pub const fn applies_to_all_new_users(&self) -> bool {
        matches!(self, Self::NewSignup(SignupAudience::AllNewUsers))
    }
}

/// A validated coupon definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coupon {
    /// Kind and associations.
    pub target: CouponTarget,

    /// Amount taken off eligible lines or the cart.
    pub discount: Discount,

    /// Admin switch.
    pub status: CouponStatus,

    /// First instant the coupon applies (inclusive).
    pub starts_at: Timestamp,

    /// Last instant the coupon applies (inclusive).
    pub ends_at: Timestamp,
}

impl Coupon {
    /// Kind of the coupon.
    #[must_use]
    pub const fn kind(&self) -> CouponKind {
        self.target.kind()
    }

    /// Derived state at `now`.
    #[must_use]
    pub fn state_at(&self, now: Timestamp) -> CouponState {
        match self.status {
            CouponStatus::Disabled => CouponState::Disabled,
            CouponStatus::Enabled if self.ends_at < now => CouponState::Expired,
            CouponStatus::Enabled => CouponState::Enabled,
        }
    }

    /// Enabled, started and not yet ended at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == CouponStatus::Enabled && self.starts_at <= now && now <= self.ends_at
    }
}

/// A coupon definition failing a creation-time rule.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CouponValidationError {
    /// `ends_at` precedes `starts_at`.
    #[error("Coupon end date must not be before start date")]
    EndBeforeStart,

    /// Discount value of zero or less.
    #[error("Discount value must be greater than zero")]
    NonPositiveDiscount,

    /// Percentage outside `(0, 100]`.
    #[error("Percentage discounts must be between 0 and 100")]
    PercentageOutOfRange,

    /// CART_VALUE coupon without a positive minimum.
    #[error("Minimum cart value is required for cart value coupons")]
    MissingMinimumCartValue,

    /// PRODUCT coupon without products or categories.
    #[error("Select at least one product or category")]
    MissingProductTargets,

    /// NEW_SIGNUP coupon with neither users nor the all-new-users flag.
    #[error("Select specific users or enable apply to all new users")]
    MissingSignupAudience,
}

/// Unvalidated coupon definition as submitted by an admin.
///
/// Associations irrelevant to `kind` may be present; [`CouponDraft::validate`]
/// drops them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponDraft {
    /// Requested coupon kind.
    pub kind: CouponKind,

    /// Requested discount.
    pub discount: Discount,

    /// Requested admin switch.
    pub status: CouponStatus,

    /// Start of the validity window.
    pub starts_at: Timestamp,

    /// End of the validity window.
    pub ends_at: Timestamp,

    /// Required for CART_VALUE coupons.
    pub minimum_cart_value: Option<Decimal>,

    /// NEW_SIGNUP audience flag.
    pub apply_to_all_new_users: bool,

    /// PRODUCT coupon products.
    pub products: Vec<ProductUuid>,

    /// PRODUCT coupon categories.
    pub categories: Vec<CategoryUuid>,

    /// NEW_SIGNUP coupon users.
    pub users: Vec<UserUuid>,
}

impl CouponDraft {
    /// Check the creation-time rules and build the coupon.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponValidationError`] the draft violates.
    pub fn validate(self) -> Result<Coupon, CouponValidationError> {
        if self.starts_at > self.ends_at {
            return Err(CouponValidationError::EndBeforeStart);
        }

        if self.discount.kind == DiscountKind::Percentage
            && (self.discount.value <= Decimal::ZERO || self.discount.value > Decimal::ONE_HUNDRED)
        {
            return Err(CouponValidationError::PercentageOutOfRange);
        }

        if self.discount.value <= Decimal::ZERO {
            return Err(CouponValidationError::NonPositiveDiscount);
        }

        let target = match self.kind {
            CouponKind::Product => {
                if self.products.is_empty() && self.categories.is_empty() {
                    return Err(CouponValidationError::MissingProductTargets);
                }

                CouponTarget::Products {
                    products: self.products.into_iter().collect(),
                    categories: self.categories.into_iter().collect(),
                }
            }
            CouponKind::CartValue => match self.minimum_cart_value {
                Some(minimum_cart_value) if minimum_cart_value > Decimal::ZERO => {
                    CouponTarget::CartValue { minimum_cart_value }
                }
                _ => return Err(CouponValidationError::MissingMinimumCartValue),
            },
            CouponKind::NewSignup if self.apply_to_all_new_users => {
                CouponTarget::NewSignup(SignupAudience::AllNewUsers)
            }
            CouponKind::NewSignup => {
                if self.users.is_empty() {
                    return Err(CouponValidationError::MissingSignupAudience);
                }

                CouponTarget::NewSignup(SignupAudience::Users(self.users.into_iter().collect()))
            }
        };

        Ok(Coupon {
            target,
            discount: self.discount,
            status: self.status,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use testresult::TestResult;

    use super::*;

    fn draft(kind: CouponKind) -> CouponDraft {
        let starts_at = Timestamp::UNIX_EPOCH;

        CouponDraft {
            kind,
            discount: Discount::flat(Decimal::TEN),
            status: CouponStatus::Enabled,
            starts_at,
            ends_at: starts_at + SignedDuration::from_hours(24),
            minimum_cart_value: None,
            apply_to_all_new_users: false,
            products: Vec::new(),
            categories: Vec::new(),
            users: Vec::new(),
        }
    }

    #[test]
    fn enabled_coupon_expires_after_end() -> TestResult {
        let coupon = CouponDraft {
            minimum_cart_value: Some(Decimal::ONE),
            ..draft(CouponKind::CartValue)
        }
        .validate()?;

        let second = SignedDuration::from_secs(1);

        assert_eq!(coupon.state_at(coupon.ends_at - second), CouponState::Enabled);
        assert_eq!(coupon.state_at(coupon.ends_at), CouponState::Enabled);
        assert_eq!(coupon.state_at(coupon.ends_at + second), CouponState::Expired);

        Ok(())
    }

    #[test]
    fn disabled_status_wins_over_dates() -> TestResult {
        let coupon = CouponDraft {
            status: CouponStatus::Disabled,
            minimum_cart_value: Some(Decimal::ONE),
            ..draft(CouponKind::CartValue)
        }
        .validate()?;

        assert_eq!(coupon.state_at(coupon.ends_at + SignedDuration::from_hours(1)), CouponState::Disabled);

        Ok(())
    }

    #[test]
    fn rejects_end_before_start() {
        let mut invalid = draft(CouponKind::CartValue);
        invalid.minimum_cart_value = Some(Decimal::ONE);
        invalid.ends_at = invalid.starts_at - SignedDuration::from_secs(1);

        assert_eq!(invalid.validate(), Err(CouponValidationError::EndBeforeStart));
    }

    #[test]
    fn accepts_start_equal_to_end() -> TestResult {
        let mut single_instant = draft(CouponKind::CartValue);
        single_instant.minimum_cart_value = Some(Decimal::ONE);
        single_instant.ends_at = single_instant.starts_at;

        let coupon = single_instant.validate()?;

        assert!(coupon.is_active_at(coupon.starts_at));

        Ok(())
    }

    #[test]
    fn rejects_percentage_above_one_hundred() {
        let invalid = CouponDraft {
            discount: Discount::percentage(Decimal::from(101)),
            products: vec![ProductUuid::new()],
            ..draft(CouponKind::Product)
        };

        assert_eq!(invalid.validate(), Err(CouponValidationError::PercentageOutOfRange));
    }

    #[test]
    fn rejects_zero_flat_discount() {
        let invalid = CouponDraft {
            discount: Discount::flat(Decimal::ZERO),
            products: vec![ProductUuid::new()],
            ..draft(CouponKind::Product)
        };

        assert_eq!(invalid.validate(), Err(CouponValidationError::NonPositiveDiscount));
    }

    #[test]
    fn cart_value_requires_positive_minimum() {
        let invalid = CouponDraft {
            minimum_cart_value: Some(Decimal::ZERO),
            ..draft(CouponKind::CartValue)
        };

        assert_eq!(invalid.validate(), Err(CouponValidationError::MissingMinimumCartValue));
    }

    #[test]
    fn product_requires_a_product_or_category() {
        assert_eq!(
            draft(CouponKind::Product).validate(),
            Err(CouponValidationError::MissingProductTargets)
        );
    }

    #[test]
    fn signup_requires_an_audience() {
        assert_eq!(
            draft(CouponKind::NewSignup).validate(),
            Err(CouponValidationError::MissingSignupAudience)
        );
    }

    #[test]
    fn irrelevant_associations_are_dropped() -> TestResult {
        let coupon = CouponDraft {
            minimum_cart_value: Some(Decimal::ONE_HUNDRED),
            products: vec![ProductUuid::new()],
            categories: vec![CategoryUuid::new()],
            users: vec![UserUuid::new()],
            ..draft(CouponKind::CartValue)
        }
        .validate()?;

        assert_eq!(
            coupon.target,
            CouponTarget::CartValue {
                minimum_cart_value: Decimal::ONE_HUNDRED
            }
        );

        Ok(())
    }

    #[test]
    fn apply_to_all_clears_user_list() -> TestResult {
        let coupon = CouponDraft {
            apply_to_all_new_users: true,
            users: vec![UserUuid::new()],
            ..draft(CouponKind::NewSignup)
        }
        .validate()?;

        assert_eq!(coupon.target, CouponTarget::NewSignup(SignupAudience::AllNewUsers));

        Ok(())
    }

    #[test]
    fn names_parse_case_insensitively() -> TestResult {
        assert_eq!("cart_value".parse::<CouponKind>()?, CouponKind::CartValue);
        assert_eq!("EXPIRED".parse::<CouponState>()?, CouponState::Expired);
        assert!("ARCHIVED".parse::<CouponStatus>().is_err(), "unknown status is rejected");

        Ok(())
    }
}
