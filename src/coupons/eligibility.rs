//! Coupon Eligibility
//!
//! Decides whether a coupon applies to a priced cart and how much it takes off.

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    coupons::definition::{Coupon, CouponStatus, CouponTarget, SignupAudience},
    discounts::round_money,
    pricing::PricedLine,
    uuids::UserUuid,
};

/// Everything a coupon is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct CouponContext<'a> {
    /// The user placing the order, if known.
    pub user: Option<UserUuid>,

    /// Instant captured once for the whole operation.
    pub now: Timestamp,

    /// Cart lines priced at `now`, before any coupon.
    pub lines: &'a [PricedLine],
}

impl CouponContext<'_> {
    /// Pre-discount subtotal of every line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal(self.lines.iter())
    }
}

fn subtotal<'a>(lines: impl Iterator<Item = &'a PricedLine>) -> Decimal {
    round_money(lines.map(PricedLine::line_total).sum())
}

/// Why a coupon does not apply.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    /// Status is DISABLED.
    #[error("Coupon is not currently active")]
    Disabled,

    /// Past the end of the validity window.
    #[error("Coupon is not currently active")]
    Expired,

    /// Before the start of the validity window.
    #[error("Coupon is not currently active")]
    NotStarted,

    /// The caller is not in a NEW_SIGNUP coupon's audience.
    #[error("You are not eligible for this coupon")]
    NotTargeted,

    /// Pre-discount subtotal below a CART_VALUE coupon's minimum.
    #[error("Cart value does not meet the coupon minimum")]
    BelowMinimumCartValue {
        /// Subtotal the cart has to reach.
        minimum: Decimal,
    },

    /// No line matches a PRODUCT coupon's products or categories.
    #[error("Coupon does not apply to any item in the cart")]
    NoEligibleLines,

    /// The coupon would take nothing off.
    #[error("Coupon cannot be applied to this order")]
    ZeroDiscount,
}

/// Outcome of resolving one coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// The coupon applies.
    Applicable {
        /// Portion of the cart the coupon discounts.
        eligible_subtotal: Decimal,

        /// Amount taken off, within `[0, eligible_subtotal]`.
        discount_amount: Decimal,
    },

    /// The coupon does not apply.
    NotApplicable(Ineligibility),
}

impl Eligibility {
    /// Whether the coupon applies.
    #[must_use]
    pub const fn applicable(&self) -> bool {
        matches!(self, Self::Applicable { .. })
    }

    /// Discount contribution; zero when not applicable.
    #[must_use]
    pub const fn discount_amount(&self) -> Decimal {
        match self {
            Self::Applicable {
                discount_amount, ..
            } => *discount_amount,
            Self::NotApplicable(_) => Decimal::ZERO,
        }
    }

    /// Convert into a result carrying the reason on failure.
    ///
    /// # Errors
    ///
    /// Returns the [`Ineligibility`] when the coupon does not apply.
    pub const fn into_result(self) -> Result<Decimal, Ineligibility> {
        match self {
            Self::Applicable {
                discount_amount, ..
            } => Ok(discount_amount),
            Self::NotApplicable(reason) => Err(reason),
        }
    }
}

/// Resolve `coupon` against `context`.
#[must_use]
pub fn resolve(coupon: &Coupon, context: &CouponContext<'_>) -> Eligibility {
    match eligible_subtotal(coupon, context) {
        Ok(eligible_subtotal) => {
            let discount_amount = coupon.discount.capped_amount_off(eligible_subtotal);

            if discount_amount <= Decimal::ZERO {
                return Eligibility::NotApplicable(Ineligibility::ZeroDiscount);
            }

            Eligibility::Applicable {
                eligible_subtotal,
                discount_amount,
            }
        }
        Err(reason) => Eligibility::NotApplicable(reason),
    }
}

fn eligible_subtotal(coupon: &Coupon, context: &CouponContext<'_>) -> Result<Decimal, Ineligibility> {
    if coupon.status == CouponStatus::Disabled {
        return Err(Ineligibility::Disabled);
    }

    if context.now > coupon.ends_at {
        return Err(Ineligibility::Expired);
    }

    if context.now < coupon.starts_at {
        return Err(Ineligibility::NotStarted);
    }

    match &coupon.target {
        CouponTarget::Products {
            products,
            categories,
        } => {
            let mut matched = context
                .lines
                .iter()
                .filter(|line| {
                    products.contains(&line.product) || !line.categories.is_disjoint(categories)
                })
                .peekable();

            if matched.peek().is_none() {
                return Err(Ineligibility::NoEligibleLines);
            }

            Ok(subtotal(matched))
        }
        CouponTarget::CartValue { minimum_cart_value } => {
            let subtotal = context.subtotal();

            if subtotal < *minimum_cart_value {
                return Err(Ineligibility::BelowMinimumCartValue {
                    minimum: *minimum_cart_value,
                });
            }

            Ok(subtotal)
        }
        CouponTarget::NewSignup(SignupAudience::AllNewUsers) => Ok(context.subtotal()),
        CouponTarget::NewSignup(SignupAudience::Users(users)) => {
            if context.user.is_some_and(|user| users.contains(&user)) {
                Ok(context.subtotal())
            } else {
                Err(Ineligibility::NotTargeted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use rustc_hash::FxHashSet;

    use crate::{
        catalog::ProductUuid,
        discounts::Discount,
        uuids::CategoryUuid,
    };

    use super::*;

    fn now() -> Timestamp {
        Timestamp::UNIX_EPOCH + SignedDuration::from_hours(1_000)
    }

    fn coupon(target: CouponTarget, discount: Discount) -> Coupon {
        Coupon {
            target,
            discount,
            status: CouponStatus::Enabled,
            starts_at: now() - SignedDuration::from_hours(1),
            ends_at: now() + SignedDuration::from_hours(1),
        }
    }

    fn line(unit_price: Decimal, quantity: u32) -> PricedLine {
        PricedLine {
            product: ProductUuid::new(),
            variant: None,
            categories: FxHashSet::default(),
            quantity,
            unit_price,
            tax_inclusive_unit_price: unit_price,
        }
    }

    fn context(lines: &[PricedLine]) -> CouponContext<'_> {
        CouponContext {
            user: Some(UserUuid::new()),
            now: now(),
            lines,
        }
    }

    #[test]
    fn product_coupon_only_discounts_matched_lines() {
        let matched = line(Decimal::new(4000, 2), 1);
        let product = matched.product;
        let lines = [matched, line(Decimal::new(6000, 2), 1)];

        let coupon = coupon(
            CouponTarget::Products {
                products: [product].into_iter().collect(),
                categories: FxHashSet::default(),
            },
            Discount::percentage(Decimal::from(50)),
        );

        let result = resolve(&coupon, &context(&lines));

        assert_eq!(
            result,
            Eligibility::Applicable {
                eligible_subtotal: Decimal::new(4000, 2),
                discount_amount: Decimal::new(2000, 2),
            }
        );
    }

    #[test]
    fn product_coupon_matches_by_category() {
        let category = CategoryUuid::new();
        let mut shirt = line(Decimal::new(2500, 2), 2);
        shirt.categories.insert(category);
        let lines = [shirt, line(Decimal::new(1000, 2), 1)];

        let coupon = coupon(
            CouponTarget::Products {
                products: FxHashSet::default(),
                categories: [category].into_iter().collect(),
            },
            Discount::flat(Decimal::new(500, 2)),
        );

        let result = resolve(&coupon, &context(&lines));

        assert_eq!(result.discount_amount(), Decimal::new(500, 2));
    }

    #[test]
    fn product_coupon_without_matches_is_not_applicable() {
        let lines = [line(Decimal::TEN, 1)];
        let coupon = coupon(
            CouponTarget::Products {
                products: [ProductUuid::new()].into_iter().collect(),
                categories: FxHashSet::default(),
            },
            Discount::flat(Decimal::ONE),
        );

        assert_eq!(
            resolve(&coupon, &context(&lines)),
            Eligibility::NotApplicable(Ineligibility::NoEligibleLines)
        );
    }

    #[test]
    fn flat_discount_is_capped_at_eligible_subtotal() {
        let lines = [line(Decimal::new(1500, 2), 1)];
        let coupon = coupon(
            CouponTarget::NewSignup(SignupAudience::AllNewUsers),
            Discount::flat(Decimal::new(2500, 2)),
        );

        assert_eq!(resolve(&coupon, &context(&lines)).discount_amount(), Decimal::new(1500, 2));
    }

    #[test]
    fn signup_coupon_requires_listed_user() {
        let lines = [line(Decimal::TEN, 1)];
        let listed = UserUuid::new();
        let coupon = coupon(
            CouponTarget::NewSignup(SignupAudience::Users([listed].into_iter().collect())),
            Discount::flat(Decimal::ONE),
        );

        let stranger = resolve(&coupon, &context(&lines));
        let member = resolve(
            &coupon,
            &CouponContext {
                user: Some(listed),
                ..context(&lines)
            },
        );

        assert_eq!(stranger, Eligibility::NotApplicable(Ineligibility::NotTargeted));
        assert!(member.applicable(), "listed user should be eligible");
    }

    #[test]
    fn disabled_and_out_of_window_coupons_do_not_apply() {
        let lines = [line(Decimal::TEN, 1)];
        let base = coupon(
            CouponTarget::NewSignup(SignupAudience::AllNewUsers),
            Discount::flat(Decimal::ONE),
        );

        let disabled = Coupon {
            status: CouponStatus::Disabled,
            ..base.clone()
        };
        let expired = Coupon {
            ends_at: now() - SignedDuration::from_secs(1),
            ..base.clone()
        };
        let upcoming = Coupon {
            starts_at: now() + SignedDuration::from_secs(1),
            ..base
        };

        let ctx = context(&lines);

        assert_eq!(resolve(&disabled, &ctx), Eligibility::NotApplicable(Ineligibility::Disabled));
        assert_eq!(resolve(&expired, &ctx), Eligibility::NotApplicable(Ineligibility::Expired));
        assert_eq!(resolve(&upcoming, &ctx), Eligibility::NotApplicable(Ineligibility::NotStarted));
    }

    #[test]
    fn free_items_give_zero_discount() {
        let lines = [line(Decimal::ZERO, 3)];
        let coupon = coupon(
            CouponTarget::NewSignup(SignupAudience::AllNewUsers),
            Discount::percentage(Decimal::TEN),
        );

        assert_eq!(
            resolve(&coupon, &context(&lines)),
            Eligibility::NotApplicable(Ineligibility::ZeroDiscount)
        );
    }
}
