//! Quotes
//!
//! Combine priced lines, requested coupons and shipping into order totals.

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{
    coupons::{Coupon, CouponContext, Ineligibility, resolve},
    discounts::{Discount, round_money},
    pricing::PricedLine,
    uuids::UserUuid,
};

/// Errors raised while assembling a quote.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// A requested coupon no longer applies.
    #[error("coupon {code} cannot be applied: {reason}")]
    CouponNotApplicable {
        /// Code as requested.
        code: String,

        /// Why it does not apply.
        reason: Ineligibility,
    },

    /// The same code was requested twice.
    #[error("coupon {code} was requested more than once")]
    DuplicateCoupon {
        /// Code as requested the second time.
        code: String,
    },
}

/// A coupon the caller asked for, already looked up by code.
#[derive(Debug, Clone, Copy)]
pub struct RequestedCoupon<'a> {
    /// Code as the caller typed it.
    pub code: &'a str,

    /// The coupon the code resolved to.
    pub coupon: &'a Coupon,
}

/// A coupon applied to a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    /// Code as the caller typed it.
    pub code: String,

    /// The coupon's discount definition.
    pub discount: Discount,

    /// Amount this coupon took off the quote.
    pub amount: Decimal,
}

/// Money totals of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuoteTotals {
    /// Sum of line totals before tax.
    pub product_total: Decimal,

    /// Sum of line taxes.
    pub tax_total: Decimal,

    /// Sum of applied coupon amounts.
    pub discount_total: Decimal,

    /// Shipping charged on top.
    pub shipping_total: Decimal,

    /// Products and tax and shipping, less discounts.
    pub grand_total: Decimal,
}

/// Priced lines with coupons applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Lines in cart order.
    pub lines: Vec<PricedLine>,

    /// Coupons in request order.
    pub coupons: Vec<AppliedCoupon>,

    /// Money totals.
    pub totals: QuoteTotals,
}

impl Quote {
    /// Build a quote for `user` at `now`.
    ///
    /// Every coupon is resolved against the pre-discount lines, then applied in
    /// the order requested with the running discount capped at the product
    /// total.
    ///
    /// # Errors
    ///
    /// - [`QuoteError::DuplicateCoupon`] when a code is requested twice.
    /// - [`QuoteError::CouponNotApplicable`] for the first coupon that does not apply.
    pub fn build(
        lines: Vec<PricedLine>,
        requested: &[RequestedCoupon<'_>],
        user: Option<UserUuid>,
        now: Timestamp,
        shipping: Decimal,
    ) -> Result<Self, QuoteError> {
        let product_total = round_money(lines.iter().map(PricedLine::line_total).sum());
        let tax_total = round_money(lines.iter().map(PricedLine::line_tax).sum());
        let shipping_total = round_money(shipping.max(Decimal::ZERO));

        let context = CouponContext {
            user,
            now,
            lines: &lines,
        };

        let mut seen = FxHashSet::default();
        let mut coupons = Vec::with_capacity(requested.len());
        let mut remaining = product_total;

        for RequestedCoupon { code, coupon } in requested {
            if !seen.insert(code.trim().to_lowercase()) {
                return Err(QuoteError::DuplicateCoupon {
                    code: (*code).to_string(),
                });
            }

            let not_applicable = |reason| QuoteError::CouponNotApplicable {
                code: (*code).to_string(),
                reason,
            };

            let amount = resolve(coupon, &context)
                .into_result()
                .map_err(not_applicable)?
                .min(remaining);

            if amount <= Decimal::ZERO {
                return Err(not_applicable(Ineligibility::ZeroDiscount));
            }

            remaining -= amount;

            coupons.push(AppliedCoupon {
                code: (*code).to_string(),
                discount: coupon.discount,
                amount,
            });
        }

        let discount_total = product_total - remaining;
        let grand_total =
            (product_total + tax_total + shipping_total - discount_total).max(Decimal::ZERO);

        Ok(Self {
            lines,
            coupons,
            totals: QuoteTotals {
                product_total,
                tax_total,
                discount_total,
                shipping_total,
                grand_total: round_money(grand_total),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use testresult::TestResult;

    use crate::{
        catalog::{ProductSnapshot, ProductUuid, TaxRateKind},
        coupons::{CouponStatus, CouponTarget, SignupAudience},
        pricing::price_line,
    };

    use super::*;

    fn everyone(discount: Discount) -> Coupon {
        Coupon {
            target: CouponTarget::NewSignup(SignupAudience::AllNewUsers),
            discount,
            status: CouponStatus::Enabled,
            starts_at: Timestamp::UNIX_EPOCH,
            ends_at: Timestamp::UNIX_EPOCH + SignedDuration::from_hours(48),
        }
    }

    fn lines() -> Vec<PricedLine> {
        let product = ProductSnapshot::new(ProductUuid::new(), "Lamp", Decimal::new(2000, 2))
            .with_tax_rate(TaxRateKind::Percentage, Decimal::TEN);

        vec![price_line(&product, None, 2, Timestamp::UNIX_EPOCH)]
    }

    #[test]
    fn totals_without_coupons() -> TestResult {
        let quote = Quote::build(lines(), &[], None, Timestamp::UNIX_EPOCH, Decimal::new(499, 2))?;

        assert_eq!(quote.totals.product_total, Decimal::new(4000, 2));
        assert_eq!(quote.totals.tax_total, Decimal::new(400, 2));
        assert_eq!(quote.totals.shipping_total, Decimal::new(499, 2));
        assert_eq!(quote.totals.grand_total, Decimal::new(4899, 2));

        Ok(())
    }

    #[test]
    fn stacked_coupons_never_exceed_product_total() -> TestResult {
        let big = everyone(Discount::flat(Decimal::from(30)));
        let bigger = everyone(Discount::flat(Decimal::from(30)));

        let quote = Quote::build(
            lines(),
            &[
                RequestedCoupon {
                    code: "THIRTY",
                    coupon: &big,
                },
                RequestedCoupon {
                    code: "ALSO-THIRTY",
                    coupon: &bigger,
                },
            ],
            None,
            Timestamp::UNIX_EPOCH,
            Decimal::ZERO,
        )?;

        assert_eq!(quote.totals.discount_total, Decimal::new(4000, 2));
        assert_eq!(
            quote.coupons.iter().map(|c| c.amount).collect::<Vec<_>>(),
            vec![Decimal::from(30), Decimal::from(10)]
        );
        assert_eq!(quote.totals.grand_total, Decimal::new(400, 2));

        Ok(())
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let coupon = everyone(Discount::flat(Decimal::ONE));
        let requested = [
            RequestedCoupon {
                code: "WELCOME",
                coupon: &coupon,
            },
            RequestedCoupon {
                code: "welcome",
                coupon: &coupon,
            },
        ];

        let result = Quote::build(lines(), &requested, None, Timestamp::UNIX_EPOCH, Decimal::ZERO);

        assert!(
            matches!(result, Err(QuoteError::DuplicateCoupon { .. })),
            "expected DuplicateCoupon, got {result:?}"
        );
    }

    #[test]
    fn inapplicable_coupon_fails_with_reason() {
        let coupon = Coupon {
            status: CouponStatus::Disabled,
            ..everyone(Discount::flat(Decimal::ONE))
        };

        let result = Quote::build(
            lines(),
            &[RequestedCoupon {
                code: "OLD",
                coupon: &coupon,
            }],
            None,
            Timestamp::UNIX_EPOCH,
            Decimal::ZERO,
        );

        assert_eq!(
            result,
            Err(QuoteError::CouponNotApplicable {
                code: "OLD".to_string(),
                reason: Ineligibility::Disabled,
            })
        );
    }
}
