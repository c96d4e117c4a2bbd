//! Coupon resolution scenarios exercised through the public API.

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use testresult::TestResult;

use storefront::prelude::*;

fn now() -> Timestamp {
    Timestamp::UNIX_EPOCH + SignedDuration::from_hours(24 * 365)
}

fn cart_value_coupon(minimum: Decimal) -> Result<Coupon, CouponValidationError> {
    CouponDraft {
        kind: CouponKind::CartValue,
        discount: Discount::percentage(Decimal::TEN),
        status: CouponStatus::Enabled,
        starts_at: now() - SignedDuration::from_hours(1),
        ends_at: now() + SignedDuration::from_hours(1),
        minimum_cart_value: Some(minimum),
        apply_to_all_new_users: false,
        products: Vec::new(),
        categories: Vec::new(),
        users: Vec::new(),
    }
    .validate()
}

fn cart_at(subtotal: Decimal) -> Vec<PricedLine> {
    let product = ProductSnapshot::new(ProductUuid::new(), "Blender", subtotal);

    vec![price_line(&product, None, 1, now())]
}

#[test]
fn cart_value_minimum_is_inclusive() -> TestResult {
    let coupon = cart_value_coupon(Decimal::new(10000, 2))?;

    let short = cart_at(Decimal::new(9999, 2));
    let exact = cart_at(Decimal::new(10000, 2));

    let short_result = resolve(
        &coupon,
        &CouponContext {
            user: None,
            now: now(),
            lines: &short,
        },
    );
    let exact_result = resolve(
        &coupon,
        &CouponContext {
            user: None,
            now: now(),
            lines: &exact,
        },
    );

    assert!(!short_result.applicable(), "99.99 is below the minimum");
    assert!(exact_result.applicable(), "100.00 meets the minimum");
    assert_eq!(exact_result.discount_amount(), Decimal::new(1000, 2));

    Ok(())
}

#[test]
fn derived_state_flips_one_second_after_end() -> TestResult {
    let coupon = cart_value_coupon(Decimal::ONE)?;
    let second = SignedDuration::from_secs(1);

    assert_eq!(coupon.state_at(coupon.ends_at + second), CouponState::Expired);
    assert_eq!(coupon.state_at(coupon.ends_at - second), CouponState::Enabled);

    Ok(())
}

#[test]
fn quote_applies_cart_value_coupon() -> TestResult {
    let coupon = cart_value_coupon(Decimal::from(50))?;
    let lines = cart_at(Decimal::new(8000, 2));

    let quote = Quote::build(
        lines,
        &[RequestedCoupon {
            code: "SAVE10",
            coupon: &coupon,
        }],
        Some(UserUuid::new()),
        now(),
        Decimal::new(500, 2),
    )?;

    assert_eq!(quote.totals.discount_total, Decimal::new(800, 2));
    assert_eq!(quote.totals.grand_total, Decimal::new(7700, 2), "80 - 8 + 5");

    Ok(())
}

#[test]
fn quote_rejects_coupon_under_minimum() -> TestResult {
    let coupon = cart_value_coupon(Decimal::new(10000, 2))?;

    let result = Quote::build(
        cart_at(Decimal::new(9999, 2)),
        &[RequestedCoupon {
            code: "BIGSPENDER",
            coupon: &coupon,
        }],
        None,
        now(),
        Decimal::ZERO,
    );

    assert_eq!(
        result,
        Err(QuoteError::CouponNotApplicable {
            code: "BIGSPENDER".to_string(),
            reason: Ineligibility::BelowMinimumCartValue {
                minimum: Decimal::new(10000, 2)
            },
        })
    );

    Ok(())
}
