//! Coupon Models

use jiff::Timestamp;
use storefront::{
    coupons::{Coupon, CouponDraft, CouponKind, CouponState, CouponUuid},
    discounts::DiscountKind,
};

use crate::pagination::PageRequest;

/// A stored coupon with its presentation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRecord {
    pub uuid: CouponUuid,
    pub code: String,
    pub name: String,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub coupon: Coupon,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CouponRecord {
    #[must_use]
    pub fn state_at(&self, now: Timestamp) -> CouponState {
        self.coupon.state_at(now)
    }
}

/// New Coupon
///
/// Also used as the full replacement when editing a coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub code: String,
    pub name: String,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub draft: CouponDraft,
}

/// A coupon with its state at the time it was listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponSummary {
    pub record: CouponRecord,
    pub state: CouponState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponListQuery {
    pub kind: Option<CouponKind>,
    pub discount_kind: Option<DiscountKind>,
    pub state: Option<CouponState>,

    /// Case-insensitive match on name or code.
    pub search: Option<String>,

    pub page: PageRequest,
}

impl CouponListQuery {
    /// Trimmed search term, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}
