//! Coupons
//!
//! Coupon definitions, their derived state, eligibility resolution and the
//! association set diffing used when a coupon is edited.

pub mod associations;
pub mod definition;
pub mod eligibility;

pub use associations::{AssociationChanges, AssociationDiff, AssociationSet};
pub use definition::{
    Coupon, CouponDraft, CouponKind, CouponState, CouponStatus, CouponTarget, CouponUuid,
    CouponValidationError, SignupAudience, UnknownCouponName,
};
pub use eligibility::{CouponContext, Eligibility, Ineligibility, resolve};
