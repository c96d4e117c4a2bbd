//! Coupons service errors.

use storefront::coupons::CouponValidationError;
use thiserror::Error;

use crate::{
    auth::AuthError,
    errors::{ErrorKind, StoreError},
};

#[derive(Debug, Error)]
pub enum CouponsServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("Coupon name is required")]
    MissingName,

    #[error("Coupon code is required")]
    MissingCode,

    #[error(transparent)]
    Invalid(#[from] CouponValidationError),

    #[error("One or more products were not found")]
    UnknownProducts,

    #[error("One or more categories were not found")]
    UnknownCategories,

    #[error("One or more users were not found")]
    UnknownUsers,

    #[error("Coupon code already exists")]
    DuplicateCode,

    #[error("Coupon not found")]
    NotFound,

    #[error("storage error")]
    Store(#[from] StoreError),
}

impl CouponsServiceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::MissingName
            | Self::MissingCode
            | Self::Invalid(_)
            | Self::UnknownProducts
            | Self::UnknownCategories
            | Self::UnknownUsers => ErrorKind::InvalidRequest,
            Self::DuplicateCode => ErrorKind::Conflict,
            Self::NotFound => ErrorKind::NotFound,
            Self::Store(error) => error.kind(),
        }
    }
}
