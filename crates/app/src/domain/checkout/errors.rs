//! Checkout service errors.

use storefront::{catalog::VariantNotFound, quote::QuoteError, stock::QuantityError};
use thiserror::Error;

use crate::{
    auth::AuthError,
    errors::{ErrorKind, StoreError},
};

#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("Add items to your cart before placing an order")]
    EmptyCart,

    #[error("Product not found")]
    ProductNotFound,

    #[error(transparent)]
    VariantNotFound(#[from] VariantNotFound),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error("Coupon code is invalid")]
    CouponNotFound { code: String },

    #[error(transparent)]
    Coupon(#[from] QuoteError),

    #[error("stock changed while placing the order")]
    StockConflict,

    #[error("Order not found")]
    OrderNotFound,

    #[error("storage error")]
    Store(#[from] StoreError),
}

impl CheckoutServiceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::EmptyCart
            | Self::VariantNotFound(_)
            | Self::Coupon(_)
            | Self::Quantity(QuantityError::BelowOne) => ErrorKind::InvalidRequest,
            Self::Quantity(_) => ErrorKind::OutOfRange,
            Self::ProductNotFound | Self::CouponNotFound { .. } | Self::OrderNotFound => {
                ErrorKind::NotFound
            }
            Self::StockConflict => ErrorKind::Conflict,
            Self::Store(error) => error.kind(),
        }
    }

    /// Whether re-running the whole transaction may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_transient())
    }
}
