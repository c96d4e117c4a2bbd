//! Carts service errors.

use storefront::{catalog::VariantNotFound, stock::QuantityError};
use thiserror::Error;

use crate::{
    auth::AuthError,
    domain::carts::models::UnknownCartSort,
    errors::{ErrorKind, StoreError},
};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("Product not found")]
    ProductNotFound,

    #[error(transparent)]
    VariantNotFound(#[from] VariantNotFound),

    #[error("Cart not found for user")]
    CartNotFound,

    #[error("Cart already exists for user")]
    CartAlreadyExists,

    #[error("Cart item not found")]
    ItemNotFound,

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error(transparent)]
    InvalidSort(#[from] UnknownCartSort),

    #[error("storage error")]
    Store(#[from] StoreError),
}

impl CartsServiceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::ProductNotFound | Self::CartNotFound | Self::ItemNotFound => ErrorKind::NotFound,
            Self::VariantNotFound(_)
            | Self::InvalidSort(_)
            | Self::Quantity(QuantityError::BelowOne) => ErrorKind::InvalidRequest,
            Self::Quantity(_) => ErrorKind::OutOfRange,
            Self::CartAlreadyExists => ErrorKind::Conflict,
            Self::Store(error) => error.kind(),
        }
    }
}
