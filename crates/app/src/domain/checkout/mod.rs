//! Checkout

pub mod errors;
pub mod models;
pub mod repository;
pub mod service;

pub use errors::CheckoutServiceError;
pub use service::*;
