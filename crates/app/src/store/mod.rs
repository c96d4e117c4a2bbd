//! Transactional storage seam
//!
//! Every service operation runs inside one [`UnitOfWork`]. Committing makes all
//! of its writes visible at once; dropping it without committing rolls them
//! back.

use async_trait::async_trait;

use crate::{
    domain::{
        carts::repository::CartsRepository,
        catalog::repository::{CatalogReader, StockCounters},
        checkout::repository::OrdersRepository,
        coupons::repository::CouponsRepository,
    },
    errors::StoreError,
};

mod postgres;

pub(crate) use postgres::contains_pattern;
pub use postgres::{PgStore, PgUnitOfWork};

#[async_trait]
pub trait Store: Send + Sync {
    /// Start a unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

#[async_trait]
pub trait UnitOfWork:
    CatalogReader + StockCounters + CartsRepository + CouponsRepository + OrdersRepository + Send
{
    /// Make every write of this unit of work visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
