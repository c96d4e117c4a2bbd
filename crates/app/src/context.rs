//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    activity::{ActivityRecorder, PgActivityRecorder},
    clock::{Clock, SystemClock},
    database::{self, Db},
    domain::{
        carts::{CartsService, DefaultCartsService},
        checkout::{CheckoutService, DefaultCheckoutService},
        coupons::{CouponsService, DefaultCouponsService},
    },
    store::{PgStore, Store},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub db: Db,
    pub carts: Arc<dyn CartsService>,
    pub coupons: Arc<dyn CouponsService>,
    pub checkout: Arc<dyn CheckoutService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_db(Db::new(pool)))
    }

    /// Wire every service over one connection pool.
    #[must_use]
    pub fn from_db(db: Db) -> Self {
        let store: Arc<dyn Store> = Arc::new(PgStore::new(db.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let activity: Arc<dyn ActivityRecorder> = Arc::new(PgActivityRecorder::new(db.clone()));

        Self {
            db,
            carts: Arc::new(DefaultCartsService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&activity),
            )),
            coupons: Arc::new(DefaultCouponsService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&activity),
            )),
            checkout: Arc::new(DefaultCheckoutService::new(store, clock, activity)),
        }
    }
}
