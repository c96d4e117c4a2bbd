//! Test contexts for service-level tests.
//!
//! [`TestContext`] runs the services over the in-memory store. [`PgTestContext`]
//! runs the same services over Postgres for the behaviour that depends on real
//! locks, constraints and SQL.

use std::sync::Arc;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::query;
use storefront::{
    catalog::{ProductSnapshot, ProductUuid},
    uuids::UserUuid,
};

use crate::{
    activity::{ActivityRecorder, TracingActivityRecorder},
    clock::{Clock, MockClock},
    domain::{
        carts::{CartsService, DefaultCartsService},
        checkout::{CheckoutService, DefaultCheckoutService},
        coupons::{CouponsService, DefaultCouponsService},
    },
    store::{PgStore, Store},
};

use super::{MemoryStore, db::TestDb};

/// Instant every test clock reports.
const TEST_NOW: Timestamp = Timestamp::constant(1_760_000_000, 0);

fn fixed_clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_now().return_const(TEST_NOW);

    Arc::new(clock)
}

struct Services {
    carts: Arc<dyn CartsService>,
    coupons: Arc<dyn CouponsService>,
    checkout: Arc<dyn CheckoutService>,
}

impl Services {
    fn over(store: Arc<dyn Store>, activity: Arc<dyn ActivityRecorder>) -> Self {
        let clock = fixed_clock();

        Self {
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

pub(crate) struct TestContext {
    pub now: Timestamp,
    pub store: MemoryStore,
    pub carts: Arc<dyn CartsService>,
    pub coupons: Arc<dyn CouponsService>,
    pub checkout: Arc<dyn CheckoutService>,
}

impl TestContext {
    /// Services over an empty store with a fixed clock, logging activities.
    pub fn new() -> Self {
        Self::with_activity(Arc::new(TracingActivityRecorder))
    }

    pub fn with_activity(activity: Arc<dyn ActivityRecorder>) -> Self {
        let store = MemoryStore::default();
        let services = Services::over(Arc::new(store.clone()), activity);

        Self {
            now: TEST_NOW,
            store,
            carts: services.carts,
            coupons: services.coupons,
            checkout: services.checkout,
        }
    }

    pub async fn seed_user(&self, email: &str) -> UserUuid {
        let user = UserUuid::new();

        self.store.insert_user(user, email).await;

        user
    }

    /// Insert or replace `product`; returns its uuid.
    pub async fn seed_product(&self, product: ProductSnapshot) -> ProductUuid {
        let uuid = product.uuid;

        self.store.upsert_product(product).await;

        uuid
    }

    pub async fn stock_of(&self, product: ProductUuid) -> Option<i64> {
        self.store.stock_of(product).await
    }
}

pub(crate) struct PgTestContext {
    pub now: Timestamp,
    pub db: TestDb,
    pub carts: Arc<dyn CartsService>,
    pub coupons: Arc<dyn CouponsService>,
    pub checkout: Arc<dyn CheckoutService>,
}

impl PgTestContext {
    /// Services over a fresh database with a fixed clock, logging activities.
    pub async fn new() -> Self {
        let db = TestDb::new().await;
        let store = PgStore::new(db.db.clone());
        let services = Services::over(Arc::new(store), Arc::new(TracingActivityRecorder));

        Self {
            now: TEST_NOW,
            db,
            carts: services.carts,
            coupons: services.coupons,
            checkout: services.checkout,
        }
    }

    pub async fn seed_user(&self, email: &str) -> UserUuid {
        let user = UserUuid::new();

        query("INSERT INTO users (uuid, email) VALUES ($1, $2)")
            .bind(user.into_uuid())
            .bind(email)
            .execute(self.db.pool())
            .await
            .expect("Failed to seed user");

        user
    }

    /// Insert `product` with its categories, tax rates and variants.
    pub async fn seed_product(&self, product: ProductSnapshot) -> ProductUuid {
        let pool = self.db.pool();
        let discount = product.discount.as_ref();

        query(
            "INSERT INTO products (uuid, name, unit_price, discount_type, discount_value, \
             discount_min_quantity, discount_max_quantity, discount_starts_at, discount_ends_at, \
             stock_quantity, min_purchase_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(product.uuid.into_uuid())
        .bind(product.name.as_str())
        .bind(product.unit_price)
        .bind(discount.map(|d| d.discount.kind.as_str()))
        .bind(discount.map(|d| d.discount.value))
        .bind(discount.and_then(|d| d.min_quantity).and_then(|q| i32::try_from(q).ok()))
        .bind(discount.and_then(|d| d.max_quantity).and_then(|q| i32::try_from(q).ok()))
        .bind(discount.and_then(|d| d.window.starts_at).map(SqlxTimestamp::from))
        .bind(discount.and_then(|d| d.window.ends_at).map(SqlxTimestamp::from))
        .bind(product.stock_quantity)
        .bind(product.min_purchase_quantity.and_then(|q| i32::try_from(q).ok()))
        .execute(pool)
        .await
        .expect("Failed to seed product");

        for category in &product.categories {
            query("INSERT INTO categories (uuid, name) VALUES ($1, 'Category') ON CONFLICT DO NOTHING")
                .bind(category.into_uuid())
                .execute(pool)
                .await
                .expect("Failed to seed category");

            query("INSERT INTO product_categories (product_uuid, category_uuid) VALUES ($1, $2)")
                .bind(product.uuid.into_uuid())
                .bind(category.into_uuid())
                .execute(pool)
                .await
                .expect("Failed to link category");
        }

        for rate in &product.tax_rates {
            query("INSERT INTO tax_rates (uuid, name, rate_type, rate_value) VALUES ($1, $2, $3, $4)")
                .bind(rate.uuid.into_uuid())
                .bind(rate.name.as_str())
                .bind(rate.kind.as_str())
                .bind(rate.value)
                .execute(pool)
                .await
                .expect("Failed to seed tax rate");

            query("INSERT INTO product_tax_rates (product_uuid, tax_rate_uuid) VALUES ($1, $2)")
                .bind(product.uuid.into_uuid())
                .bind(rate.uuid.into_uuid())
                .execute(pool)
                .await
                .expect("Failed to link tax rate");
        }

        for variant in &product.variants {
            query(
                "INSERT INTO product_variants (uuid, product_uuid, key, price_adjustment, stock_quantity) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(variant.uuid.into_uuid())
            .bind(product.uuid.into_uuid())
            .bind(variant.key.as_str())
            .bind(variant.price_adjustment)
            .bind(variant.stock_quantity)
            .execute(pool)
            .await
            .expect("Failed to seed variant");
        }

        product.uuid
    }

    pub async fn stock_of(&self, product: ProductUuid) -> Option<i64> {
        sqlx::query_scalar("SELECT stock_quantity FROM products WHERE uuid = $1")
            .bind(product.into_uuid())
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to read stock")
    }
}
