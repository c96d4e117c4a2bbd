//! Catalog Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};
use storefront::{
    catalog::{
        ProductDiscount, ProductSnapshot, ProductUuid, TaxRate, TaxRateUuid, VariantSnapshot,
        VariantUuid,
    },
    discounts::{Discount, ValidityWindow},
    stock::{StockCheckMode, StockTarget},
    uuids::{CategoryUuid, UserUuid},
};
use uuid::Uuid;

use crate::{errors::StoreError, store::PgUnitOfWork};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_PRODUCT_FOR_UPDATE_SQL: &str = include_str!("sql/get_product_for_update.sql");
const GET_PRODUCT_VARIANTS_SQL: &str = include_str!("sql/get_product_variants.sql");
const GET_PRODUCT_VARIANTS_FOR_UPDATE_SQL: &str =
    include_str!("sql/get_product_variants_for_update.sql");
const GET_PRODUCT_CATEGORIES_SQL: &str = include_str!("sql/get_product_categories.sql");
const GET_PRODUCT_TAX_RATES_SQL: &str = include_str!("sql/get_product_tax_rates.sql");
const EXISTING_PRODUCTS_SQL: &str = include_str!("sql/existing_products.sql");
const EXISTING_CATEGORIES_SQL: &str = include_str!("sql/existing_categories.sql");
const EXISTING_USERS_SQL: &str = include_str!("sql/existing_users.sql");
const DECREMENT_PRODUCT_STOCK_SQL: &str = include_str!("sql/decrement_product_stock.sql");
const DECREMENT_VARIANT_STOCK_SQL: &str = include_str!("sql/decrement_variant_stock.sql");

#[async_trait]
pub trait CatalogReader: Send {
    /// Full snapshot of a product, its variants, categories and tax rates.
    ///
    /// [`StockCheckMode::Authoritative`] locks the product and variant rows
    /// until the unit of work ends.
    async fn product(
        &mut self,
        uuid: ProductUuid,
        mode: StockCheckMode,
    ) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Which of `uuids` exist.
    async fn existing_products(
        &mut self,
        uuids: &[ProductUuid],
    ) -> Result<FxHashSet<ProductUuid>, StoreError>;

    /// Which of `uuids` exist.
    async fn existing_categories(
        &mut self,
        uuids: &[CategoryUuid],
    ) -> Result<FxHashSet<CategoryUuid>, StoreError>;

    /// Which of `uuids` exist.
    async fn existing_users(&mut self, uuids: &[UserUuid])
    -> Result<FxHashSet<UserUuid>, StoreError>;
}

#[async_trait]
pub trait StockCounters: Send {
    /// Take `quantity` units from `target` if at least that many remain.
    ///
    /// Returns `false`, changing nothing, when the counter is too low.
    async fn decrement_stock(
        &mut self,
        target: StockTarget,
        quantity: u64,
    ) -> Result<bool, StoreError>;
}

struct ProductRow {
    uuid: ProductUuid,
    name: String,
    unit_price: Option<Decimal>,
    discount: Option<ProductDiscount>,
    stock_quantity: Option<i64>,
    min_purchase_quantity: Option<u32>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let discount_type: Option<String> = row.try_get("discount_type")?;
        let discount_value: Option<Decimal> = row.try_get("discount_value")?;

        let discount = match (discount_type, discount_value) {
            (Some(kind), Some(value)) => Some(ProductDiscount {
                discount: Discount {
                    kind: kind.parse().map_err(|e| decode_error("discount_type", e))?,
                    value,
                },
                min_quantity: try_get_optional_quantity(row, "discount_min_quantity")?,
                max_quantity: try_get_optional_quantity(row, "discount_max_quantity")?,
                window: ValidityWindow {
                    starts_at: row
                        .try_get::<Option<SqlxTimestamp>, _>("discount_starts_at")?
                        .map(SqlxTimestamp::to_jiff),
                    ends_at: row
                        .try_get::<Option<SqlxTimestamp>, _>("discount_ends_at")?
                        .map(SqlxTimestamp::to_jiff),
                },
            }),
            _ => None,
        };

        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            unit_price: row.try_get("unit_price")?,
            discount,
            stock_quantity: row.try_get("stock_quantity")?,
            min_purchase_quantity: try_get_optional_quantity(row, "min_purchase_quantity")?,
        })
    }
}

struct VariantRow(VariantSnapshot);

impl<'r> FromRow<'r, PgRow> for VariantRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(VariantSnapshot {
            uuid: VariantUuid::from_uuid(row.try_get("uuid")?),
            product: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            key: row.try_get("key")?,
            price_adjustment: row.try_get("price_adjustment")?,
            stock_quantity: row.try_get("stock_quantity")?,
        }))
    }
}

struct TaxRateRow(TaxRate);

impl<'r> FromRow<'r, PgRow> for TaxRateRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let rate_type: String = row.try_get("rate_type")?;

        Ok(Self(TaxRate {
            uuid: TaxRateUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            kind: rate_type.parse().map_err(|e| decode_error("rate_type", e))?,
            value: row.try_get("rate_value")?,
        }))
    }
}

#[async_trait]
impl CatalogReader for PgUnitOfWork {
    async fn product(
        &mut self,
        uuid: ProductUuid,
        mode: StockCheckMode,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let (product_sql, variants_sql) = match mode {
            StockCheckMode::Advisory => (GET_PRODUCT_SQL, GET_PRODUCT_VARIANTS_SQL),
            StockCheckMode::Authoritative => (
                GET_PRODUCT_FOR_UPDATE_SQL,
                GET_PRODUCT_VARIANTS_FOR_UPDATE_SQL,
            ),
        };

        let Some(product) = query_as::<Postgres, ProductRow>(product_sql)
            .bind(uuid.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
        else {
            return Ok(None);
        };

        let variants = query_as::<Postgres, VariantRow>(variants_sql)
            .bind(uuid.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        let categories: Vec<Uuid> = query_scalar(GET_PRODUCT_CATEGORIES_SQL)
            .bind(uuid.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        let tax_rates = query_as::<Postgres, TaxRateRow>(GET_PRODUCT_TAX_RATES_SQL)
            .bind(uuid.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(Some(ProductSnapshot {
            uuid: product.uuid,
            name: product.name,
            unit_price: product.unit_price,
            discount: product.discount,
            stock_quantity: product.stock_quantity,
            min_purchase_quantity: product.min_purchase_quantity,
            categories: categories.into_iter().map(CategoryUuid::from_uuid).collect(),
            tax_rates: tax_rates.into_iter().map(|row| row.0).collect(),
            variants: variants.into_iter().map(|row| row.0).collect(),
        }))
    }

    async fn existing_products(
        &mut self,
        uuids: &[ProductUuid],
    ) -> Result<FxHashSet<ProductUuid>, StoreError> {
        let found =
            existing(self, EXISTING_PRODUCTS_SQL, uuids.iter().map(|u| u.into_uuid())).await?;

        Ok(found.into_iter().map(ProductUuid::from_uuid).collect())
    }

    async fn existing_categories(
        &mut self,
        uuids: &[CategoryUuid],
    ) -> Result<FxHashSet<CategoryUuid>, StoreError> {
        let found =
            existing(self, EXISTING_CATEGORIES_SQL, uuids.iter().map(|u| u.into_uuid())).await?;

        Ok(found.into_iter().map(CategoryUuid::from_uuid).collect())
    }

    async fn existing_users(
        &mut self,
        uuids: &[UserUuid],
    ) -> Result<FxHashSet<UserUuid>, StoreError> {
        let found =
            existing(self, EXISTING_USERS_SQL, uuids.iter().map(|u| u.into_uuid())).await?;

        Ok(found.into_iter().map(UserUuid::from_uuid).collect())
    }
}

async fn existing(
    uow: &mut PgUnitOfWork,
    sql: &'static str,
    uuids: impl Iterator<Item = Uuid>,
) -> Result<Vec<Uuid>, StoreError> {
    let uuids: Vec<Uuid> = uuids.collect();

    if uuids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(query_scalar(sql).bind(uuids).fetch_all(&mut *uow.tx).await?)
}

#[async_trait]
impl StockCounters for PgUnitOfWork {
    async fn decrement_stock(
        &mut self,
        target: StockTarget,
        quantity: u64,
    ) -> Result<bool, StoreError> {
        let (sql, uuid) = match target {
            StockTarget::Product(product) => (DECREMENT_PRODUCT_STOCK_SQL, product.into_uuid()),
            StockTarget::Variant(variant) => (DECREMENT_VARIANT_STOCK_SQL, variant.into_uuid()),
        };

        let quantity = i64::try_from(quantity).map_err(|_| StoreError::InvalidData)?;

        let rows_affected = query(sql)
            .bind(uuid)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected == 1)
    }
}

pub(crate) fn try_get_optional_quantity(row: &PgRow, col: &str) -> Result<Option<u32>, sqlx::Error> {
    row.try_get::<Option<i32>, _>(col)?
        .map(|quantity| u32::try_from(quantity).map_err(|e| decode_error(col, e)))
        .transpose()
}

/// `quantity` as the INTEGER column type, refused rather than clamped.
pub(crate) fn quantity_param(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::InvalidData)
}

pub(crate) fn try_get_quantity(row: &PgRow, col: &str) -> Result<u32, sqlx::Error> {
    let quantity: i32 = row.try_get(col)?;

    u32::try_from(quantity).map_err(|e| decode_error(col, e))
}

pub(crate) fn decode_error(
    col: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(source),
    }
}
