//! Carts Repository

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};
use storefront::{
    catalog::{ProductUuid, VariantUuid},
    uuids::UserUuid,
};

use crate::{
    domain::{
        carts::models::{
            CartItem, CartItemUuid, CartListQuery, CartRecord, CartSummary, CartUuid,
        },
        catalog::repository::{decode_error, quantity_param, try_get_quantity},
    },
    errors::StoreError,
    pagination::Page,
    store::{PgUnitOfWork, contains_pattern},
};

const FIND_CART_FOR_USER_SQL: &str = include_str!("sql/find_cart_for_user.sql");
const CREATE_CART_SQL: &str = include_str!("sql/create_cart.sql");
const TOUCH_CART_SQL: &str = include_str!("sql/touch_cart.sql");
const GET_CART_ITEMS_SQL: &str = include_str!("sql/get_cart_items.sql");
const CREATE_CART_ITEM_SQL: &str = include_str!("sql/create_cart_item.sql");
const UPDATE_CART_ITEM_SQL: &str = include_str!("sql/update_cart_item.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("sql/delete_cart_item.sql");
const CLEAR_CART_ITEMS_SQL: &str = include_str!("sql/clear_cart_items.sql");
const LIST_CARTS_SQL: &str = include_str!("sql/list_carts.sql");
const COUNT_CARTS_SQL: &str = include_str!("sql/count_carts.sql");

#[async_trait]
pub trait CartsRepository: Send {
    async fn find_cart_for_user(&mut self, user: UserUuid)
    -> Result<Option<CartRecord>, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] when the user already has a cart.
    async fn create_cart(&mut self, cart: CartRecord) -> Result<CartRecord, StoreError>;

    async fn touch_cart(&mut self, cart: CartUuid, at: Timestamp) -> Result<(), StoreError>;

    /// Items in creation order.
    async fn cart_items(&mut self, cart: CartUuid) -> Result<Vec<CartItem>, StoreError>;

    async fn insert_cart_item(&mut self, item: CartItem) -> Result<CartItem, StoreError>;

    async fn update_cart_item(
        &mut self,
        item: CartItemUuid,
        quantity: u32,
        unit_price: Decimal,
        at: Timestamp,
    ) -> Result<CartItem, StoreError>;

    async fn delete_cart_item(
        &mut self,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<u64, StoreError>;

    async fn clear_cart_items(&mut self, cart: CartUuid) -> Result<u64, StoreError>;

    async fn list_carts(&mut self, query: &CartListQuery) -> Result<Page<CartSummary>, StoreError>;
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartItemUuid::from_uuid(row.try_get("uuid")?),
            cart: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            product: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            variant: row
                .try_get::<Option<uuid::Uuid>, _>("variant_uuid")?
                .map(VariantUuid::from_uuid),
            variant_label: row.try_get("variant_label")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: row.try_get("unit_price")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartSummary {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            cart: CartUuid::from_uuid(row.try_get("uuid")?),
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            user_email: row.try_get("user_email")?,
            item_count: try_get_count(row, "item_count")?,
            total_quantity: try_get_count(row, "total_quantity")?,
            subtotal: row.try_get("subtotal")?,
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

fn try_get_count(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let count: i64 = row.try_get(col)?;

    u64::try_from(count).map_err(|e| decode_error(col, e))
}

#[async_trait]
impl CartsRepository for PgUnitOfWork {
    async fn find_cart_for_user(
        &mut self,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(FIND_CART_FOR_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn create_cart(&mut self, cart: CartRecord) -> Result<CartRecord, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(CREATE_CART_SQL)
            .bind(cart.uuid.into_uuid())
            .bind(cart.user.into_uuid())
            .bind(SqlxTimestamp::from(cart.created_at))
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn touch_cart(&mut self, cart: CartUuid, at: Timestamp) -> Result<(), StoreError> {
        query(TOUCH_CART_SQL)
            .bind(cart.into_uuid())
            .bind(SqlxTimestamp::from(at))
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn cart_items(&mut self, cart: CartUuid) -> Result<Vec<CartItem>, StoreError> {
        Ok(query_as::<Postgres, CartItem>(GET_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn insert_cart_item(&mut self, item: CartItem) -> Result<CartItem, StoreError> {
        Ok(query_as::<Postgres, CartItem>(CREATE_CART_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.cart.into_uuid())
            .bind(item.product.into_uuid())
            .bind(item.variant.map(VariantUuid::into_uuid))
            .bind(item.variant_label)
            .bind(quantity_param(item.quantity)?)
            .bind(item.unit_price)
            .bind(SqlxTimestamp::from(item.created_at))
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_cart_item(
        &mut self,
        item: CartItemUuid,
        quantity: u32,
        unit_price: Decimal,
        at: Timestamp,
    ) -> Result<CartItem, StoreError> {
        Ok(query_as::<Postgres, CartItem>(UPDATE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(quantity_param(quantity)?)
            .bind(unit_price)
            .bind(SqlxTimestamp::from(at))
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn delete_cart_item(
        &mut self,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn clear_cart_items(&mut self, cart: CartUuid) -> Result<u64, StoreError> {
        let rows_affected = query(CLEAR_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn list_carts(&mut self, list: &CartListQuery) -> Result<Page<CartSummary>, StoreError> {
        let search = list
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let total: i64 = query_scalar(COUNT_CARTS_SQL)
            .bind(search.as_deref())
            .fetch_one(&mut *self.tx)
            .await?;

        let sql = format!(
            "{LIST_CARTS_SQL}\nORDER BY {}\nLIMIT $2 OFFSET $3",
            list.sort.order_by()
        );

        let items = query_as::<Postgres, CartSummary>(&sql)
            .bind(search.as_deref())
            .bind(i64::from(list.page.per_page()))
            .bind(i64::try_from(list.page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: list.page.page(),
            per_page: list.page.per_page(),
        })
    }
}
