//! Orders Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use serde_json::{Map, Value};
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar, types::Json};
use storefront::{
    catalog::{ProductUuid, VariantUuid},
    coupons::CouponUuid,
    discounts::Discount,
    quote::QuoteTotals,
    uuids::UserUuid,
};
use uuid::Uuid;

use crate::{
    domain::{
        catalog::repository::{decode_error, quantity_param, try_get_quantity},
        checkout::models::{NewOrder, Order, OrderCoupon, OrderLine, OrderLineUuid, OrderUuid},
    },
    errors::StoreError,
    store::PgUnitOfWork,
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_LINE_SQL: &str = include_str!("sql/create_order_line.sql");
const CREATE_ORDER_COUPON_SQL: &str = include_str!("sql/create_order_coupon.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const GET_ORDER_LINES_SQL: &str = include_str!("sql/get_order_lines.sql");
const GET_ORDER_COUPONS_SQL: &str = include_str!("sql/get_order_coupons.sql");
const LIST_USER_ORDER_UUIDS_SQL: &str = include_str!("sql/list_user_order_uuids.sql");

#[async_trait]
pub trait OrdersRepository: Send {
    /// Store `order` with its lines and coupons, assigning its number.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError>;

    async fn find_order(&mut self, uuid: OrderUuid) -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn list_orders_for_user(&mut self, user: UserUuid) -> Result<Vec<Order>, StoreError>;
}

struct OrderRow(Order);

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        let shipping_details: Option<Json<Map<String, Value>>> = row.try_get("shipping_details")?;

        Ok(Self(Order {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            number: row.try_get("order_number")?,
            user: UserUuid::from_uuid(row.try_get("user_uuid")?),
            status: status.parse().map_err(|e| decode_error("status", e))?,
            lines: Vec::new(),
            coupons: Vec::new(),
            totals: QuoteTotals {
                product_total: row.try_get("product_total")?,
                tax_total: row.try_get("tax_total")?,
                discount_total: row.try_get("discount_total")?,
                shipping_total: row.try_get("shipping_total")?,
                grand_total: row.try_get("grand_total")?,
            },
            shipping_details: shipping_details.map(|details| details.0),
            placed_at: row.try_get::<SqlxTimestamp, _>("placed_at")?.to_jiff(),
        }))
    }
}

struct OrderLineRow(OrderLine);

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(OrderLine {
            uuid: OrderLineUuid::from_uuid(row.try_get("uuid")?),
            product: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            variant: row
                .try_get::<Option<Uuid>, _>("variant_uuid")?
                .map(VariantUuid::from_uuid),
            product_name: row.try_get("product_name")?,
            variant_label: row.try_get("variant_label")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: row.try_get("unit_price")?,
            tax_inclusive_unit_price: row.try_get("tax_inclusive_unit_price")?,
            line_total: row.try_get("line_total")?,
            line_tax: row.try_get("line_tax")?,
        }))
    }
}

struct OrderCouponRow(OrderCoupon);

impl<'r> FromRow<'r, PgRow> for OrderCouponRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let discount_type: String = row.try_get("discount_type")?;

        Ok(Self(OrderCoupon {
            coupon: row
                .try_get::<Option<Uuid>, _>("coupon_uuid")?
                .map(CouponUuid::from_uuid),
            code: row.try_get("code")?,
            discount: Discount {
                kind: discount_type
                    .parse()
                    .map_err(|e| decode_error("discount_type", e))?,
                value: row.try_get("discount_value")?,
            },
            amount: row.try_get("amount")?,
        }))
    }
}

fn position(index: usize) -> Result<i32, StoreError> {
    i32::try_from(index).map_err(|_| StoreError::InvalidData)
}

#[async_trait]
impl OrdersRepository for PgUnitOfWork {
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, StoreError> {
        let totals = order.totals;

        let number: String = query_scalar(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.user.into_uuid())
            .bind(totals.product_total)
            .bind(totals.tax_total)
            .bind(totals.discount_total)
            .bind(totals.shipping_total)
            .bind(totals.grand_total)
            .bind(order.shipping_details.clone().map(Json))
            .bind(SqlxTimestamp::from(order.placed_at))
            .fetch_one(&mut *self.tx)
            .await?;

        for (index, line) in order.lines.iter().enumerate() {
            query(CREATE_ORDER_LINE_SQL)
                .bind(line.uuid.into_uuid())
                .bind(order.uuid.into_uuid())
                .bind(position(index)?)
                .bind(line.product.into_uuid())
                .bind(line.variant.map(VariantUuid::into_uuid))
                .bind(line.product_name.as_str())
                .bind(line.variant_label.as_deref())
                .bind(quantity_param(line.quantity)?)
                .bind(line.unit_price)
                .bind(line.tax_inclusive_unit_price)
                .bind(line.line_total)
                .bind(line.line_tax)
                .execute(&mut *self.tx)
                .await?;
        }

        for (index, coupon) in order.coupons.iter().enumerate() {
            query(CREATE_ORDER_COUPON_SQL)
                .bind(order.uuid.into_uuid())
                .bind(position(index)?)
                .bind(coupon.coupon.map(CouponUuid::into_uuid))
                .bind(coupon.code.as_str())
                .bind(coupon.discount.kind.as_str())
                .bind(coupon.discount.value)
                .bind(coupon.amount)
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(order.into_order(number))
    }

    async fn find_order(&mut self, uuid: OrderUuid) -> Result<Option<Order>, StoreError> {
        let Some(OrderRow(mut order)) = query_as::<Postgres, OrderRow>(GET_ORDER_SQL)
            .bind(uuid.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
        else {
            return Ok(None);
        };

        order.lines = query_as::<Postgres, OrderLineRow>(GET_ORDER_LINES_SQL)
            .bind(uuid.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(|row| row.0)
            .collect();

        order.coupons = query_as::<Postgres, OrderCouponRow>(GET_ORDER_COUPONS_SQL)
            .bind(uuid.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(|row| row.0)
            .collect();

        Ok(Some(order))
    }

    async fn list_orders_for_user(&mut self, user: UserUuid) -> Result<Vec<Order>, StoreError> {
        let uuids: Vec<Uuid> = query_scalar(LIST_USER_ORDER_UUIDS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        let mut orders = Vec::with_capacity(uuids.len());

        for uuid in uuids {
            if let Some(order) = self.find_order(OrderUuid::from_uuid(uuid)).await? {
                orders.push(order);
            }
        }

        Ok(orders)
    }
}
