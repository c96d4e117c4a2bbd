//! Coupons Repository

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};
use storefront::{
    catalog::ProductUuid,
    coupons::{
        AssociationChanges, AssociationDiff, Coupon, CouponKind, CouponStatus, CouponTarget,
        CouponUuid, SignupAudience,
    },
    discounts::Discount,
    uuids::{CategoryUuid, TypedUuid, UserUuid},
};
use uuid::Uuid;

use crate::{
    domain::{
        catalog::repository::decode_error,
        coupons::models::{CouponListQuery, CouponRecord},
    },
    errors::StoreError,
    pagination::Page,
    store::{PgUnitOfWork, contains_pattern},
};

const GET_COUPON_SQL: &str = include_str!("sql/get_coupon.sql");
const GET_COUPON_BY_CODE_SQL: &str = include_str!("sql/get_coupon_by_code.sql");
const CREATE_COUPON_SQL: &str = include_str!("sql/create_coupon.sql");
const UPDATE_COUPON_SQL: &str = include_str!("sql/update_coupon.sql");
const DELETE_COUPON_SQL: &str = include_str!("sql/delete_coupon.sql");
const LIST_COUPONS_SQL: &str = include_str!("sql/list_coupons.sql");
const COUNT_COUPONS_SQL: &str = include_str!("sql/count_coupons.sql");
const ACTIVE_COUPONS_SQL: &str = include_str!("sql/active_coupons.sql");
const GET_COUPON_PRODUCTS_SQL: &str = include_str!("sql/get_coupon_products.sql");
const GET_COUPON_CATEGORIES_SQL: &str = include_str!("sql/get_coupon_categories.sql");
const GET_COUPON_USERS_SQL: &str = include_str!("sql/get_coupon_users.sql");
const ADD_COUPON_PRODUCTS_SQL: &str = include_str!("sql/add_coupon_products.sql");
const REMOVE_COUPON_PRODUCTS_SQL: &str = include_str!("sql/remove_coupon_products.sql");
const ADD_COUPON_CATEGORIES_SQL: &str = include_str!("sql/add_coupon_categories.sql");
const REMOVE_COUPON_CATEGORIES_SQL: &str = include_str!("sql/remove_coupon_categories.sql");
const ADD_COUPON_USERS_SQL: &str = include_str!("sql/add_coupon_users.sql");
const REMOVE_COUPON_USERS_SQL: &str = include_str!("sql/remove_coupon_users.sql");

#[async_trait]
pub trait CouponsRepository: Send {
    async fn find_coupon(&mut self, uuid: CouponUuid) -> Result<Option<CouponRecord>, StoreError>;

    /// Look a coupon up by code, ignoring case and surrounding whitespace.
    async fn find_coupon_by_code(&mut self, code: &str)
    -> Result<Option<CouponRecord>, StoreError>;

    /// Store the coupon row. Associations are written with
    /// [`CouponsRepository::apply_associations`].
    async fn insert_coupon(&mut self, record: &CouponRecord) -> Result<(), StoreError>;

    async fn update_coupon(&mut self, record: &CouponRecord) -> Result<u64, StoreError>;

    async fn delete_coupon(&mut self, uuid: CouponUuid) -> Result<u64, StoreError>;

    async fn apply_associations(
        &mut self,
        coupon: CouponUuid,
        diff: &AssociationDiff,
    ) -> Result<(), StoreError>;

    /// Newest first. The state filter is evaluated at `now`.
    async fn list_coupons(
        &mut self,
        query: &CouponListQuery,
        now: Timestamp,
    ) -> Result<Page<CouponRecord>, StoreError>;

    /// Coupons active at `now`, soonest ending first.
    async fn active_coupons(&mut self, now: Timestamp) -> Result<Vec<CouponRecord>, StoreError>;
}

struct CouponRow {
    uuid: CouponUuid,
    code: String,
    name: String,
    short_description: Option<String>,
    long_description: Option<String>,
    kind: CouponKind,
    discount: Discount,
    minimum_cart_value: Option<Decimal>,
    apply_to_all_new_users: bool,
    status: CouponStatus,
    starts_at: Timestamp,
    ends_at: Timestamp,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for CouponRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("coupon_type")?;
        let discount_type: String = row.try_get("discount_type")?;
        let status: String = row.try_get("status")?;

        Ok(Self {
            uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            short_description: row.try_get("short_description")?,
            long_description: row.try_get("long_description")?,
            kind: kind.parse().map_err(|e| decode_error("coupon_type", e))?,
            discount: Discount {
                kind: discount_type
                    .parse()
                    .map_err(|e| decode_error("discount_type", e))?,
                value: row.try_get("discount_value")?,
            },
            minimum_cart_value: row.try_get("minimum_cart_value")?,
            apply_to_all_new_users: row.try_get("apply_to_all_new_users")?,
            status: status.parse().map_err(|e| decode_error("status", e))?,
            starts_at: row.try_get::<SqlxTimestamp, _>("starts_at")?.to_jiff(),
            ends_at: row.try_get::<SqlxTimestamp, _>("ends_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

/// Association members of a batch of coupons, keyed by coupon.
#[derive(Default)]
struct Associations {
    products: FxHashMap<Uuid, FxHashSet<ProductUuid>>,
    categories: FxHashMap<Uuid, FxHashSet<CategoryUuid>>,
    users: FxHashMap<Uuid, FxHashSet<UserUuid>>,
}

impl CouponRow {
    fn into_record(self, associations: &mut Associations) -> CouponRecord {
        let key = self.uuid.into_uuid();

        let target = match self.kind {
            CouponKind::Product => CouponTarget::Products {
                products: associations.products.remove(&key).unwrap_or_default(),
                categories: associations.categories.remove(&key).unwrap_or_default(),
            },
            CouponKind::CartValue => CouponTarget::CartValue {
                minimum_cart_value: self.minimum_cart_value.unwrap_or(Decimal::ZERO),
            },
            CouponKind::NewSignup if self.apply_to_all_new_users => {
                CouponTarget::NewSignup(SignupAudience::AllNewUsers)
            }
            CouponKind::NewSignup => CouponTarget::NewSignup(SignupAudience::Users(
                associations.users.remove(&key).unwrap_or_default(),
            )),
        };

        CouponRecord {
            uuid: self.uuid,
            code: self.code,
            name: self.name,
            short_description: self.short_description,
            long_description: self.long_description,
            coupon: Coupon {
                target,
                discount: self.discount,
                status: self.status,
                starts_at: self.starts_at,
                ends_at: self.ends_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

async fn members<T>(
    uow: &mut PgUnitOfWork,
    sql: &'static str,
    coupons: &[Uuid],
) -> Result<FxHashMap<Uuid, FxHashSet<TypedUuid<T>>>, StoreError> {
    let rows: Vec<(Uuid, Uuid)> = query_as(sql)
        .bind(coupons)
        .fetch_all(&mut *uow.tx)
        .await?;

    let mut members: FxHashMap<Uuid, FxHashSet<TypedUuid<T>>> = FxHashMap::default();

    for (coupon, member) in rows {
        members
            .entry(coupon)
            .or_default()
            .insert(TypedUuid::from_uuid(member));
    }

    Ok(members)
}

async fn hydrate(
    uow: &mut PgUnitOfWork,
    rows: Vec<CouponRow>,
) -> Result<Vec<CouponRecord>, StoreError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let coupons: Vec<Uuid> = rows.iter().map(|row| row.uuid.into_uuid()).collect();

    let mut associations = Associations {
        products: members(uow, GET_COUPON_PRODUCTS_SQL, &coupons).await?,
        categories: members(uow, GET_COUPON_CATEGORIES_SQL, &coupons).await?,
        users: members(uow, GET_COUPON_USERS_SQL, &coupons).await?,
    };

    Ok(rows
        .into_iter()
        .map(|row| row.into_record(&mut associations))
        .collect())
}

async fn apply_changes<T>(
    uow: &mut PgUnitOfWork,
    coupon: CouponUuid,
    changes: &AssociationChanges<TypedUuid<T>>,
    add_sql: &'static str,
    remove_sql: &'static str,
) -> Result<(), StoreError> {
    for (sql, members) in [(add_sql, &changes.added), (remove_sql, &changes.removed)] {
        if members.is_empty() {
            continue;
        }

        let members: Vec<Uuid> = members.iter().map(|member| member.into_uuid()).collect();

        query(sql)
            .bind(coupon.into_uuid())
            .bind(members)
            .execute(&mut *uow.tx)
            .await?;
    }

    Ok(())
}

fn bind_coupon<'q>(
    statement: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    record: &'q CouponRecord,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    let coupon = &record.coupon;

    statement
        .bind(record.uuid.into_uuid())
        .bind(record.code.as_str())
        .bind(record.name.as_str())
        .bind(record.short_description.as_deref())
        .bind(record.long_description.as_deref())
        .bind(coupon.kind().as_str())
        .bind(coupon.discount.kind.as_str())
        .bind(coupon.discount.value)
        .bind(coupon.target.minimum_cart_value())
        .bind(coupon.target.applies_to_all_new_users())
        .bind(coupon.status.as_str())
        .bind(SqlxTimestamp::from(coupon.starts_at))
        .bind(SqlxTimestamp::from(coupon.ends_at))
        .bind(SqlxTimestamp::from(record.updated_at))
}

#[async_trait]
impl CouponsRepository for PgUnitOfWork {
    async fn find_coupon(&mut self, uuid: CouponUuid) -> Result<Option<CouponRecord>, StoreError> {
        let row = query_as::<Postgres, CouponRow>(GET_COUPON_SQL)
            .bind(uuid.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(hydrate(self, row.into_iter().collect()).await?.pop())
    }

    async fn find_coupon_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<CouponRecord>, StoreError> {
        let row = query_as::<Postgres, CouponRow>(GET_COUPON_BY_CODE_SQL)
            .bind(code.trim())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(hydrate(self, row.into_iter().collect()).await?.pop())
    }

    async fn insert_coupon(&mut self, record: &CouponRecord) -> Result<(), StoreError> {
        bind_coupon(query(CREATE_COUPON_SQL), record)
            .bind(SqlxTimestamp::from(record.created_at))
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_coupon(&mut self, record: &CouponRecord) -> Result<u64, StoreError> {
        let rows_affected = bind_coupon(query(UPDATE_COUPON_SQL), record)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn delete_coupon(&mut self, uuid: CouponUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_COUPON_SQL)
            .bind(uuid.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn apply_associations(
        &mut self,
        coupon: CouponUuid,
        diff: &AssociationDiff,
    ) -> Result<(), StoreError> {
        apply_changes(
            self,
            coupon,
            &diff.products,
            ADD_COUPON_PRODUCTS_SQL,
            REMOVE_COUPON_PRODUCTS_SQL,
        )
        .await?;

        apply_changes(
            self,
            coupon,
            &diff.categories,
            ADD_COUPON_CATEGORIES_SQL,
            REMOVE_COUPON_CATEGORIES_SQL,
        )
        .await?;

        apply_changes(
            self,
            coupon,
            &diff.users,
            ADD_COUPON_USERS_SQL,
            REMOVE_COUPON_USERS_SQL,
        )
        .await
    }

    async fn list_coupons(
        &mut self,
        list: &CouponListQuery,
        now: Timestamp,
    ) -> Result<Page<CouponRecord>, StoreError> {
        let kind = list.kind.map(CouponKind::as_str);
        let discount_kind = list.discount_kind.map(|kind| kind.as_str());
        let state = list.state.map(|state| state.as_str());
        let search = list.search_term().map(contains_pattern);

        let total: i64 = query_scalar(COUNT_COUPONS_SQL)
            .bind(kind)
            .bind(discount_kind)
            .bind(state)
            .bind(SqlxTimestamp::from(now))
            .bind(search.as_deref())
            .fetch_one(&mut *self.tx)
            .await?;

        let rows = query_as::<Postgres, CouponRow>(LIST_COUPONS_SQL)
            .bind(kind)
            .bind(discount_kind)
            .bind(state)
            .bind(SqlxTimestamp::from(now))
            .bind(search.as_deref())
            .bind(i64::from(list.page.per_page()))
            .bind(i64::try_from(list.page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(Page {
            items: hydrate(self, rows).await?,
            total: u64::try_from(total).unwrap_or(0),
            page: list.page.page(),
            per_page: list.page.per_page(),
        })
    }

    async fn active_coupons(&mut self, now: Timestamp) -> Result<Vec<CouponRecord>, StoreError> {
        let rows = query_as::<Postgres, CouponRow>(ACTIVE_COUPONS_SQL)
            .bind(SqlxTimestamp::from(now))
            .fetch_all(&mut *self.tx)
            .await?;

        hydrate(self, rows).await
    }
}
