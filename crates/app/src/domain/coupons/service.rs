//! Coupons service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use storefront::{
    coupons::{AssociationSet, Coupon, CouponTarget, CouponUuid, SignupAudience},
    uuids::UserUuid,
};
use tracing::info;

use crate::{
    activity::{Activity, ActivityModule, ActivityRecorder, record_activity},
    auth::Principal,
    clock::Clock,
    domain::coupons::{
        errors::CouponsServiceError,
        models::{CouponListQuery, CouponRecord, CouponSummary, NewCoupon},
    },
    errors::StoreError,
    pagination::Page,
    store::{Store, UnitOfWork},
};

pub struct DefaultCouponsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    activity: Arc<dyn ActivityRecorder>,
}

impl DefaultCouponsService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        activity: Arc<dyn ActivityRecorder>,
    ) -> Self {
        Self {
            store,
            clock,
            activity,
        }
    }

    async fn record(&self, event: &'static str, record: &CouponRecord) {
        let activity = Activity::success(
            ActivityModule::Coupons,
            event,
            format!("Coupon {} {}", record.code, event_verb(event)),
        )
        .with("coupon_uuid", record.uuid)
        .with("coupon_code", &record.code)
        .with("coupon_type", record.coupon.kind())
        .with("coupon_status", record.coupon.status);

        record_activity(self.activity.as_ref(), activity).await;
    }
}

fn event_verb(event: &str) -> &'static str {
    match event {
        "COUPON_CREATED" => "created",
        "COUPON_DELETED" => "deleted",
        _ => "updated",
    }
}

/// Trimmed presentation fields and the validated coupon.
struct Prepared {
    code: String,
    name: String,
    short_description: Option<String>,
    long_description: Option<String>,
    coupon: Coupon,
}

fn trim_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn prepare(coupon: NewCoupon) -> Result<Prepared, CouponsServiceError> {
    let name = coupon.name.trim().to_string();
    if name.is_empty() {
        return Err(CouponsServiceError::MissingName);
    }

    let code = coupon.code.trim().to_string();
    if code.is_empty() {
        return Err(CouponsServiceError::MissingCode);
    }

    Ok(Prepared {
        code,
        name,
        short_description: trim_to_none(coupon.short_description),
        long_description: trim_to_none(coupon.long_description),
        coupon: coupon.draft.validate()?,
    })
}

/// Every associated product, category and user has to exist.
async fn ensure_references(
    uow: &mut dyn UnitOfWork,
    associations: &AssociationSet,
) -> Result<(), CouponsServiceError> {
    let products: Vec<_> = associations.products.iter().copied().collect();
    if uow.existing_products(&products).await?.len() != products.len() {
        return Err(CouponsServiceError::UnknownProducts);
    }

    let categories: Vec<_> = associations.categories.iter().copied().collect();
    if uow.existing_categories(&categories).await?.len() != categories.len() {
        return Err(CouponsServiceError::UnknownCategories);
    }

    let users: Vec<_> = associations.users.iter().copied().collect();
    if uow.existing_users(&users).await?.len() != users.len() {
        return Err(CouponsServiceError::UnknownUsers);
    }

    Ok(())
}

async fn ensure_unique_code(
    uow: &mut dyn UnitOfWork,
    code: &str,
    except: Option<CouponUuid>,
) -> Result<(), CouponsServiceError> {
    match uow.find_coupon_by_code(code).await? {
        Some(existing) if Some(existing.uuid) != except => Err(CouponsServiceError::DuplicateCode),
        _ => Ok(()),
    }
}

fn duplicate_code(error: StoreError) -> CouponsServiceError {
    match error {
        StoreError::AlreadyExists => CouponsServiceError::DuplicateCode,
        error => error.into(),
    }
}

/// Whether `user` may redeem `coupon` at all, ignoring the cart.
fn offered_to(coupon: &Coupon, user: Option<UserUuid>) -> bool {
    match &coupon.target {
        CouponTarget::NewSignup(SignupAudience::Users(users)) => {
            user.is_some_and(|user| users.contains(&user))
        }
        CouponTarget::Products { .. }
        | CouponTarget::CartValue { .. }
        | CouponTarget::NewSignup(SignupAudience::AllNewUsers) => true,
    }
}

#[async_trait]
impl CouponsService for DefaultCouponsService {
    #[tracing::instrument(
        name = "coupons.service.create_coupon",
        skip(self, coupon),
        fields(code = %coupon.code),
        err
    )]
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError> {
        let prepared = prepare(coupon)?;
        let now = self.clock.now();
        let associations = AssociationSet::of(&prepared.coupon.target);

        let mut uow = self.store.begin().await?;

        ensure_references(uow.as_mut(), &associations).await?;
        ensure_unique_code(uow.as_mut(), &prepared.code, None).await?;

        let record = CouponRecord {
            uuid: CouponUuid::new(),
            code: prepared.code,
            name: prepared.name,
            short_description: prepared.short_description,
            long_description: prepared.long_description,
            coupon: prepared.coupon,
            created_at: now,
            updated_at: now,
        };

        uow.insert_coupon(&record).await.map_err(duplicate_code)?;
        uow.apply_associations(
            record.uuid,
            &associations.changes_from(&AssociationSet::default()),
        )
        .await?;

        uow.commit().await?;

        info!(coupon = %record.uuid, code = %record.code, "created coupon");

        self.record("COUPON_CREATED", &record).await;

        Ok(record)
    }

    #[tracing::instrument(
        name = "coupons.service.update_coupon",
        skip(self, coupon),
        fields(uuid = %uuid, code = %coupon.code),
        err
    )]
    async fn update_coupon(
        &self,
        uuid: CouponUuid,
        coupon: NewCoupon,
    ) -> Result<CouponRecord, CouponsServiceError> {
        let prepared = prepare(coupon)?;
        let now = self.clock.now();
        let associations = AssociationSet::of(&prepared.coupon.target);

        let mut uow = self.store.begin().await?;

        let current = uow
            .find_coupon(uuid)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        ensure_references(uow.as_mut(), &associations).await?;
        ensure_unique_code(uow.as_mut(), &prepared.code, Some(uuid)).await?;

        let diff = associations.changes_from(&AssociationSet::of(&current.coupon.target));

        let record = CouponRecord {
            code: prepared.code,
            name: prepared.name,
            short_description: prepared.short_description,
            long_description: prepared.long_description,
            coupon: prepared.coupon,
            updated_at: now,
            ..current
        };

        uow.update_coupon(&record).await.map_err(duplicate_code)?;

        if !diff.is_empty() {
            uow.apply_associations(uuid, &diff).await?;
        }

        uow.commit().await?;

        self.record("COUPON_UPDATED", &record).await;

        Ok(record)
    }

    #[tracing::instrument(name = "coupons.service.delete_coupon", skip(self), fields(uuid = %uuid), err)]
    async fn delete_coupon(&self, uuid: CouponUuid) -> Result<(), CouponsServiceError> {
        let mut uow = self.store.begin().await?;

        let record = uow
            .find_coupon(uuid)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        if uow.delete_coupon(uuid).await? == 0 {
            return Err(CouponsServiceError::NotFound);
        }

        uow.commit().await?;

        self.record("COUPON_DELETED", &record).await;

        Ok(())
    }

    #[tracing::instrument(name = "coupons.service.get_coupon", skip(self), fields(uuid = %uuid), err)]
    async fn get_coupon(&self, uuid: CouponUuid) -> Result<CouponSummary, CouponsServiceError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = uow
            .find_coupon(uuid)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        uow.commit().await?;

        Ok(CouponSummary {
            state: record.state_at(now),
            record,
        })
    }

    #[tracing::instrument(name = "coupons.service.list_coupons", skip(self), err)]
    async fn list_coupons(
        &self,
        query: CouponListQuery,
    ) -> Result<Page<CouponSummary>, CouponsServiceError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let page = uow.list_coupons(&query, now).await?;

        uow.commit().await?;

        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|record| CouponSummary {
                    state: record.state_at(now),
                    record,
                })
                .collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    #[tracing::instrument(name = "coupons.service.list_available", skip(self), err)]
    async fn list_available(
        &self,
        principal: Principal,
    ) -> Result<Vec<CouponRecord>, CouponsServiceError> {
        let user = match principal {
            Principal::Anonymous => None,
            Principal::User { .. } => Some(principal.require_user()?),
        };

        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let coupons = uow.active_coupons(now).await?;

        uow.commit().await?;

        Ok(coupons
            .into_iter()
            .filter(|record| offered_to(&record.coupon, user))
            .collect())
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Validate and store a new coupon with its associations.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError>;

    /// Replace a coupon's definition and association sets.
    async fn update_coupon(
        &self,
        uuid: CouponUuid,
        coupon: NewCoupon,
    ) -> Result<CouponRecord, CouponsServiceError>;

    async fn delete_coupon(&self, uuid: CouponUuid) -> Result<(), CouponsServiceError>;

    async fn get_coupon(&self, uuid: CouponUuid) -> Result<CouponSummary, CouponsServiceError>;

    async fn list_coupons(
        &self,
        query: CouponListQuery,
    ) -> Result<Page<CouponSummary>, CouponsServiceError>;

    /// Coupons active right now that the caller may redeem, soonest ending first.
    async fn list_available(
        &self,
        principal: Principal,
    ) -> Result<Vec<CouponRecord>, CouponsServiceError>;
}
