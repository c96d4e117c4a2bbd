//! Checkout service.
//!
//! Turns the caller's cart into a quote or an order. Placing an order runs in a
//! single unit of work: product rows are locked in id order, stock is guarded
//! per line and per counter, every line is re-priced at one captured instant,
//! coupons are resolved, and the stock counters are decremented conditionally
//! before the order is written.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use storefront::{
    catalog::{ProductSnapshot, ProductUuid},
    pricing::price_line,
    quote::{Quote, RequestedCoupon},
    stock::{StockCheckMode, StockDemand, enforce_quantity_bounds},
    uuids::UserUuid,
};
use tracing::{info, warn};

use crate::{
    activity::{Activity, ActivityModule, ActivityRecorder, record_activity},
    auth::Principal,
    clock::Clock,
    domain::{
        carts::models::CartRecord,
        checkout::{
            errors::CheckoutServiceError,
            models::{NewOrder, Order, OrderCoupon, OrderLine, OrderLineUuid, OrderUuid, PlaceOrder},
        },
        coupons::models::CouponRecord,
    },
    store::{Store, UnitOfWork},
};

pub struct DefaultCheckoutService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    activity: Arc<dyn ActivityRecorder>,
}

impl DefaultCheckoutService {
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

    async fn try_place_order(
        &self,
        user: UserUuid,
        request: &PlaceOrder,
        now: Timestamp,
    ) -> Result<Order, CheckoutServiceError> {
        let mut uow = self.store.begin().await?;

        let assembly = assemble(
            uow.as_mut(),
            user,
            now,
            &request.coupon_codes,
            request.shipping.amount,
            StockCheckMode::Authoritative,
        )
        .await?;

        for (target, quantity) in assembly.demand.decrements() {
            if !uow.decrement_stock(target, quantity).await? {
                return Err(CheckoutServiceError::StockConflict);
            }
        }

        let cart = assembly.cart.uuid;
        let order = uow.insert_order(assembly.into_new_order(user, request, now)).await?;

        if request.clear_cart {
            uow.clear_cart_items(cart).await?;
            uow.touch_cart(cart, now).await?;
        }

        uow.commit().await?;

        Ok(order)
    }
}

/// A priced cart with its coupons resolved.
struct Assembly {
    cart: CartRecord,
    quote: Quote,

    /// Product name and variant label of each quote line.
    labels: Vec<(String, Option<String>)>,

    coupons: Vec<CouponRecord>,
    demand: StockDemand,
}

impl Assembly {
    fn into_new_order(self, user: UserUuid, request: &PlaceOrder, now: Timestamp) -> NewOrder {
        let lines = self
            .quote
            .lines
            .iter()
            .zip(self.labels)
            .map(|(line, (product_name, variant_label))| OrderLine {
                uuid: OrderLineUuid::new(),
                product: line.product,
                variant: line.variant,
                product_name,
                variant_label,
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_inclusive_unit_price: line.tax_inclusive_unit_price,
                line_total: line.line_total(),
                line_tax: line.line_tax(),
            })
            .collect();

        let coupons = self
            .quote
            .coupons
            .iter()
            .zip(&self.coupons)
            .map(|(applied, record)| OrderCoupon {
                coupon: Some(record.uuid),
                code: applied.code.clone(),
                discount: applied.discount,
                amount: applied.amount,
            })
            .collect();

        NewOrder {
            uuid: OrderUuid::new(),
            user,
            lines,
            coupons,
            totals: self.quote.totals,
            shipping_details: request.shipping.details.clone(),
            placed_at: now,
        }
    }
}

/// Load, guard and price the caller's cart and resolve `codes` against it.
async fn assemble(
    uow: &mut dyn UnitOfWork,
    user: UserUuid,
    now: Timestamp,
    codes: &[String],
    shipping: Decimal,
    mode: StockCheckMode,
) -> Result<Assembly, CheckoutServiceError> {
    let cart = uow
        .find_cart_for_user(user)
        .await?
        .ok_or(CheckoutServiceError::EmptyCart)?;

    let items = uow.cart_items(cart.uuid).await?;

    if items.is_empty() {
        return Err(CheckoutServiceError::EmptyCart);
    }

    // Sorted so concurrent checkouts lock rows in the same order.
    let mut uuids: Vec<ProductUuid> = items.iter().map(|item| item.product).collect();
    uuids.sort_unstable();
    uuids.dedup();

    let mut products: FxHashMap<ProductUuid, ProductSnapshot> = FxHashMap::default();

    for uuid in uuids {
        let product = uow
            .product(uuid, mode)
            .await?
            .ok_or(CheckoutServiceError::ProductNotFound)?;

        products.insert(uuid, product);
    }

    let mut demand = StockDemand::new();
    let mut lines = Vec::with_capacity(items.len());
    let mut labels = Vec::with_capacity(items.len());

    for item in &items {
        let product = products
            .get(&item.product)
            .ok_or(CheckoutServiceError::ProductNotFound)?;
        let variant = product.resolve_variant(item.variant)?;

        enforce_quantity_bounds(product, variant, item.quantity)?;
        demand.add(product, variant, item.quantity);

        lines.push(price_line(product, variant, item.quantity, now));
        labels.push((product.name.clone(), variant.map(|v| v.key.clone())));
    }

    demand.ensure_available()?;

    let mut coupons = Vec::with_capacity(codes.len());

    for code in codes {
        let record = uow.find_coupon_by_code(code).await?.ok_or_else(|| {
            CheckoutServiceError::CouponNotFound {
                code: code.trim().to_string(),
            }
        })?;

        coupons.push(record);
    }

    let requested: Vec<RequestedCoupon<'_>> = coupons
        .iter()
        .map(|record| RequestedCoupon {
            code: &record.code,
            coupon: &record.coupon,
        })
        .collect();

    let quote = Quote::build(lines, &requested, Some(user), now, shipping)?;

    Ok(Assembly {
        cart,
        quote,
        labels,
        coupons,
        demand,
    })
}

#[async_trait]
impl CheckoutService for DefaultCheckoutService {
    #[tracing::instrument(name = "checkout.service.quote", skip(self), err)]
    async fn quote(
        &self,
        principal: Principal,
        coupon_codes: Vec<String>,
        shipping: Decimal,
    ) -> Result<Quote, CheckoutServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let assembly = assemble(
            uow.as_mut(),
            user,
            now,
            &coupon_codes,
            shipping,
            StockCheckMode::Advisory,
        )
        .await?;

        uow.commit().await?;

        Ok(assembly.quote)
    }

    #[tracing::instrument(
        name = "checkout.service.place_order",
        skip(self, request),
        fields(coupons = request.coupon_codes.len()),
        err
    )]
    async fn place_order(
        &self,
        principal: Principal,
        request: PlaceOrder,
    ) -> Result<Order, CheckoutServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();

        let order = match self.try_place_order(user, &request, now).await {
            Err(error) if error.is_transient() => {
                warn!(error = %error, "retrying order placement after a transient conflict");

                self.try_place_order(user, &request, now).await?
            }
            result => result?,
        };

        info!(order = %order.uuid, number = %order.number, "placed order");

        let activity = Activity::success(
            ActivityModule::Orders,
            "ORDER_PLACED",
            format!("Order {} placed", order.number),
        )
        .with("order_uuid", order.uuid)
        .with("order_number", &order.number)
        .with("user_uuid", order.user)
        .with("grand_total", order.totals.grand_total)
        .with("items", order.lines.len());

        record_activity(self.activity.as_ref(), activity).await;

        Ok(order)
    }

    #[tracing::instrument(name = "checkout.service.get_order", skip(self), fields(uuid = %uuid), err)]
    async fn get_order(
        &self,
        principal: Principal,
        uuid: OrderUuid,
    ) -> Result<Order, CheckoutServiceError> {
        let user = principal.require_user()?;
        let mut uow = self.store.begin().await?;

        let order = uow
            .find_order(uuid)
            .await?
            .filter(|order| order.user == user)
            .ok_or(CheckoutServiceError::OrderNotFound)?;

        uow.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(name = "checkout.service.list_orders", skip(self), err)]
    async fn list_orders(&self, principal: Principal) -> Result<Vec<Order>, CheckoutServiceError> {
        let user = principal.require_user()?;
        let mut uow = self.store.begin().await?;

        let orders = uow.list_orders_for_user(user).await?;

        uow.commit().await?;

        Ok(orders)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Price the caller's cart with the given coupons without writing anything.
    async fn quote(
        &self,
        principal: Principal,
        coupon_codes: Vec<String>,
        shipping: Decimal,
    ) -> Result<Quote, CheckoutServiceError>;

    /// Turn the caller's cart into an order.
    ///
    /// A transient store conflict re-runs the whole placement once.
    async fn place_order(
        &self,
        principal: Principal,
        request: PlaceOrder,
    ) -> Result<Order, CheckoutServiceError>;

    /// One of the caller's orders.
    async fn get_order(
        &self,
        principal: Principal,
        uuid: OrderUuid,
    ) -> Result<Order, CheckoutServiceError>;

    /// The caller's orders, newest first.
    async fn list_orders(&self, principal: Principal) -> Result<Vec<Order>, CheckoutServiceError>;
}
