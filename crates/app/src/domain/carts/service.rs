//! Carts service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use storefront::{
    catalog::ProductSnapshot,
    pricing::unit_price,
    stock::{QuantityError, StockCheckMode, enforce_quantity_bounds, merge_quantities},
    uuids::UserUuid,
};
use tracing::info;

use crate::{
    activity::{Activity, ActivityModule, ActivityRecorder, record_activity},
    auth::Principal,
    clock::Clock,
    domain::carts::{
        errors::CartsServiceError,
        models::{
            AddCartItem, Cart, CartItem, CartItemUuid, CartListQuery, CartRecord, CartSummary,
            CartUuid, GuestCartLine,
        },
    },
    errors::StoreError,
    pagination::Page,
    store::{Store, UnitOfWork},
};

pub struct DefaultCartsService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    activity: Arc<dyn ActivityRecorder>,
}

impl DefaultCartsService {
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

    async fn record(&self, event: &'static str, cart: &Cart, description: &str) {
        let activity = Activity::success(ActivityModule::Carts, event, description)
            .with("cart_uuid", cart.uuid)
            .with("user_uuid", cart.user)
            .with("items", cart.items.len());

        record_activity(self.activity.as_ref(), activity).await;
    }
}

#[async_trait]
impl CartsService for DefaultCartsService {
    #[tracing::instrument(name = "carts.service.get_cart", skip(self), err)]
    async fn get_cart(&self, principal: Principal) -> Result<Option<Cart>, CartsServiceError> {
        let user = principal.require_user()?;
        let mut uow = self.store.begin().await?;

        let cart = match uow.find_cart_for_user(user).await? {
            Some(record) => Some(load_cart(uow.as_mut(), record).await?),
            None => None,
        };

        uow.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.get_or_create_cart", skip(self), err)]
    async fn get_or_create_cart(&self, principal: Principal) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = find_or_create(uow.as_mut(), user, now).await?;
        let cart = load_cart(uow.as_mut(), record).await?;

        uow.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self),
        fields(product = %item.product, quantity = item.quantity),
        err
    )]
    async fn add_item(
        &self,
        principal: Principal,
        item: AddCartItem,
    ) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = find_or_create(uow.as_mut(), user, now).await?;
        add_line(uow.as_mut(), record.uuid, item, now).await?;
        uow.touch_cart(record.uuid, now).await?;

        let cart = load_cart(uow.as_mut(), CartRecord { updated_at: now, ..record }).await?;

        uow.commit().await?;

        info!(cart = %cart.uuid, "added item to cart");

        self.record("CART_ITEM_ADDED", &cart, "Item added to cart").await;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.update_item", skip(self), fields(item = %item), err)]
    async fn update_item(
        &self,
        principal: Principal,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = uow
            .find_cart_for_user(user)
            .await?
            .ok_or(CartsServiceError::CartNotFound)?;

        let existing = uow
            .cart_items(record.uuid)
            .await?
            .into_iter()
            .find(|candidate| candidate.uuid == item)
            .ok_or(CartsServiceError::ItemNotFound)?;

        let product = load_product(uow.as_mut(), &existing).await?;
        let variant = product.resolve_variant(existing.variant)?;

        enforce_quantity_bounds(&product, variant, quantity)?;

        uow.update_cart_item(item, quantity, unit_price(&product, variant, now), now)
            .await?;
        uow.touch_cart(record.uuid, now).await?;

        let cart = load_cart(uow.as_mut(), CartRecord { updated_at: now, ..record }).await?;

        uow.commit().await?;

        self.record("CART_ITEM_UPDATED", &cart, "Cart item updated").await;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.remove_item", skip(self), fields(item = %item), err)]
    async fn remove_item(
        &self,
        principal: Principal,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = uow
            .find_cart_for_user(user)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        if uow.delete_cart_item(record.uuid, item).await? == 0 {
            return Err(CartsServiceError::ItemNotFound);
        }

        uow.touch_cart(record.uuid, now).await?;

        let cart = load_cart(uow.as_mut(), CartRecord { updated_at: now, ..record }).await?;

        uow.commit().await?;

        self.record("CART_ITEM_REMOVED", &cart, "Item removed from cart").await;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.merge_guest_cart",
        skip(self, lines),
        fields(lines = lines.len()),
        err
    )]
    async fn merge_guest_cart(
        &self,
        principal: Principal,
        lines: Vec<Option<GuestCartLine>>,
    ) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = find_or_create(uow.as_mut(), user, now).await?;

        for line in lines.into_iter().flatten() {
            add_line(uow.as_mut(), record.uuid, line, now).await?;
        }

        uow.touch_cart(record.uuid, now).await?;

        let cart = load_cart(uow.as_mut(), CartRecord { updated_at: now, ..record }).await?;

        uow.commit().await?;

        self.record("CART_MERGED", &cart, "Guest cart merged").await;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.clear", skip(self), err)]
    async fn clear(&self, principal: Principal) -> Result<Cart, CartsServiceError> {
        let user = principal.require_user()?;
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let record = find_or_create(uow.as_mut(), user, now).await?;

        uow.clear_cart_items(record.uuid).await?;
        uow.touch_cart(record.uuid, now).await?;

        uow.commit().await?;

        let cart = Cart::from_parts(CartRecord { updated_at: now, ..record }, Vec::new());

        self.record("CART_CLEARED", &cart, "Cart cleared").await;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.create_cart_for_user", skip(self), fields(user = %user), err)]
    async fn create_cart_for_user(&self, user: UserUuid) -> Result<Cart, CartsServiceError> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        if uow.find_cart_for_user(user).await?.is_some() {
            return Err(CartsServiceError::CartAlreadyExists);
        }

        let record = create(uow.as_mut(), user, now).await?;

        uow.commit().await?;

        let cart = Cart::from_parts(record, Vec::new());

        self.record("CART_CREATED", &cart, "Cart created").await;

        Ok(cart)
    }

    #[tracing::instrument(name = "carts.service.list_carts", skip(self), err)]
    async fn list_carts(
        &self,
        query: CartListQuery,
    ) -> Result<Page<CartSummary>, CartsServiceError> {
        let mut uow = self.store.begin().await?;

        let page = uow.list_carts(&query).await?;

        uow.commit().await?;

        Ok(page)
    }
}

async fn load_cart(
    uow: &mut dyn UnitOfWork,
    record: CartRecord,
) -> Result<Cart, CartsServiceError> {
    let items = uow.cart_items(record.uuid).await?;

    Ok(Cart::from_parts(record, items))
}

async fn create(
    uow: &mut dyn UnitOfWork,
    user: UserUuid,
    now: Timestamp,
) -> Result<CartRecord, CartsServiceError> {
    let record = CartRecord {
        uuid: CartUuid::new(),
        user,
        created_at: now,
        updated_at: now,
    };

    match uow.create_cart(record).await {
        Ok(record) => Ok(record),
        Err(StoreError::AlreadyExists) => Err(CartsServiceError::CartAlreadyExists),
        Err(error) => Err(error.into()),
    }
}

async fn find_or_create(
    uow: &mut dyn UnitOfWork,
    user: UserUuid,
    now: Timestamp,
) -> Result<CartRecord, CartsServiceError> {
    match uow.find_cart_for_user(user).await? {
        Some(record) => Ok(record),
        None => create(uow, user, now).await,
    }
}

async fn load_product(
    uow: &mut dyn UnitOfWork,
    item: &CartItem,
) -> Result<ProductSnapshot, CartsServiceError> {
    uow.product(item.product, StockCheckMode::Advisory)
        .await?
        .ok_or(CartsServiceError::ProductNotFound)
}

/// Add `line` to the cart, summing into an existing line for the same product
/// and variant. The combined quantity is checked and the line re-priced at `now`.
async fn add_line(
    uow: &mut dyn UnitOfWork,
    cart: CartUuid,
    line: AddCartItem,
    now: Timestamp,
) -> Result<CartItem, CartsServiceError> {
    if line.quantity == 0 {
        return Err(QuantityError::BelowOne.into());
    }

    let product = uow
        .product(line.product, StockCheckMode::Advisory)
        .await?
        .ok_or(CartsServiceError::ProductNotFound)?;

    let variant = product.resolve_variant(line.variant)?;

    let existing = uow
        .cart_items(cart)
        .await?
        .into_iter()
        .find(|item| item.is_line_for(line.product, line.variant));

    let quantity = merge_quantities(existing.as_ref().map_or(0, |item| item.quantity), line.quantity)?;

    enforce_quantity_bounds(&product, variant, quantity)?;

    let price = unit_price(&product, variant, now);

    let item = match existing {
        Some(existing) => {
            uow.update_cart_item(existing.uuid, quantity, price, now)
                .await?
        }
        None => {
            uow.insert_cart_item(CartItem {
                uuid: CartItemUuid::new(),
                cart,
                product: product.uuid,
                variant: line.variant,
                variant_label: variant.map(|v| v.key.clone()),
                quantity,
                unit_price: price,
                created_at: now,
                updated_at: now,
            })
            .await?
        }
    };

    Ok(item)
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// The caller's cart, `None` when they have not started one.
    async fn get_cart(&self, principal: Principal) -> Result<Option<Cart>, CartsServiceError>;

    /// The caller's cart, created when missing.
    async fn get_or_create_cart(&self, principal: Principal) -> Result<Cart, CartsServiceError>;

    /// Add units of a product to the caller's cart.
    async fn add_item(
        &self,
        principal: Principal,
        item: AddCartItem,
    ) -> Result<Cart, CartsServiceError>;

    /// Replace the quantity of one line.
    async fn update_item(
        &self,
        principal: Principal,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError>;

    async fn remove_item(
        &self,
        principal: Principal,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Fold lines collected while signed out into the caller's cart.
    ///
    /// Either every line is merged or none is.
    async fn merge_guest_cart(
        &self,
        principal: Principal,
        lines: Vec<Option<GuestCartLine>>,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove every line from the caller's cart.
    async fn clear(&self, principal: Principal) -> Result<Cart, CartsServiceError>;

    /// Create an empty cart on behalf of `user`.
    async fn create_cart_for_user(&self, user: UserUuid) -> Result<Cart, CartsServiceError>;

    async fn list_carts(
        &self,
        query: CartListQuery,
    ) -> Result<Page<CartSummary>, CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use storefront::{
        catalog::{ProductUuid, VariantUuid},
        stock::MAX_LINE_QUANTITY,
    };
    use testresult::TestResult;

    use crate::{
        activity::{ActivityError, MockActivityRecorder},
        domain::carts::models::CartSort,
        errors::ErrorKind,
        pagination::PageRequest,
        test::TestContext,
    };

    use super::*;

    fn add(product: ProductUuid, quantity: u32) -> AddCartItem {
        AddCartItem {
            product,
            variant: None,
            quantity,
        }
    }

    #[tokio::test]
    async fn get_cart_without_cart_is_empty() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("empty@example.com").await;

        let cart = ctx.carts.get_cart(Principal::user(user)).await?;

        assert!(cart.is_none(), "no cart expected, got {cart:?}");

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        let ctx = TestContext::new();

        let result = ctx.carts.get_or_create_cart(Principal::Anonymous).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::Unauthorized),
            "expected Unauthorized, got {result:?}"
        );
    }

    #[tokio::test]
    async fn get_or_create_cart_is_idempotent() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("idem@example.com").await;

        let first = ctx.carts.get_or_create_cart(Principal::user(user)).await?;
        let second = ctx.carts.get_or_create_cart(Principal::user(user)).await?;

        assert_eq!(first.uuid, second.uuid);
        assert!(second.is_empty(), "new cart should be empty");

        Ok(())
    }

    #[tokio::test]
    async fn adding_same_product_twice_sums_quantity() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("sum@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Mug", Decimal::new(1250, 2)))
            .await;

        ctx.carts.add_item(Principal::user(user), add(product, 2)).await?;
        let cart = ctx.carts.add_item(Principal::user(user), add(product, 3)).await?;

        assert_eq!(cart.items.len(), 1, "one line per product");
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal(), Decimal::new(6250, 2));

        Ok(())
    }

    #[tokio::test]
    async fn combined_quantity_is_checked_against_stock() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("stock@example.com").await;
        let product = ctx
            .seed_product(
                ProductSnapshot::new(ProductUuid::new(), "Vase", Decimal::TEN).with_stock(4),
            )
            .await;

        ctx.carts.add_item(Principal::user(user), add(product, 3)).await?;
        let result = ctx.carts.add_item(Principal::user(user), add(product, 2)).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::Quantity(QuantityError::ExceedsStock { available: 4 }))
            ),
            "expected ExceedsStock, got {result:?}"
        );

        let cart = ctx.carts.get_cart(Principal::user(user)).await?;
        assert_eq!(cart.map(|c| c.total_quantity()), Some(3), "cart unchanged");

        Ok(())
    }

    #[tokio::test]
    async fn merged_quantity_past_line_maximum_is_out_of_range() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("huge@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Sand", Decimal::ONE))
            .await;

        ctx.carts
            .add_item(Principal::user(user), add(product, MAX_LINE_QUANTITY))
            .await?;
        let result = ctx.carts.add_item(Principal::user(user), add(product, 1)).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::OutOfRange),
            "expected OutOfRange, got {result:?}"
        );

        let cart = ctx.carts.get_cart(Principal::user(user)).await?;
        assert_eq!(
            cart.map(|c| c.total_quantity()),
            Some(u64::from(MAX_LINE_QUANTITY)),
            "cart unchanged"
        );

        Ok(())
    }

    #[tokio::test]
    async fn zero_quantity_is_invalid_request() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("zero@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Pen", Decimal::ONE))
            .await;

        let result = ctx.carts.add_item(Principal::user(user), add(product, 0)).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::InvalidRequest),
            "expected InvalidRequest, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_variant_is_rejected() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("variant@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Shirt", Decimal::TEN))
            .await;

        let result = ctx
            .carts
            .add_item(
                Principal::user(user),
                AddCartItem {
                    product,
                    variant: Some(VariantUuid::new()),
                    quantity: 1,
                },
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::VariantNotFound(_))),
            "expected VariantNotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn variant_lines_carry_the_variant_key() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("label@example.com").await;
        let variant = VariantUuid::new();
        let product = ctx
            .seed_product(
                ProductSnapshot::new(ProductUuid::new(), "Shirt", Decimal::from(20)).with_variant(
                    variant,
                    "XL",
                    Decimal::new(250, 2),
                    None,
                ),
            )
            .await;

        let cart = ctx
            .carts
            .add_item(
                Principal::user(user),
                AddCartItem {
                    product,
                    variant: Some(variant),
                    quantity: 1,
                },
            )
            .await?;

        let item = cart.items.first().ok_or("missing line")?;

        assert_eq!(item.variant_label.as_deref(), Some("XL"));
        assert_eq!(item.unit_price, Decimal::new(2250, 2));

        Ok(())
    }

    #[tokio::test]
    async fn update_item_below_minimum_is_out_of_range() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("minimum@example.com").await;
        let product = ctx
            .seed_product(
                ProductSnapshot::new(ProductUuid::new(), "Nails", Decimal::ONE)
                    .with_min_purchase(5),
            )
            .await;

        let cart = ctx.carts.add_item(Principal::user(user), add(product, 6)).await?;
        let item = cart.items.first().ok_or("missing line")?.uuid;

        let result = ctx.carts.update_item(Principal::user(user), item, 3).await;

        assert!(
            matches!(
                &result,
                Err(error @ CartsServiceError::Quantity(QuantityError::BelowMinimum { minimum: 5 }))
                    if error.kind() == ErrorKind::OutOfRange
            ),
            "expected BelowMinimum, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_item_to_zero_is_invalid_request() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("scenario-d@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Bread", Decimal::TWO))
            .await;

        let cart = ctx.carts.add_item(Principal::user(user), add(product, 2)).await?;
        let item = cart.items.first().ok_or("missing line")?.uuid;

        let result = ctx.carts.update_item(Principal::user(user), item, 0).await;

        match result {
            Err(error) => {
                assert_eq!(error.kind(), ErrorKind::InvalidRequest);
                assert_eq!(error.to_string(), "Quantity must be at least 1");
            }
            Ok(cart) => panic!("expected InvalidRequest, got {cart:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn update_item_reprices_at_current_price() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("reprice@example.com").await;
        let product = ProductSnapshot::new(ProductUuid::new(), "Tea", Decimal::from(8));
        let uuid = ctx.seed_product(product.clone()).await;

        let cart = ctx.carts.add_item(Principal::user(user), add(uuid, 1)).await?;
        let item = cart.items.first().ok_or("missing line")?.uuid;

        ctx.seed_product(ProductSnapshot {
            unit_price: Some(Decimal::from(9)),
            ..product
        })
        .await;

        let cart = ctx.carts.update_item(Principal::user(user), item, 2).await?;

        assert_eq!(cart.subtotal(), Decimal::from(18));

        Ok(())
    }

    #[tokio::test]
    async fn remove_unknown_item_is_not_found() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("remove@example.com").await;
        ctx.carts.get_or_create_cart(Principal::user(user)).await?;

        let result = ctx
            .carts
            .remove_item(Principal::user(user), CartItemUuid::new())
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::ItemNotFound)),
            "expected ItemNotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn merge_is_all_or_nothing() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("merge@example.com").await;
        let plenty = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Soap", Decimal::TWO))
            .await;
        let scarce = ctx
            .seed_product(
                ProductSnapshot::new(ProductUuid::new(), "Rare", Decimal::TEN).with_stock(1),
            )
            .await;

        let result = ctx
            .carts
            .merge_guest_cart(
                Principal::user(user),
                vec![Some(add(plenty, 2)), None, Some(add(scarce, 2))],
            )
            .await;

        assert!(result.is_err(), "merge should fail on the scarce line");

        let cart = ctx.carts.get_cart(Principal::user(user)).await?;
        assert!(cart.is_none(), "nothing from a failed merge persists: {cart:?}");

        let merged = ctx
            .carts
            .merge_guest_cart(
                Principal::user(user),
                vec![Some(add(plenty, 2)), None, Some(add(plenty, 1))],
            )
            .await?;

        assert_eq!(merged.total_quantity(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn clear_empties_the_cart() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("clear@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Jam", Decimal::ONE))
            .await;

        ctx.carts.add_item(Principal::user(user), add(product, 2)).await?;
        ctx.carts.clear(Principal::user(user)).await?;

        let cart = ctx.carts.get_cart(Principal::user(user)).await?.ok_or("no cart")?;

        assert!(cart.is_empty(), "cart should be empty after clear");

        Ok(())
    }

    #[tokio::test]
    async fn create_cart_for_user_twice_conflicts() -> TestResult {
        let ctx = TestContext::new();
        let user = ctx.seed_user("admin@example.com").await;

        ctx.carts.create_cart_for_user(user).await?;
        let result = ctx.carts.create_cart_for_user(user).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::Conflict),
            "expected Conflict, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_carts_sorts_by_subtotal() -> TestResult {
        let ctx = TestContext::new();
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Gum", Decimal::ONE))
            .await;

        for (email, quantity) in [("a@example.com", 1), ("b@example.com", 5), ("c@example.com", 3)] {
            let user = ctx.seed_user(email).await;
            ctx.carts.add_item(Principal::user(user), add(product, quantity)).await?;
        }

        let page = ctx
            .carts
            .list_carts(CartListQuery {
                search: None,
                sort: CartSort::SubtotalDesc,
                page: PageRequest::new(1, 2),
            })
            .await?;

        assert_eq!(page.total, 3);
        assert_eq!(
            page.items.iter().map(|s| s.user_email.as_str()).collect::<Vec<_>>(),
            vec!["b@example.com", "c@example.com"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn activity_failures_do_not_fail_the_mutation() -> TestResult {
        let mut recorder = MockActivityRecorder::new();
        recorder
            .expect_record()
            .returning(|_| Err(ActivityError::Sql(sqlx::Error::PoolClosed)));

        let ctx = TestContext::with_activity(Arc::new(recorder));
        let user = ctx.seed_user("audit@example.com").await;
        let product = ctx
            .seed_product(ProductSnapshot::new(ProductUuid::new(), "Cup", Decimal::ONE))
            .await;

        let cart = ctx.carts.add_item(Principal::user(user), add(product, 1)).await?;

        assert_eq!(cart.total_quantity(), 1);

        Ok(())
    }
}
