use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use storefront::{quote::QuoteTotals, uuids::UserUuid};
use storefront_app::{
    auth::Principal,
    config::DatabaseConfig,
    context::AppContext,
    domain::checkout::models::{Order, PlaceOrder, Shipping},
};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct CheckoutCommand {
    #[command(subcommand)]
    command: CheckoutSubcommand,
}

#[derive(Debug, Subcommand)]
enum CheckoutSubcommand {
    /// Price a user's cart without placing an order
    Quote(QuoteArgs),

    /// Turn a user's cart into an order
    Place(PlaceArgs),

    /// List a user's orders, newest first
    Orders(OrdersArgs),
}

#[derive(Debug, Args)]
pub(crate) struct QuoteArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Cart owner
    #[arg(long)]
    user: UserUuid,

    /// Coupon code; repeat to apply several in order
    #[arg(long = "coupon")]
    coupons: Vec<String>,

    /// Shipping charge added to the grand total
    #[arg(long, default_value_t = Decimal::ZERO)]
    shipping: Decimal,
}

#[derive(Debug, Args)]
pub(crate) struct PlaceArgs {
    #[command(flatten)]
    quote: QuoteArgs,

    /// Shipping details stored on the order, as a JSON object
    #[arg(long, value_parser = parse_details)]
    shipping_details: Option<Map<String, Value>>,

    /// Keep the cart lines after the order is placed
    #[arg(long)]
    keep_cart: bool,
}

#[derive(Debug, Args)]
pub(crate) struct OrdersArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Order owner
    #[arg(long)]
    user: UserUuid,
}

pub(crate) async fn run(command: CheckoutCommand) -> Result<(), String> {
    match command.command {
        CheckoutSubcommand::Quote(args) => quote(args).await,
        CheckoutSubcommand::Place(args) => place(args).await,
        CheckoutSubcommand::Orders(args) => orders(args).await,
    }
}

fn parse_details(raw: &str) -> Result<Map<String, Value>, String> {
    serde_json::from_str(raw).map_err(|error| format!("expected a JSON object: {error}"))
}

async fn connect(database: &DatabaseConfig) -> Result<AppContext, String> {
    AppContext::from_database_url(&database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

async fn quote(args: QuoteArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let quote = context
        .checkout
        .quote(Principal::user(args.user), args.coupons, args.shipping)
        .await
        .map_err(|error| format!("failed to quote cart: {error}"))?;

    let table = render(
        ["product", "quantity", "unit_price", "with_tax", "line_total"],
        quote.lines.iter().map(|line| {
            [
                line.product.to_string(),
                line.quantity.to_string(),
                line.unit_price.to_string(),
                line.tax_inclusive_unit_price.to_string(),
                line.line_total().to_string(),
            ]
        }),
        1..5,
    );

    println!("{table}");

    for coupon in &quote.coupons {
        println!("coupon {}: -{}", coupon.code, coupon.amount);
    }

    print_totals(&quote.totals);

    Ok(())
}

async fn place(args: PlaceArgs) -> Result<(), String> {
    let context = connect(&args.quote.database).await?;

    let order = context
        .checkout
        .place_order(
            Principal::user(args.quote.user),
            PlaceOrder {
                coupon_codes: args.quote.coupons,
                shipping: Shipping {
                    amount: args.quote.shipping,
                    details: args.shipping_details,
                },
                clear_cart: !args.keep_cart,
            },
        )
        .await
        .map_err(|error| format!("failed to place order: {error}"))?;

    print_order(&order);

    Ok(())
}

async fn orders(args: OrdersArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let orders = context
        .checkout
        .list_orders(Principal::user(args.user))
        .await
        .map_err(|error| format!("failed to list orders: {error}"))?;

    if orders.is_empty() {
        println!("no orders found for user {}", args.user);
        return Ok(());
    }

    let table = render(
        ["number", "status", "lines", "grand_total", "placed_at"],
        orders.iter().map(|order| {
            [
                order.number.clone(),
                order.status.as_str().to_string(),
                order.lines.len().to_string(),
                order.totals.grand_total.to_string(),
                order.placed_at.to_string(),
            ]
        }),
        2..4,
    );

    println!("{table}");

    Ok(())
}

fn print_order(order: &Order) {
    let table = render(
        ["product", "variant", "quantity", "unit_price", "line_total", "tax"],
        order.lines.iter().map(|line| {
            [
                line.product_name.clone(),
                line.variant_label.clone().unwrap_or_default(),
                line.quantity.to_string(),
                line.unit_price.to_string(),
                line.line_total.to_string(),
                line.line_tax.to_string(),
            ]
        }),
        2..6,
    );

    println!("order {} ({})", order.number, order.status.as_str());
    println!("{table}");

    for coupon in &order.coupons {
        println!("coupon {}: -{}", coupon.code, coupon.amount);
    }

    print_totals(&order.totals);
}

fn print_totals(totals: &QuoteTotals) {
    println!("product total:  {}", totals.product_total);
    println!("tax total:      {}", totals.tax_total);
    println!("discount total: {}", totals.discount_total);
    println!("shipping total: {}", totals.shipping_total);
    println!("grand total:    {}", totals.grand_total);
}
