use clap::{Args, Subcommand};
use jiff::Timestamp;
use storefront::{
    coupons::{CouponKind, CouponState},
    discounts::DiscountKind,
};
use storefront_app::{
    config::DatabaseConfig,
    context::AppContext,
    domain::coupons::models::{CouponListQuery, CouponSummary},
    pagination::{DEFAULT_PER_PAGE, PageRequest},
};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct CouponsCommand {
    #[command(subcommand)]
    command: CouponsSubcommand,
}

#[derive(Debug, Subcommand)]
enum CouponsSubcommand {
    /// List coupons with their state at the time of the call
    List(ListCouponsArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ListCouponsArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Only coupons of this kind (PRODUCT, CART_VALUE, NEW_SIGNUP)
    #[arg(long)]
    kind: Option<CouponKind>,

    /// Only coupons with this discount kind (FLAT, PERCENTAGE)
    #[arg(long)]
    discount_kind: Option<DiscountKind>,

    /// Only coupons in this state (ENABLED, EXPIRED, DISABLED)
    #[arg(long)]
    state: Option<CouponState>,

    /// Case-insensitive match on name or code
    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,
}

pub(crate) async fn run(command: CouponsCommand) -> Result<(), String> {
    match command.command {
        CouponsSubcommand::List(args) => list(args).await,
    }
}

async fn list(args: ListCouponsArgs) -> Result<(), String> {
    let context = AppContext::from_database_url(&args.database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let page = context
        .coupons
        .list_coupons(CouponListQuery {
            kind: args.kind,
            discount_kind: args.discount_kind,
            state: args.state,
            search: args.search,
            page: PageRequest::new(args.page, args.per_page),
        })
        .await
        .map_err(|error| format!("failed to list coupons: {error}"))?;

    if page.items.is_empty() {
        println!("no coupons found");
        return Ok(());
    }

    let table = render(
        ["code", "name", "kind", "discount", "state", "ends_at"],
        page.items.iter().map(summary_row),
        3..4,
    );

    println!("{table}");
    println!(
        "page {} ({} coupons, {} per page)",
        page.page, page.total, page.per_page
    );

    Ok(())
}

fn summary_row(summary: &CouponSummary) -> [String; 6] {
    let coupon = &summary.record.coupon;

    [
        summary.record.code.clone(),
        summary.record.name.clone(),
        coupon.kind().to_string(),
        format!("{} {}", coupon.discount.value, coupon.discount.kind),
        summary.state.to_string(),
        format_timestamp(coupon.ends_at),
    ]
}

fn format_timestamp(at: Timestamp) -> String {
    at.strftime("%Y-%m-%d %H:%M").to_string()
}
