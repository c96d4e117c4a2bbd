use clap::{Args, Subcommand};
use storefront::uuids::UserUuid;
use storefront_app::{
    auth::Principal,
    config::DatabaseConfig,
    context::AppContext,
    domain::carts::models::{CartListQuery, CartSort},
    pagination::{DEFAULT_PER_PAGE, PageRequest},
};

use super::render;

#[derive(Debug, Args)]
pub(crate) struct CartsCommand {
    #[command(subcommand)]
    command: CartsSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartsSubcommand {
    /// List carts with their owner and totals
    List(ListCartsArgs),

    /// Show the lines of one user's cart
    Show(ShowCartArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ListCartsArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Case-insensitive match on the owner's email or name
    #[arg(long)]
    search: Option<String>,

    /// updated_desc, updated_asc, subtotal_desc, subtotal_asc, quantity_desc, quantity_asc
    #[arg(long, default_value = "updated_desc")]
    sort: CartSort,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,
}

#[derive(Debug, Args)]
pub(crate) struct ShowCartArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Owner of the cart
    #[arg(long)]
    user: UserUuid,
}

pub(crate) async fn run(command: CartsCommand) -> Result<(), String> {
    match command.command {
        CartsSubcommand::List(args) => list(args).await,
        CartsSubcommand::Show(args) => show(args).await,
    }
}

async fn connect(database: &DatabaseConfig) -> Result<AppContext, String> {
    AppContext::from_database_url(&database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

async fn list(args: ListCartsArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let page = context
        .carts
        .list_carts(CartListQuery {
            search: args.search,
            sort: args.sort,
            page: PageRequest::new(args.page, args.per_page),
        })
        .await
        .map_err(|error| format!("failed to list carts: {error}"))?;

    if page.items.is_empty() {
        println!("no carts found");
        return Ok(());
    }

    let table = render(
        ["cart", "owner", "lines", "quantity", "subtotal", "updated_at"],
        page.items.iter().map(|summary| {
            [
                summary.cart.to_string(),
                summary.user_email.clone(),
                summary.item_count.to_string(),
                summary.total_quantity.to_string(),
                summary.subtotal.to_string(),
                summary.updated_at.to_string(),
            ]
        }),
        2..5,
    );

    println!("{table}");
    println!(
        "page {} ({} carts, {} per page)",
        page.page, page.total, page.per_page
    );

    Ok(())
}

async fn show(args: ShowCartArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let cart = context
        .carts
        .get_cart(Principal::user(args.user))
        .await
        .map_err(|error| format!("failed to load cart: {error}"))?;

    let Some(cart) = cart.filter(|cart| !cart.is_empty()) else {
        println!("cart is empty");
        return Ok(());
    };

    let table = render(
        ["item", "product", "variant", "quantity", "unit_price", "line_total"],
        cart.items.iter().map(|item| {
            [
                item.uuid.to_string(),
                item.product.to_string(),
                item.variant_label.clone().unwrap_or_default(),
                item.quantity.to_string(),
                item.unit_price.to_string(),
                item.line_total().to_string(),
            ]
        }),
        3..6,
    );

    println!("{table}");
    println!("subtotal: {}", cart.subtotal());

    Ok(())
}
