use std::ops::Range;

use clap::{Parser, Subcommand};
use storefront_app::config::LoggingConfig;
use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

mod carts;
mod checkout;
mod coupons;
mod db;

#[derive(Debug, Parser)]
#[command(name = "storefront-app", about = "Storefront administration CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Coupons(coupons::CouponsCommand),
    Carts(carts::CartsCommand),
    Checkout(checkout::CheckoutCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Coupons(command) => coupons::run(command).await,
            Commands::Carts(command) => carts::run(command).await,
            Commands::Checkout(command) => checkout::run(command).await,
        }
    }
}

/// Render rows under `header` with the `numeric` columns right-aligned.
fn render<const N: usize>(
    header: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
    numeric: Range<usize>,
) -> Table {
    let mut builder = Builder::default();
    builder.push_record(header);

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::new(numeric), Alignment::right());

    table
}
