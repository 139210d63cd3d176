//! Command-line driver for the storefront core.
//!
//! Exists to exercise the cache, mutations and pricing pipeline against a
//! live API from a terminal; the real frontends consume `kiosk-core`
//! directly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use kiosk_core::models::{Cart, LineRef};
use kiosk_core::mutations::AddToCart;
use kiosk_core::{CoreConfig, CoreRuntime, PriceBreakdown};

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(about = "Storefront client core CLI")]
struct Cli {
    /// API base URL
    #[arg(long, env = "KIOSK_API_URL")]
    api_url: Option<String>,

    /// Data directory for the session cache
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print raw JSON instead of formatted output
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart with its price breakdown
    Cart,

    /// Add a product to the cart
    Add {
        product: u64,
        /// Variant id
        #[arg(long)]
        variant: Option<u64>,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// Displayed unit price, used for the optimistic line until the
        /// server answers
        #[arg(long)]
        price: Decimal,
    },

    /// Change a cart line's quantity (0 removes it)
    Qty { item: u64, quantity: i64 },

    /// Remove a cart line
    Rm { item: u64 },

    /// Show the wishlist
    Wishlist,

    /// Toggle a product's wishlist membership
    Wish { product: u64 },

    /// List reviews for a product
    Reviews {
        product: u64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = CoreConfig::default();
    if let Some(api_url) = cli.api_url {
        config.api_base = api_url.trim_end_matches('/').to_string();
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let runtime = CoreRuntime::new(config).context("failed to initialize runtime")?;
    tracing::debug!(api = %runtime.config().api_base, "runtime ready");

    let result = run(&runtime, cli.command, cli.json).await;
    runtime.shutdown();
    result
}

async fn run(runtime: &CoreRuntime, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Cart => {
            let cart = runtime.cart().await?;
            print_cart(runtime, &cart, json);
        }
        Commands::Add {
            product,
            variant,
            quantity,
            price,
        } => {
            let cart = runtime
                .add_to_cart(AddToCart {
                    product_id: product,
                    variant_id: variant,
                    quantity,
                    price,
                    retail_price: None,
                })
                .await?;
            print_cart(runtime, &cart, json);
        }
        Commands::Qty { item, quantity } => {
            let cart = runtime
                .update_quantity(LineRef::Server(item), quantity)
                .await?;
            print_cart(runtime, &cart, json);
        }
        Commands::Rm { item } => {
            let cart = runtime.remove_item(LineRef::Server(item)).await?;
            print_cart(runtime, &cart, json);
        }
        Commands::Wishlist => {
            let items = runtime.wishlist().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("wishlist is empty");
            } else {
                for item in items {
                    println!("#{:<6} product {:<8} added {}", item.id, item.product_id, item.added_at);
                }
            }
        }
        Commands::Wish { product } => {
            let member = runtime.toggle_wishlist(product).await?;
            println!(
                "product {product}: {}",
                if member { "added to wishlist" } else { "removed from wishlist" }
            );
        }
        Commands::Reviews { product, page } => {
            let reviews = runtime.reviews(product, page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reviews)?);
            } else {
                println!("{} review(s) for product {product}, page {page}", reviews.count);
                for review in &reviews.results {
                    println!(
                        "#{:<6} {}/5 by {:<12} helpful {:<4} {}",
                        review.id,
                        review.rating,
                        review.author,
                        review.helpful_count,
                        review.title.as_deref().unwrap_or(&review.body)
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_cart(runtime: &CoreRuntime, cart: &Cart, json: bool) {
    if json {
        if let Ok(rendered) = serde_json::to_string_pretty(cart) {
            println!("{rendered}");
        }
        return;
    }

    if cart.is_empty() {
        println!("cart is empty");
        return;
    }

    for item in &cart.items {
        let id = item
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(pending)".to_string());
        let was = item
            .retail_price_at_time
            .filter(|retail| *retail > item.price_at_time)
            .map(|retail| format!("  (was {retail})"))
            .unwrap_or_default();
        println!(
            "#{:<6} product {:<8} x{:<3} @ {}{}",
            id, item.product_id, item.quantity, item.price_at_time, was
        );
    }

    if let Some(breakdown) = runtime.price_breakdown() {
        print_breakdown(&breakdown);
    }
}

fn print_breakdown(breakdown: &PriceBreakdown) {
    println!();
    println!("subtotal            {:>10}", breakdown.subtotal);
    if !breakdown.total_discount.is_zero() {
        println!("discount            {:>10}", -breakdown.total_discount);
        println!("after discount      {:>10}", breakdown.discounted_subtotal);
    }
    println!("shipping            {:>10}", breakdown.shipping);
    println!("vat                 {:>10}", breakdown.vat);
    println!("total               {:>10}", breakdown.total);
}
