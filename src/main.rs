//! foodlens - Look up food nutrition by barcode or name
//!
//! A command-line front end over the foodlens library: searches USDA
//! FoodData Central and Open Food Facts, caches results locally, and manages
//! custom products.

use std::process::ExitCode;

use clap::Parser;

use foodlens::cli::{format_product, Cli, Command, CustomCommand};
use foodlens::config::Config;
use foodlens::data::FoodProduct;

/// Installs the tracing subscriber
///
/// Logs go to stderr so stdout stays clean for results. `RUST_LOG` sets the
/// filter and `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "foodlens=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Prints a list of products as text lines or a JSON array
fn print_products(products: &[FoodProduct], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
    } else {
        for product in products {
            println!("{}", format_product(product));
        }
    }
    Ok(())
}

/// Prints a single product as a text line or a JSON object
fn print_product(product: &FoodProduct, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(product)?);
    } else {
        println!("{}", format_product(product));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let lookup = config.build_lookup()?;

    match cli.command {
        Command::Barcode { code } => match lookup.search_by_barcode(&code).await {
            Some(product) => print_product(&product, cli.json)?,
            None => eprintln!("No product found for barcode {}", code),
        },
        Command::Search { query, limit } => {
            let products = lookup.search_by_name(&query, limit).await;
            if products.is_empty() && !cli.json {
                eprintln!("No products found for '{}'", query);
            } else {
                print_products(&products, cli.json)?;
            }
        }
        Command::Details { id, source, amount } => {
            match lookup.get_product_details(&id, source).await {
                Some(product) => {
                    let product = match amount {
                        Some(amount) => product.scaled_to(amount),
                        None => product,
                    };
                    print_product(&product, cli.json)?;
                }
                None => eprintln!("No {} product found with id {}", source, id),
            }
        }
        Command::Custom(CustomCommand::Add(args)) => {
            let product = lookup.create_custom_product(args.into_new_product()).await;
            print_product(&product, cli.json)?;
        }
        Command::Custom(CustomCommand::List) => {
            let products = lookup.get_custom_products().await;
            print_products(&products, cli.json)?;
        }
        Command::Custom(CustomCommand::Delete { id }) => {
            if lookup.delete_custom_product(&id).await {
                println!("Deleted {}", id);
            } else {
                eprintln!("No custom product with id {}", id);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
