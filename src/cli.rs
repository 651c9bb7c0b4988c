//! Command-line interface parsing for foodlens
//!
//! This module handles parsing of CLI arguments using clap and the plain-text
//! rendering of products for terminal output.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::{FoodProduct, FoodSource, NewFoodProduct};
use crate::lookup::DEFAULT_SEARCH_LIMIT;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified source name is not recognized
    #[error("Invalid source: '{0}'. Valid sources: usda, off, custom")]
    InvalidSource(String),

    /// The result limit is not a positive whole number
    #[error("Invalid limit: '{0}'. Limit must be a whole number of at least 1")]
    InvalidLimit(String),

    /// An amount or nutrient value is not a finite, non-negative number
    #[error("Invalid quantity: '{0}'. Expected a finite number of at least 0")]
    InvalidQuantity(String),
}

/// foodlens - Look up food nutrition by barcode or name
#[derive(Parser, Debug)]
#[command(name = "foodlens")]
#[command(about = "Food nutrition lookup across USDA FoodData Central and Open Food Facts")]
#[command(version)]
pub struct Cli {
    /// Directory for the cache and custom products (overrides FOODLENS_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a product by its barcode (Open Food Facts)
    Barcode {
        /// EAN/UPC barcode
        code: String,
    },

    /// Search USDA and Open Food Facts by name
    ///
    /// Examples:
    ///   foodlens search "peanut butter"
    ///   foodlens search apple --limit 5
    Search {
        /// Free-text food name
        query: String,

        /// Maximum number of results
        #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT, value_parser = parse_limit_arg)]
        limit: usize,
    },

    /// Show a single product from a given source
    Details {
        /// Product id (FDC id, barcode, or custom id)
        id: String,

        /// Source the id belongs to: usda, off, or custom
        #[arg(long, short, value_parser = parse_source_arg)]
        source: FoodSource,

        /// Scale nutrients to this amount of the serving unit
        #[arg(long, value_name = "AMOUNT", value_parser = parse_quantity_arg)]
        amount: Option<f64>,
    },

    /// Manage custom products
    #[command(subcommand)]
    Custom(CustomCommand),
}

#[derive(Subcommand, Debug)]
pub enum CustomCommand {
    /// Create a custom product
    Add(AddCustomArgs),
    /// List custom products
    List,
    /// Delete a custom product by id
    Delete {
        id: String,
    },
}

/// Nutrition facts for a new custom product
#[derive(Args, Debug)]
pub struct AddCustomArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub barcode: Option<String>,
    /// Energy in kcal per serving
    #[arg(long, value_parser = parse_quantity_arg)]
    pub calories: f64,
    /// Protein in grams per serving
    #[arg(long, value_parser = parse_quantity_arg)]
    pub protein: f64,
    /// Carbohydrates in grams per serving
    #[arg(long, value_parser = parse_quantity_arg)]
    pub carbs: f64,
    /// Fat in grams per serving
    #[arg(long, value_parser = parse_quantity_arg)]
    pub fat: f64,
    #[arg(long, value_parser = parse_quantity_arg)]
    pub fiber: Option<f64>,
    #[arg(long, value_parser = parse_quantity_arg)]
    pub sugar: Option<f64>,
    /// Sodium in milligrams per serving
    #[arg(long, value_parser = parse_quantity_arg)]
    pub sodium: Option<f64>,
    #[arg(long, default_value_t = 100.0, value_parser = parse_quantity_arg)]
    pub serving_size: f64,
    #[arg(long, default_value = "g")]
    pub serving_unit: String,
    /// Image URL
    #[arg(long)]
    pub image: Option<String>,
}

impl AddCustomArgs {
    pub fn into_new_product(self) -> NewFoodProduct {
        NewFoodProduct {
            name: self.name,
            brand: self.brand,
            barcode: self.barcode,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sugar: self.sugar,
            sodium: self.sodium,
            serving_size: self.serving_size,
            serving_unit: self.serving_unit,
            image: self.image,
        }
    }
}

/// Parses a source argument into a FoodSource.
///
/// # Returns
/// * `Ok(FoodSource)` if the string names a known source
/// * `Err(CliError::InvalidSource)` otherwise
pub fn parse_source_arg(s: &str) -> Result<FoodSource, CliError> {
    FoodSource::from_str(s).ok_or_else(|| CliError::InvalidSource(s.to_string()))
}

/// Parses a positive result limit
pub fn parse_limit_arg(s: &str) -> Result<usize, CliError> {
    s.parse::<usize>()
        .ok()
        .filter(|limit| *limit > 0)
        .ok_or_else(|| CliError::InvalidLimit(s.to_string()))
}

/// Parses a finite, non-negative quantity
///
/// Rejects `nan`, `inf` and negative values, which have no meaning as an
/// amount or nutrient and cannot be stored as JSON numbers.
pub fn parse_quantity_arg(s: &str) -> Result<f64, CliError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| CliError::InvalidQuantity(s.to_string()))
}

/// Renders a product as a single line of text
pub fn format_product(product: &FoodProduct) -> String {
    let mut line = product.name.clone();
    if let Some(brand) = &product.brand {
        line.push_str(&format!(" ({})", brand));
    }
    line.push_str(&format!(
        " [{} {}] {:.0} kcal | protein {:.1}g | carbs {:.1}g | fat {:.1}g",
        product.source, product.id, product.calories, product.protein, product.carbs, product.fat
    ));
    if let Some(sodium) = product.sodium {
        line.push_str(&format!(" | sodium {:.0}mg", sodium));
    }
    line.push_str(&format!(
        " per {} {}",
        product.serving_size, product.serving_unit
    ));
    line
}
