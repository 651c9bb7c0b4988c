//! Core data models for food lookup
//!
//! This module contains the unified `FoodProduct` record every provider maps
//! into, and the provider traits the lookup facade orchestrates.

pub mod open_food_facts;
pub mod usda;

pub use open_food_facts::{OpenFoodFactsClient, OpenFoodFactsConfig, OpenFoodFactsError};
pub use usda::{UsdaClient, UsdaConfig, UsdaError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default serving basis for per-100g provider data
pub const DEFAULT_SERVING_SIZE: f64 = 100.0;

/// Default serving unit
pub const DEFAULT_SERVING_UNIT: &str = "g";

/// Where a product record came from
///
/// Product ids are only unique within a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodSource {
    /// USDA FoodData Central
    #[serde(rename = "USDA")]
    Usda,
    /// Open Food Facts
    OpenFoodFacts,
    /// Created locally by the user
    Custom,
}

impl FoodSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodSource::Usda => "USDA",
            FoodSource::OpenFoodFacts => "OpenFoodFacts",
            FoodSource::Custom => "Custom",
        }
    }

    /// Parses a source name, accepting the canonical names and short aliases
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "usda" | "fdc" => Some(FoodSource::Usda),
            "openfoodfacts" | "open-food-facts" | "off" => Some(FoodSource::OpenFoodFacts),
            "custom" => Some(FoodSource::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for FoodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A nutrition-bearing item from any source
///
/// Nutrient values are per serving (`serving_size` `serving_unit`). Energy
/// is in kcal, sodium in mg, everything else in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodProduct {
    /// Provider-specific identifier
    pub id: String,
    pub source: FoodSource,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    pub serving_size: f64,
    pub serving_unit: String,
    /// Product image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl FoodProduct {
    /// Returns a copy with nutrients scaled from the serving size to `amount`
    /// of the same unit
    ///
    /// A zero or non-finite serving size cannot be scaled from, and a negative
    /// or non-finite amount cannot be scaled to, so the product is returned
    /// unchanged.
    pub fn scaled_to(&self, amount: f64) -> FoodProduct {
        if !self.serving_size.is_finite()
            || self.serving_size <= 0.0
            || !amount.is_finite()
            || amount < 0.0
        {
            return self.clone();
        }

        let factor = amount / self.serving_size;
        let scale = |v: f64| v * factor;

        FoodProduct {
            calories: scale(self.calories),
            protein: scale(self.protein),
            carbs: scale(self.carbs),
            fat: scale(self.fat),
            fiber: self.fiber.map(scale),
            sugar: self.sugar.map(scale),
            sodium: self.sodium.map(scale),
            serving_size: amount,
            ..self.clone()
        }
    }
}

/// A user-authored product before it is given an id and source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodProduct {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: Option<f64>,
    #[serde(default)]
    pub sugar: Option<f64>,
    #[serde(default)]
    pub sodium: Option<f64>,
    pub serving_size: f64,
    pub serving_unit: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewFoodProduct {
    /// Whether every nutrient and the serving size is a finite number
    pub fn is_finite(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat, self.serving_size]
            .iter()
            .chain(self.fiber.iter())
            .chain(self.sugar.iter())
            .chain(self.sodium.iter())
            .all(|v| v.is_finite())
    }

    /// Attaches an id and source, producing a full record
    pub fn into_product(self, id: String, source: FoodSource) -> FoodProduct {
        FoodProduct {
            id,
            source,
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

/// A remote food database that can be searched by name
///
/// Implementations never fail: provider errors are logged and reported as
/// an empty result.
#[async_trait]
pub trait FoodProvider: Send + Sync {
    /// Which source this provider's records carry
    fn source(&self) -> FoodSource;

    /// Searches by free text, returning at most `limit` products in the
    /// provider's own ranking
    async fn search_by_name(&self, query: &str, limit: usize) -> Vec<FoodProduct>;

    /// Fetches one product by its provider id
    async fn get_details(&self, id: &str) -> Option<FoodProduct>;
}

/// A food database that additionally indexes products by barcode
#[async_trait]
pub trait BarcodeProvider: FoodProvider {
    async fn search_by_barcode(&self, barcode: &str) -> Option<FoodProduct>;
}
