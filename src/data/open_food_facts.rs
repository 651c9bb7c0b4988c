//! Open Food Facts API client
//!
//! Looks products up by barcode or free text in the crowd-sourced Open Food
//! Facts database. Nutrition is read from the per-100g `nutriments` keys;
//! records without a name or nutrition block are dropped.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    BarcodeProvider, FoodProduct, FoodProvider, FoodSource, DEFAULT_SERVING_SIZE,
    DEFAULT_SERVING_UNIT,
};

/// Base URL for the Open Food Facts API
pub const OPEN_FOOD_FACTS_BASE_URL: &str = "https://world.openfoodfacts.org";

/// Kilojoules per kilocalorie
const KJ_PER_KCAL: f64 = 4.184;

/// Milligrams per gram, for sodium reported in grams
const MG_PER_G: f64 = 1000.0;

/// `nutriments` keys read for each field, all per 100 g
mod keys {
    pub const ENERGY_KCAL: &str = "energy-kcal_100g";
    /// Energy in kJ, in order of preference
    pub const ENERGY_KJ: [&str; 2] = ["energy-kj_100g", "energy_100g"];
    pub const PROTEIN: &str = "proteins_100g";
    pub const CARBS: &str = "carbohydrates_100g";
    pub const FAT: &str = "fat_100g";
    pub const FIBER: &str = "fiber_100g";
    pub const SUGAR: &str = "sugars_100g";
    pub const SODIUM: &str = "sodium_100g";
}

/// Errors that can occur when querying Open Food Facts
#[derive(Debug, Error)]
pub enum OpenFoodFactsError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Open Food Facts returned HTTP {0}")]
    Status(StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Connection settings for Open Food Facts
#[derive(Debug, Clone)]
pub struct OpenFoodFactsConfig {
    /// Base URL of the API (overridable for testing)
    pub base_url: String,
}

impl Default for OpenFoodFactsConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_FOOD_FACTS_BASE_URL.to_string(),
        }
    }
}

/// Client for the Open Food Facts API
#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    config: OpenFoodFactsConfig,
}

impl Default for OpenFoodFactsClient {
    fn default() -> Self {
        Self::new(OpenFoodFactsConfig::default())
    }
}

impl OpenFoodFactsClient {
    /// Creates a new OpenFoodFactsClient with its own HTTP client
    pub fn new(config: OpenFoodFactsConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new OpenFoodFactsClient sharing an existing HTTP client
    pub fn with_client(client: Client, config: OpenFoodFactsConfig) -> Self {
        Self { client, config }
    }

    /// Looks up a product by barcode
    ///
    /// # Returns
    /// * `Ok(Some(FoodProduct))` - The mapped product
    /// * `Ok(None)` - If the barcode is unknown or the record is unmappable
    /// * `Err(OpenFoodFactsError)` - If the request fails or the response is malformed
    pub async fn try_search_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<FoodProduct>, OpenFoodFactsError> {
        let barcode = barcode.trim();
        if barcode.is_empty() || !barcode.bytes().all(|b| b.is_ascii_alphanumeric()) {
            debug!(barcode, "not a valid barcode");
            return Ok(None);
        }

        let url = format!("{}/api/v0/product/{}.json", self.config.base_url, barcode);
        debug!(barcode, "looking up Open Food Facts barcode");

        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(OpenFoodFactsError::Status(response.status()));
        }

        let text = response.text().await?;
        let lookup: ProductResponse = serde_json::from_str(&text)?;

        if lookup.status != 1 {
            debug!(barcode, "barcode not in Open Food Facts");
            return Ok(None);
        }

        Ok(lookup.product.and_then(map_product))
    }

    /// Searches products by free text
    ///
    /// # Returns
    /// * `Ok(Vec<FoodProduct>)` - Up to `limit` mappable products in API order
    /// * `Err(OpenFoodFactsError)` - If the request fails or the response is malformed
    pub async fn try_search_by_name(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FoodProduct>, OpenFoodFactsError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let page_size = limit.to_string();
        let url = format!("{}/cgi/search.pl", self.config.base_url);
        debug!(query, page_size = %page_size, "searching Open Food Facts");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OpenFoodFactsError::Status(response.status()));
        }

        let text = response.text().await?;
        let search: SearchResponse = serde_json::from_str(&text)?;

        Ok(search
            .products
            .into_iter()
            .filter_map(map_product)
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl FoodProvider for OpenFoodFactsClient {
    fn source(&self) -> FoodSource {
        FoodSource::OpenFoodFacts
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> Vec<FoodProduct> {
        match self.try_search_by_name(query, limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(query, error = %e, "Open Food Facts search failed");
                Vec::new()
            }
        }
    }

    /// Product ids are barcodes, so details are a barcode lookup
    async fn get_details(&self, id: &str) -> Option<FoodProduct> {
        self.search_by_barcode(id).await
    }
}

#[async_trait]
impl BarcodeProvider for OpenFoodFactsClient {
    async fn search_by_barcode(&self, barcode: &str) -> Option<FoodProduct> {
        match self.try_search_by_barcode(barcode).await {
            Ok(product) => product,
            Err(e) => {
                warn!(barcode, error = %e, "Open Food Facts barcode lookup failed");
                None
            }
        }
    }
}

/// Barcode lookup response
#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: i64,
    product: Option<OffProduct>,
}

/// Text search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

/// A product record; only the fields this crate reads
#[derive(Debug, Deserialize)]
struct OffProduct {
    code: Option<String>,
    #[serde(rename = "_id")]
    internal_id: Option<String>,
    product_name: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    image_front_url: Option<String>,
    nutriments: Option<Map<String, Value>>,
}

/// Reads a nutriment that may be encoded as a number or a numeric string
fn nutriment(nutriments: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match nutriments.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Energy in kcal, converting from kJ when no kcal value is present
fn energy_kcal(nutriments: &Map<String, Value>) -> Option<f64> {
    nutriment(nutriments, keys::ENERGY_KCAL).or_else(|| {
        keys::ENERGY_KJ
            .iter()
            .find_map(|key| nutriment(nutriments, key))
            .map(|kj| kj / KJ_PER_KCAL)
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Maps an Open Food Facts record into a FoodProduct
///
/// Returns `None` when the record has no product name or no nutriments.
fn map_product(product: OffProduct) -> Option<FoodProduct> {
    let name = non_empty(product.product_name)?;
    let nutriments = product.nutriments?;

    let code = non_empty(product.code);
    let id = code.clone().or(non_empty(product.internal_id))?;
    let brand = product
        .brands
        .as_deref()
        .and_then(|b| b.split(',').next())
        .map(str::to_string);

    Some(FoodProduct {
        id,
        source: FoodSource::OpenFoodFacts,
        name,
        brand: non_empty(brand),
        barcode: code,
        calories: energy_kcal(&nutriments).unwrap_or(0.0),
        protein: nutriment(&nutriments, keys::PROTEIN).unwrap_or(0.0),
        carbs: nutriment(&nutriments, keys::CARBS).unwrap_or(0.0),
        fat: nutriment(&nutriments, keys::FAT).unwrap_or(0.0),
        fiber: nutriment(&nutriments, keys::FIBER),
        sugar: nutriment(&nutriments, keys::SUGAR),
        sodium: nutriment(&nutriments, keys::SODIUM).map(|g| g * MG_PER_G),
        serving_size: DEFAULT_SERVING_SIZE,
        serving_unit: DEFAULT_SERVING_UNIT.to_string(),
        image: non_empty(product.image_url).or(non_empty(product.image_front_url)),
    })
}
