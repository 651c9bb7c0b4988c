//! USDA FoodData Central API client
//!
//! Searches the government nutrition database and maps its food records into
//! `FoodProduct`. Nutrients are identified by numeric nutrient ids; the ids
//! this crate reads are listed in `NUTRIENT_IDS`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    FoodProduct, FoodProvider, FoodSource, DEFAULT_SERVING_SIZE, DEFAULT_SERVING_UNIT,
};

/// Base URL for the FoodData Central API
pub const USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

/// Key accepted by FoodData Central for low-volume anonymous use
pub const USDA_DEMO_KEY: &str = "DEMO_KEY";

/// Data types requested from the search endpoint
const SEARCH_DATA_TYPES: &str = "Foundation,SR Legacy,Branded";

/// Largest page size the search endpoint accepts
const MAX_PAGE_SIZE: usize = 200;

/// Nutrients read from FoodData Central records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Energy,
    Protein,
    Fat,
    Carbs,
    Fiber,
    Sugar,
    Sodium,
}

/// FoodData Central nutrient ids, all reported per 100 g
///
/// Energy is kcal, sodium mg, the rest grams.
pub const NUTRIENT_IDS: [(Nutrient, u32); 7] = [
    (Nutrient::Energy, 1008),
    (Nutrient::Protein, 1003),
    (Nutrient::Fat, 1004),
    (Nutrient::Carbs, 1005),
    (Nutrient::Fiber, 1079),
    (Nutrient::Sugar, 2000),
    (Nutrient::Sodium, 1093),
];

/// Returns the FoodData Central id for `nutrient`
pub fn nutrient_id(nutrient: Nutrient) -> u32 {
    NUTRIENT_IDS
        .iter()
        .find(|(n, _)| *n == nutrient)
        .map(|(_, id)| *id)
        .unwrap_or_default()
}

/// Errors that can occur when querying FoodData Central
#[derive(Debug, Error)]
pub enum UsdaError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("USDA API returned HTTP {0}")]
    Status(StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Connection settings for FoodData Central
#[derive(Debug, Clone)]
pub struct UsdaConfig {
    /// API key sent with every request
    pub api_key: String,
    /// Base URL of the API (overridable for testing)
    pub base_url: String,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: USDA_DEMO_KEY.to_string(),
            base_url: USDA_BASE_URL.to_string(),
        }
    }
}

impl UsdaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

/// Client for the USDA FoodData Central API
#[derive(Debug, Clone)]
pub struct UsdaClient {
    client: Client,
    config: UsdaConfig,
}

impl UsdaClient {
    /// Creates a new UsdaClient with its own HTTP client
    pub fn new(config: UsdaConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a new UsdaClient sharing an existing HTTP client
    pub fn with_client(client: Client, config: UsdaConfig) -> Self {
        Self { client, config }
    }

    /// Searches foods by free text
    ///
    /// # Returns
    /// * `Ok(Vec<FoodProduct>)` - Up to `limit` mapped products in API order
    /// * `Err(UsdaError)` - If the request fails or the response is malformed
    pub async fn try_search_by_name(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FoodProduct>, UsdaError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let page_size = limit.min(MAX_PAGE_SIZE).to_string();
        let url = format!("{}/foods/search", self.config.base_url);
        debug!(query, page_size = %page_size, "searching USDA");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("query", query),
                ("pageSize", page_size.as_str()),
                ("dataType", SEARCH_DATA_TYPES),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UsdaError::Status(response.status()));
        }

        let text = response.text().await?;
        let search: SearchResponse = serde_json::from_str(&text)?;

        Ok(search
            .foods
            .into_iter()
            .filter_map(map_food)
            .take(limit)
            .collect())
    }

    /// Fetches a single food by FDC id
    ///
    /// # Returns
    /// * `Ok(Some(FoodProduct))` - The mapped food
    /// * `Ok(None)` - If the id is not a valid FDC id or the food does not exist
    /// * `Err(UsdaError)` - If the request fails or the response is malformed
    pub async fn try_get_details(&self, fdc_id: &str) -> Result<Option<FoodProduct>, UsdaError> {
        if fdc_id.is_empty() || !fdc_id.bytes().all(|b| b.is_ascii_digit()) {
            debug!(fdc_id, "not a numeric FDC id");
            return Ok(None);
        }

        let url = format!("{}/food/{}", self.config.base_url, fdc_id);
        debug!(fdc_id, "fetching USDA food details");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(UsdaError::Status(response.status()));
        }

        let text = response.text().await?;
        let food: UsdaFood = serde_json::from_str(&text)?;

        Ok(map_food(food))
    }
}

#[async_trait]
impl FoodProvider for UsdaClient {
    fn source(&self) -> FoodSource {
        FoodSource::Usda
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> Vec<FoodProduct> {
        match self.try_search_by_name(query, limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(query, error = %e, "USDA search failed");
                Vec::new()
            }
        }
    }

    async fn get_details(&self, id: &str) -> Option<FoodProduct> {
        match self.try_get_details(id).await {
            Ok(product) => product,
            Err(e) => {
                warn!(fdc_id = id, error = %e, "USDA details lookup failed");
                None
            }
        }
    }
}

/// Search response from FoodData Central
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

/// A food record as returned by both the search and details endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    fdc_id: u64,
    description: Option<String>,
    brand_owner: Option<String>,
    brand_name: Option<String>,
    gtin_upc: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

/// One nutrient measurement
///
/// Search results use the flat `{nutrientId, value}` shape, the details
/// endpoint nests the id as `{nutrient: {id}, amount}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    nutrient_id: Option<u32>,
    value: Option<f64>,
    nutrient: Option<NutrientRef>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NutrientRef {
    id: Option<u32>,
}

impl UsdaNutrient {
    fn id(&self) -> Option<u32> {
        self.nutrient_id
            .or_else(|| self.nutrient.as_ref().and_then(|n| n.id))
    }

    fn amount(&self) -> Option<f64> {
        self.value.or(self.amount)
    }
}

/// Looks up `nutrient` in a food's measurement list
fn nutrient_value(nutrients: &[UsdaNutrient], nutrient: Nutrient) -> Option<f64> {
    let id = nutrient_id(nutrient);
    nutrients
        .iter()
        .find(|n| n.id() == Some(id))
        .and_then(UsdaNutrient::amount)
}

/// Maps a FoodData Central record into a FoodProduct
///
/// Returns `None` for records without a description. Missing calories and
/// macronutrients default to 0.
fn map_food(food: UsdaFood) -> Option<FoodProduct> {
    let name = food.description.filter(|d| !d.trim().is_empty())?;
    let nutrients = &food.food_nutrients;
    let required = |n| nutrient_value(nutrients, n).unwrap_or(0.0);

    Some(FoodProduct {
        id: food.fdc_id.to_string(),
        source: FoodSource::Usda,
        name,
        brand: food.brand_owner.or(food.brand_name),
        barcode: food.gtin_upc,
        calories: required(Nutrient::Energy),
        protein: required(Nutrient::Protein),
        carbs: required(Nutrient::Carbs),
        fat: required(Nutrient::Fat),
        fiber: nutrient_value(nutrients, Nutrient::Fiber),
        sugar: nutrient_value(nutrients, Nutrient::Sugar),
        sodium: nutrient_value(nutrients, Nutrient::Sodium),
        serving_size: DEFAULT_SERVING_SIZE,
        serving_unit: DEFAULT_SERVING_UNIT.to_string(),
        image: None,
    })
}
