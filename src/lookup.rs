//! Food lookup facade
//!
//! `FoodLookup` is the single entry point callers use to find food products.
//! It routes each request to the right provider(s), memoizes results through
//! the cache, and manages the user's custom products. No operation here
//! returns an error: failures surface as `None` or an empty list and are
//! visible only in the logs.

use std::sync::Arc;
use tracing::debug;

use crate::cache::CacheManager;
use crate::custom::CustomProductStore;
use crate::data::{BarcodeProvider, FoodProduct, FoodProvider, FoodSource, NewFoodProduct};

/// Result count used when the caller does not choose one
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Orchestrates the government and crowd-sourced providers behind one API
#[derive(Clone)]
pub struct FoodLookup {
    /// Nutrient database searched by name only
    government: Arc<dyn FoodProvider>,
    /// Product database searched by name and barcode
    crowd: Arc<dyn BarcodeProvider>,
    cache: CacheManager,
    custom: Arc<CustomProductStore>,
}

impl FoodLookup {
    pub fn new(
        government: Arc<dyn FoodProvider>,
        crowd: Arc<dyn BarcodeProvider>,
        cache: CacheManager,
        custom: CustomProductStore,
    ) -> Self {
        Self {
            government,
            crowd,
            cache,
            custom: Arc::new(custom),
        }
    }

    fn barcode_key(barcode: &str) -> String {
        format!("barcode_{}", barcode)
    }

    fn name_search_key(query: &str, limit: usize) -> String {
        format!("name_search_{}_{}", query, limit)
    }

    fn product_key(id: &str, source: FoodSource) -> String {
        format!("product_{}_{}", source, id)
    }

    /// Looks up a product by barcode
    ///
    /// Only the crowd-sourced provider indexes barcodes. Misses are not
    /// cached, so a product added upstream later will be found.
    pub async fn search_by_barcode(&self, barcode: &str) -> Option<FoodProduct> {
        let key = Self::barcode_key(barcode);

        if let Some(product) = self.cache.get_cached::<FoodProduct>(&key).await {
            return Some(product);
        }

        let product = self.crowd.search_by_barcode(barcode).await?;
        self.cache.set_cached(&key, &product).await;
        Some(product)
    }

    /// Searches both providers by name
    ///
    /// Both requests run concurrently. Government results come first, then
    /// crowd-sourced results, each in the provider's own order; the combined
    /// list is truncated to `limit`. Duplicates across providers are kept.
    pub async fn search_by_name(&self, query: &str, limit: usize) -> Vec<FoodProduct> {
        let key = Self::name_search_key(query, limit);

        if let Some(cached) = self.cache.get_cached::<Vec<FoodProduct>>(&key).await {
            if !cached.is_empty() {
                return cached;
            }
        }

        let (government, crowd) = futures::join!(
            self.government.search_by_name(query, limit),
            self.crowd.search_by_name(query, limit)
        );
        debug!(
            query,
            government = government.len(),
            crowd = crowd.len(),
            "name search results"
        );

        let mut results = government;
        results.extend(crowd);
        results.truncate(limit);

        self.cache.set_cached(&key, &results).await;
        results
    }

    /// Fetches one product from the provider whose `source()` matches
    ///
    /// Custom products are read straight from the local list and are not
    /// cached.
    pub async fn get_product_details(&self, id: &str, source: FoodSource) -> Option<FoodProduct> {
        if source == FoodSource::Custom {
            return self.custom.get(id).await;
        }

        let key = Self::product_key(id, source);
        if let Some(product) = self.cache.get_cached::<FoodProduct>(&key).await {
            return Some(product);
        }

        let found = if self.government.source() == source {
            self.government.get_details(id).await
        } else if self.crowd.source() == source {
            self.crowd.get_details(id).await
        } else {
            debug!(id, %source, "no provider for source");
            None
        };
        let product = found?;

        self.cache.set_cached(&key, &product).await;
        Some(product)
    }

    /// Creates and saves a custom product
    pub async fn create_custom_product(&self, product: NewFoodProduct) -> FoodProduct {
        self.custom.create(product).await
    }

    /// Returns all custom products
    pub async fn get_custom_products(&self) -> Vec<FoodProduct> {
        self.custom.list().await
    }

    /// Deletes a custom product, returning whether it existed
    pub async fn delete_custom_product(&self, id: &str) -> bool {
        self.custom.delete(id).await
    }
}
