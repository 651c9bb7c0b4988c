//! User-authored food products
//!
//! Custom products share the `FoodProduct` shape with `source = Custom` and
//! are persisted together as one JSON array under a fixed store key.

use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::data::{FoodProduct, FoodSource, NewFoodProduct};
use crate::store::{KeyValueStore, StoreError};

/// Store key holding the custom product list
pub const CUSTOM_PRODUCTS_KEY: &str = "custom_products";

/// Length of the random part of generated ids
const ID_SUFFIX_LEN: usize = 9;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Errors reading or writing the persisted list
#[derive(Debug, Error)]
pub enum CustomProductError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Custom product list is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persists the user's custom products
///
/// Every operation is best-effort: failures are logged and reported as an
/// empty list or `false`, never as an error.
#[derive(Debug)]
pub struct CustomProductStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write cycles on the list
    write_lock: Mutex<()>,
}

impl CustomProductStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Replaces the time source used for generated ids
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a custom product and appends it to the persisted list
    ///
    /// The new record is returned even when it could not be persisted.
    /// Products with a NaN or infinite value are never persisted, since
    /// JSON has no encoding for them. A stored list that no longer parses
    /// is moved to a backup key and a fresh list is started.
    pub async fn create(&self, new_product: NewFoodProduct) -> FoodProduct {
        let finite = new_product.is_finite();
        let product = new_product.into_product(self.generate_id(), FoodSource::Custom);
        if !finite {
            warn!(id = %product.id, "custom product has non-finite values; not saved");
            return product;
        }

        let _guard = self.write_lock.lock().await;
        let mut products = match self.read_list_for_update().await {
            Some(products) => products,
            None => {
                tracing::error!(id = %product.id, "custom products unreadable; new product not saved");
                return product;
            }
        };

        products.push(product.clone());
        match self.write_list(&products).await {
            Ok(()) => debug!(id = %product.id, "custom product saved"),
            Err(e) => tracing::error!(id = %product.id, error = %e, "failed to save custom product"),
        }

        product
    }

    /// Reads the list ahead of a write
    ///
    /// A blob that does not parse is copied to `<key>_corrupt_<epoch-ms>` and
    /// an empty list returned. `None` means nothing may be written: the store
    /// could not be read, or the bad blob could not be backed up.
    async fn read_list_for_update(&self) -> Option<Vec<FoodProduct>> {
        let content = match self.store.get_item(CUSTOM_PRODUCTS_KEY).await {
            Ok(Some(content)) => content,
            Ok(None) => return Some(Vec::new()),
            Err(e) => {
                tracing::error!(error = %e, "failed to read custom products");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(products) => Some(products),
            Err(parse_err) => {
                let key = backup_key(self.clock.now_millis());
                match self.store.set_item(&key, &content).await {
                    Ok(()) => {
                        tracing::error!(
                            backup_key = %key,
                            error = %parse_err,
                            "custom products unreadable; moved aside and starting a new list"
                        );
                        Some(Vec::new())
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to back up unreadable custom products");
                        None
                    }
                }
            }
        }
    }

    /// Returns all custom products in creation order, or an empty list if
    /// they cannot be read
    pub async fn list(&self) -> Vec<FoodProduct> {
        self.read_list().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read custom products");
            Vec::new()
        })
    }

    /// Finds a custom product by id
    pub async fn get(&self, id: &str) -> Option<FoodProduct> {
        self.list().await.into_iter().find(|p| p.id == id)
    }

    /// Deletes the product with `id`
    ///
    /// # Returns
    /// `true` only if the product existed and the shortened list was saved.
    pub async fn delete(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        let mut products = match self.read_list().await {
            Ok(products) => products,
            Err(e) => {
                warn!(id, error = %e, "failed to read custom products");
                return false;
            }
        };

        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            debug!(id, "no custom product to delete");
            return false;
        }

        match self.write_list(&products).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id, error = %e, "failed to save custom products after delete");
                false
            }
        }
    }

    async fn read_list(&self) -> Result<Vec<FoodProduct>, CustomProductError> {
        match self.store.get_item(CUSTOM_PRODUCTS_KEY).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_list(&self, products: &[FoodProduct]) -> Result<(), CustomProductError> {
        let json = serde_json::to_string(products)?;
        self.store.set_item(CUSTOM_PRODUCTS_KEY, &json).await?;
        Ok(())
    }

    /// Generates `custom-<epoch-ms>-<base36 suffix>`
    fn generate_id(&self) -> String {
        format!("custom-{}-{}", self.clock.now_millis(), random_suffix())
    }
}

/// Key a corrupt list is moved to
fn backup_key(now_millis: i64) -> String {
    format!("{}_corrupt_{}", CUSTOM_PRODUCTS_KEY, now_millis)
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_SUFFIX_LEN)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use regex::Regex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn new_product(name: &str) -> NewFoodProduct {
        NewFoodProduct {
            name: name.to_string(),
            brand: None,
            barcode: None,
            calories: 10.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            fiber: None,
            sugar: None,
            sodium: None,
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            image: None,
        }
    }

    /// Memory store that can be switched to fail writes
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get_item(key).await
        }
        async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set_item(key, value).await
        }
        async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove_item(key).await
        }
    }

    #[tokio::test]
    async fn test_create_list_delete_roundtrip() {
        let store = CustomProductStore::new(Arc::new(MemoryStore::new()));

        let created = store.create(new_product("X")).await;

        let listed = store.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
        assert_eq!(listed[0].source, FoodSource::Custom);
        let pattern = Regex::new(r"^custom-\d+-[a-z0-9]+$").unwrap();
        assert!(pattern.is_match(&created.id), "Unexpected id: {}", created.id);

        assert!(store.delete(&created.id).await);
        assert!(store.list().await.is_empty());
        assert!(!store.delete("nonexistent").await);
    }

    #[tokio::test]
    async fn test_id_uses_clock_and_nine_char_suffix() {
        let clock = Arc::new(ManualClock::new(1_700_000_000_123));
        let store = CustomProductStore::new(Arc::new(MemoryStore::new())).with_clock(clock);

        let created = store.create(new_product("Oats")).await;

        let suffix = created
            .id
            .strip_prefix("custom-1700000000123-")
            .expect("Id should embed the clock time");
        assert_eq!(suffix.len(), 9);
    }

    #[tokio::test]
    async fn test_ids_are_distinct_at_same_millisecond() {
        let clock = Arc::new(ManualClock::new(1));
        let store = CustomProductStore::new(Arc::new(MemoryStore::new())).with_clock(clock);

        let a = store.create(new_product("A")).await;
        let b = store.create(new_product("B")).await;

        assert_ne!(a.id, b.id);
        let names: Vec<String> = store.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "B"], "List should keep creation order");
    }

    #[tokio::test]
    async fn test_get_finds_by_id() {
        let store = CustomProductStore::new(Arc::new(MemoryStore::new()));
        let created = store.create(new_product("Soup")).await;

        assert_eq!(store.get(&created.id).await, Some(created));
        assert!(store.get("custom-0-missing").await.is_none());
    }

    #[tokio::test]
    async fn test_create_returns_product_when_write_fails() {
        let backing = Arc::new(FlakyStore::default());
        backing.fail_writes.store(true, Ordering::SeqCst);
        let store = CustomProductStore::new(backing);

        let created = store.create(new_product("Ghost")).await;

        assert_eq!(created.name, "Ghost");
        assert_eq!(created.source, FoodSource::Custom);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_returns_false_when_write_fails() {
        let backing = Arc::new(FlakyStore::default());
        let store = CustomProductStore::new(backing.clone());
        let created = store.create(new_product("Keep")).await;

        backing.fail_writes.store(true, Ordering::SeqCst);

        assert!(!store.delete(&created.id).await);
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_list_is_backed_up_before_new_list_starts() {
        let backing = Arc::new(MemoryStore::new());
        backing.set_item(CUSTOM_PRODUCTS_KEY, "{corrupt").await.unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = CustomProductStore::new(backing.clone()).with_clock(clock);

        assert!(store.list().await.is_empty());
        assert!(!store.delete("anything").await);

        let created = store.create(new_product("New")).await;

        assert_eq!(store.list().await, vec![created]);
        assert_eq!(
            backing
                .get_item("custom_products_corrupt_1700000000000")
                .await
                .unwrap()
                .as_deref(),
            Some("{corrupt")
        );
    }

    #[tokio::test]
    async fn test_corrupt_list_is_kept_when_backup_fails() {
        let backing = Arc::new(FlakyStore::default());
        backing.inner.set_item(CUSTOM_PRODUCTS_KEY, "{corrupt").await.unwrap();
        backing.fail_writes.store(true, Ordering::SeqCst);
        let store = CustomProductStore::new(backing.clone());

        let created = store.create(new_product("New")).await;

        assert_eq!(created.name, "New");
        assert_eq!(
            backing.get_item(CUSTOM_PRODUCTS_KEY).await.unwrap().as_deref(),
            Some("{corrupt")
        );
    }

    #[tokio::test]
    async fn test_non_finite_product_is_not_saved_and_list_survives() {
        let store = CustomProductStore::new(Arc::new(MemoryStore::new()));
        let good = store.create(new_product("Good")).await;

        let mut bad = new_product("Bad");
        bad.calories = f64::NAN;
        let returned = store.create(bad).await;
        assert!(returned.calories.is_nan());

        let mut infinite = new_product("Huge");
        infinite.sodium = Some(f64::INFINITY);
        store.create(infinite).await;

        assert_eq!(store.list().await, vec![good.clone()]);

        let later = store.create(new_product("Later")).await;
        assert_eq!(store.list().await, vec![good, later]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_all_kept() {
        let store = Arc::new(CustomProductStore::new(Arc::new(MemoryStore::new())));

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_product(&format!("P{i}"))).await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(store.list().await.len(), 10);
    }
}
