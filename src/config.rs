//! Runtime configuration
//!
//! Settings come from environment variables (a `.env` file is loaded by the
//! binary before this runs). Provider credentials are handed to each client
//! at construction, never stored globally.

use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheManager;
use crate::custom::CustomProductStore;
use crate::data::{OpenFoodFactsClient, OpenFoodFactsConfig, UsdaClient, UsdaConfig};
use crate::lookup::FoodLookup;
use crate::store::{FileStore, KeyValueStore, StoreError};

pub const ENV_USDA_API_KEY: &str = "USDA_API_KEY";
pub const ENV_USDA_BASE_URL: &str = "USDA_BASE_URL";
pub const ENV_OPEN_FOOD_FACTS_BASE_URL: &str = "OPEN_FOOD_FACTS_BASE_URL";
pub const ENV_DATA_DIR: &str = "FOODLENS_DATA_DIR";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "FOODLENS_HTTP_TIMEOUT_SECS";

/// Default HTTP request timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

const USER_AGENT: &str = concat!("foodlens/", env!("CARGO_PKG_VERSION"));

/// Errors building configuration or the services it describes
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The data store could not be located
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Settings for providers, storage, and HTTP
#[derive(Debug, Clone)]
pub struct Config {
    pub usda: UsdaConfig,
    pub open_food_facts: OpenFoodFactsConfig,
    /// Directory for the cache and custom products; XDG data dir when unset
    pub data_dir: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            usda: UsdaConfig::default(),
            open_food_facts: OpenFoodFactsConfig::default(),
            data_dir: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `var`, treating blank values as unset
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(api_key) = get(ENV_USDA_API_KEY) {
            config.usda.api_key = api_key;
        }
        if let Some(base_url) = get(ENV_USDA_BASE_URL) {
            config.usda.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(base_url) = get(ENV_OPEN_FOOD_FACTS_BASE_URL) {
            config.open_food_facts.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.data_dir = get(ENV_DATA_DIR).map(PathBuf::from);

        if let Some(value) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs = match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_HTTP_TIMEOUT_SECS,
                        value,
                    })
                }
            };
            config.http_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Overrides the data directory
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Builds the HTTP client shared by both providers
    pub fn http_client(&self) -> Result<Client, ConfigError> {
        Ok(Client::builder()
            .timeout(self.http_timeout)
            .user_agent(USER_AGENT)
            .build()?)
    }

    /// Opens the file store in the configured directory
    pub fn store(&self) -> Result<FileStore, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(FileStore::with_dir(dir.clone())),
            None => Ok(FileStore::new()?),
        }
    }

    /// Wires providers, cache, and custom store into a `FoodLookup`
    pub fn build_lookup(&self) -> Result<FoodLookup, ConfigError> {
        let client = self.http_client()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(self.store()?);

        let usda = UsdaClient::with_client(client.clone(), self.usda.clone());
        let off = OpenFoodFactsClient::with_client(client, self.open_food_facts.clone());

        Ok(FoodLookup::new(
            Arc::new(usda),
            Arc::new(off),
            CacheManager::new(store.clone()),
            CustomProductStore::new(store),
        ))
    }
}
