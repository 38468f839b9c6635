use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;
use crate::store::Store;

pub const DEFAULT_CONFIG_FILE: &str = "impactu-harvest.json";
pub const DEFAULT_DATABASE: &str = "ImpactU";
pub const DEFAULT_STAGING_COLLECTION: &str = "No_Scholar";
pub const DEFAULT_DESTINATION_COLLECTION: &str = "For_Moai";
pub const DEFAULT_API_BASE: &str = "http://impactu.colav.co:8080/api";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_EXCLUDED_SOURCE: &str = "scholar";
pub const DEFAULT_SECTION: &str = "research";
pub const DEFAULT_TAB: &str = "products";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub staging_collection: Option<String>,
    #[serde(default)]
    pub destination_collection: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub excluded_source: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub copy_batch_size: Option<usize>,
    #[serde(default)]
    pub store_root: Option<String>,
}

/// Where and how the products listing is walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub section: String,
    pub tab: String,
    pub page_size: u32,
    pub excluded_source: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            section: DEFAULT_SECTION.to_string(),
            tab: DEFAULT_TAB.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            excluded_source: DEFAULT_EXCLUDED_SOURCE.to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub root: Option<Utf8PathBuf>,
    pub database: String,
    pub staging_collection: String,
    pub destination_collection: String,
    pub copy_batch_size: Option<usize>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: None,
            database: DEFAULT_DATABASE.to_string(),
            staging_collection: DEFAULT_STAGING_COLLECTION.to_string(),
            destination_collection: DEFAULT_DESTINATION_COLLECTION.to_string(),
            copy_batch_size: None,
        }
    }
}

impl StoreSettings {
    pub fn open_store(&self) -> Result<Store, HarvestError> {
        match &self.root {
            Some(root) => Ok(Store::new_with_root(root.clone())),
            None => Store::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api: ApiSettings,
    pub store: StoreSettings,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Falls back to built-in defaults only when no path was given and the
    /// default file is absent.
    pub fn resolve_or_default(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        match Self::resolve(path) {
            Err(HarvestError::MissingConfig) => Self::resolve_config(Config::default()),
            other => other,
        }
    }

    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(HarvestError::InvalidConfig(
                "page_size must be at least 1".to_string(),
            ));
        }
        if config.copy_batch_size == Some(0) {
            return Err(HarvestError::InvalidConfig(
                "copy_batch_size must be at least 1".to_string(),
            ));
        }

        let api = ApiSettings {
            base_url: non_empty(
                "api_base",
                config.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            )?
            .trim_end_matches('/')
            .to_string(),
            section: non_empty(
                "section",
                config.section.unwrap_or_else(|| DEFAULT_SECTION.to_string()),
            )?,
            tab: non_empty("tab", config.tab.unwrap_or_else(|| DEFAULT_TAB.to_string()))?,
            page_size,
            excluded_source: non_empty(
                "excluded_source",
                config
                    .excluded_source
                    .unwrap_or_else(|| DEFAULT_EXCLUDED_SOURCE.to_string()),
            )?,
            request_delay: Duration::from_millis(
                config.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            ),
            request_timeout: Duration::from_secs(
                config
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        };

        let store = StoreSettings {
            root: config.store_root.map(Utf8PathBuf::from),
            database: non_empty(
                "database",
                config.database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            )?,
            staging_collection: non_empty(
                "staging_collection",
                config
                    .staging_collection
                    .unwrap_or_else(|| DEFAULT_STAGING_COLLECTION.to_string()),
            )?,
            destination_collection: non_empty(
                "destination_collection",
                config
                    .destination_collection
                    .unwrap_or_else(|| DEFAULT_DESTINATION_COLLECTION.to_string()),
            )?,
            copy_batch_size: config.copy_batch_size,
        };

        if store.staging_collection == store.destination_collection {
            return Err(HarvestError::InvalidConfig(
                "staging and destination collections must differ".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            api,
            store,
        })
    }
}

fn non_empty(key: &str, value: String) -> Result<String, HarvestError> {
    if value.trim().is_empty() {
        return Err(HarvestError::InvalidConfig(format!("{key} must not be empty")));
    }
    Ok(value)
}
