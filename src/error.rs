use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("missing config file impactu-harvest.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ImpactU request failed: {0}")]
    ApiHttp(String),

    #[error("ImpactU returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("failed to decode ImpactU page {page}: {message}")]
    ApiDecode { page: u32, message: String },

    #[error("document store error: {0}")]
    Store(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl HarvestError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            HarvestError::ApiHttp(_) | HarvestError::ApiStatus { .. } | HarvestError::ApiDecode { .. }
        )
    }
}
