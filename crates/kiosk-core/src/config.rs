use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_API_BASE;
use crate::pricing::PricingConfig;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the storefront API, without a trailing slash.
    pub api_base: String,
    /// Directory holding the on-disk session cache.
    pub data_dir: PathBuf,
    pub pricing: PricingConfig,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(api_base: impl Into<String>, data_dir: P) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            data_dir: data_dir.as_ref().to_path_buf(),
            pricing: PricingConfig::default(),
        }
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("kiosk"))
            .unwrap_or_else(|| PathBuf::from("kiosk_data"))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, Self::default_data_dir())
    }
}
