//! Configuration for linkstore containers
//!
//! This module handles configuration settings for backing-storage sizing
//! and growth behaviour.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INITIAL_CAPACITY, GROWTH_DENOMINATOR, GROWTH_NUMERATOR, MAX_LOCATIONS,
};
use crate::types::error::{Error, Result};
use crate::{log_info, log_warn};

/// Container storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of slots a fresh container pre-allocates
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Growth factor numerator (capacity grows by numerator/denominator)
    #[serde(default = "default_growth_numerator")]
    pub growth_numerator: usize,

    /// Growth factor denominator
    #[serde(default = "default_growth_denominator")]
    pub growth_denominator: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            growth_numerator: default_growth_numerator(),
            growth_denominator: default_growth_denominator(),
        }
    }
}

impl StoreConfig {
    /// Serializes the configuration for diagnostic output.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validates that the growth factor is strictly above 1 and the
    /// initial capacity is addressable.
    pub fn validate(&self) -> Result<()> {
        if self.growth_denominator == 0 || self.growth_numerator <= self.growth_denominator {
            return Err(Error::Config(format!(
                "growth factor {}/{} must be strictly greater than 1",
                self.growth_numerator, self.growth_denominator
            )));
        }
        if self.initial_capacity > MAX_LOCATIONS {
            return Err(Error::Config(format!(
                "initial capacity {} exceeds the {} addressable slots",
                self.initial_capacity, MAX_LOCATIONS
            )));
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_initial_capacity() -> usize {
    DEFAULT_INITIAL_CAPACITY
}
fn default_growth_numerator() -> usize {
    GROWTH_NUMERATOR
}
fn default_growth_denominator() -> usize {
    GROWTH_DENOMINATOR
}

/// Load configuration from file
pub fn load_config(path: &str) -> Result<StoreConfig> {
    let config_str = std::fs::read_to_string(path)?;
    let config: StoreConfig =
        toml::from_str(&config_str).map_err(|e| Error::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from file or use defaults
pub fn load_config_or_default(path: Option<&str>) -> StoreConfig {
    match path {
        Some(path) => match load_config(path) {
            Ok(config) => {
                log_info!("Loaded configuration from: {}", path);
                crate::log_debug!(
                    "active configuration: {}",
                    config.to_json().unwrap_or_default()
                );
                config
            }
            Err(e) => {
                log_warn!("Failed to load config from {}: {}. Using defaults.", path, e);
                StoreConfig::default()
            }
        },
        None => StoreConfig::default(),
    }
}
