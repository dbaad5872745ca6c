//! Core system foundations
//!
//! This module contains the fundamental building blocks of the linkstore
//! engine: configuration and logging.

pub mod config;
pub mod logging;

// Re-export commonly used items
pub use config::{load_config, load_config_or_default, StoreConfig};
