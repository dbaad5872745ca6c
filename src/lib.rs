//! linkstore - A Location-Addressed Storage Engine
//!
//! linkstore provides list and tree containers over a shared free-slot
//! recycling table, with stable 1-based location addressing, synchronous
//! change notification, a transparent filter/decorator layer, and a
//! combinatorial-rank structural codec that persists container topology
//! far more compactly than raw indices.
#![warn(missing_docs)]

// Core foundational modules
pub mod constants;
pub mod core;
pub mod types;

// Main functional modules
pub mod codec;
pub mod storage;
pub mod structures;

// Re-export commonly used items for convenience
pub use crate::core::StoreConfig;
pub use storage::{FilterStore, ListStore, SharedStore, SlotStore, StoreValue, TreeStore};
pub use types::{
    Error, InsertPos, Location, ObserverId, Result, StorageError, StoreEvent, StoreEventKind,
};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the engine's tracing output
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Initializing {} v{}", NAME, VERSION);
    Ok(())
}
