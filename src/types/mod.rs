/// Type definitions for the linkstore engine
///
/// This module contains all type definitions organized by category.
/// Location addressing types
pub mod location;
/// Change-notification events
pub mod event;
/// Observer registration and fan-out
pub mod observer;
/// System-wide error types
pub mod error;

// Re-export commonly used types for convenience
pub use error::{CodecError, Error, Result, StorageError};
pub use event::{StoreEvent, StoreEventKind};
pub use location::{InsertPos, Location};
pub use observer::{Callback, ObserverId, ObserverList};
