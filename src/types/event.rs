//! Change-notification events
//!
//! A `StoreEvent` is an immutable record of one structural mutation at a
//! location. It is created at the instant of the mutation, fanned out
//! synchronously to registered observers, and then discarded; the engine
//! retains no event history.

use crate::types::location::{InsertPos, Location};

/// What happened at the event's location.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEventKind<T> {
    /// A value was stored at a previously empty location.
    Added,

    /// The value at an occupied location was replaced.
    Modified {
        /// The value that was replaced.
        old_value: T,
    },

    /// The location was vacated. For a tree removal cascade one event is
    /// emitted per freed node, deepest first, while the freed node's
    /// parent linkage is still intact.
    Removed {
        /// The value that was removed.
        old_value: T,
    },
}

/// Immutable record of one add / modify / remove mutation.
///
/// `pos` carries the structural context at the moment of emission: the
/// prior sibling (`After`) or the parent when the node was a first child
/// (`FirstChildOf`), so observers can replay the exact sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent<T> {
    /// Address the mutation happened at; never the sentinel.
    pub location: Location,
    /// Structural position of the node relative to its neighbours.
    pub pos: InsertPos,
    /// The mutation itself.
    pub kind: StoreEventKind<T>,
}

impl<T> StoreEvent<T> {
    /// Event for a value newly stored at `location`.
    pub fn added(location: Location, pos: InsertPos) -> Self {
        StoreEvent { location, pos, kind: StoreEventKind::Added }
    }

    /// Event for a value replaced in place at `location`.
    pub fn modified(location: Location, pos: InsertPos, old_value: T) -> Self {
        StoreEvent { location, pos, kind: StoreEventKind::Modified { old_value } }
    }

    /// Event for a vacated `location`.
    pub fn removed(location: Location, pos: InsertPos, old_value: T) -> Self {
        StoreEvent { location, pos, kind: StoreEventKind::Removed { old_value } }
    }

    /// `true` for removal events.
    pub fn is_removal(&self) -> bool {
        matches!(self.kind, StoreEventKind::Removed { .. })
    }

    /// The displaced value for modify/remove events.
    pub fn old_value(&self) -> Option<&T> {
        match &self.kind {
            StoreEventKind::Added => None,
            StoreEventKind::Modified { old_value } | StoreEventKind::Removed { old_value } => {
                Some(old_value)
            }
        }
    }
}
