//! Location addressing types
//!
//! A location is a 1-based stable address of a live value within a
//! container. Location 0 is the reserved sentinel meaning "no location /
//! root anchor" and is never a valid target for reads or writes.

use serde::{Deserialize, Serialize};

use crate::constants::NIL;

/// Stable 1-based address of a live slot; 0 is the sentinel.
pub type Location = u32;

/// Returns `true` for the reserved sentinel address.
#[inline]
pub fn is_nil(location: Location) -> bool {
    location == NIL
}

/// Structural position of an insertion or of an existing node.
///
/// Replaces the legacy convention of encoding "first child of parent P"
/// as a negative predecessor: both shapes are explicit variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPos {
    /// Immediately after the given live location; `After(0)` is the head
    /// of a list or the first top-level position of a tree.
    After(Location),

    /// As the new first child of the given parent; parent 0 is the
    /// virtual root. For a list only `FirstChildOf(0)` is meaningful and
    /// is equivalent to `After(0)`.
    FirstChildOf(Location),
}

impl InsertPos {
    /// The location named by this position (predecessor or parent).
    #[inline]
    pub fn anchor(&self) -> Location {
        match *self {
            InsertPos::After(loc) => loc,
            InsertPos::FirstChildOf(loc) => loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_nil() {
        // Goal: the 0 address reads as nil, everything else does not
        assert!(is_nil(NIL));
        assert!(!is_nil(1));
    }

    #[test]
    fn insert_pos_anchor() {
        assert_eq!(InsertPos::After(3).anchor(), 3);
        assert_eq!(InsertPos::FirstChildOf(9).anchor(), 9);
    }
}
