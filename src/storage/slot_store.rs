//! Location-addressed container capability
//!
//! `SlotStore` is the single seam every container implements: list, tree
//! and filter each independently, composed by explicit delegation rather
//! than inheritance. The trait is dyn-compatible so filters can hold any
//! source behind `Rc<RefCell<dyn SlotStore<T>>>`.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::types::error::Result;
use crate::types::location::{InsertPos, Location};
use crate::types::observer::{Callback, ObserverId};

/// Bound every stored value satisfies.
///
/// `Clone` backs owned reads and synthetic filter events (wrap values in
/// `Rc` where cloning must stay shallow); `PartialEq`/`PartialOrd` back
/// the linear scans. Blanket-implemented, never implemented by hand.
pub trait StoreValue: Clone + PartialEq + PartialOrd + Debug + 'static {}

impl<T: Clone + PartialEq + PartialOrd + Debug + 'static> StoreValue for T {}

/// A container shared for filtering; single-threaded by contract.
pub type SharedStore<T> = Rc<RefCell<dyn SlotStore<T>>>;

/// Location-addressed container with change notification.
///
/// Mutations must be externally serialized: one writer at a time per
/// container (and per filter/source pair), no concurrent readers while a
/// writer is active. Observer callbacks run synchronously inside the
/// mutating call and must not mutate the same container.
pub trait SlotStore<T: StoreValue> {
    /// Owned copy of the value at `location`, `None` when empty.
    fn get_at(&self, location: Location) -> Option<T>;

    /// `true` if `location` addresses a live value.
    fn is_valid_at(&self, location: Location) -> bool;

    /// Number of live values.
    fn len(&self) -> usize;

    /// `true` when no value is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The address the next insertion will use, growing storage if the
    /// free chain is exhausted. Returns 0 on a sourceless filter.
    fn empty_location(&mut self) -> Location;

    /// Stores `value` at the empty slot `location`, linked at `pos`.
    ///
    /// Errors with illegal-argument when `pos` does not name a live
    /// anchor or `location` is occupied.
    fn insert_at(&mut self, pos: InsertPos, location: Location, value: T) -> Result<()>;

    /// Assigns or clears the slot at an arbitrary already-known address.
    ///
    /// `Some` over an empty slot links it at the container's append
    /// position, extending storage as needed; `Some` over a live slot
    /// replaces the value in place. `None` clears; for a tree this
    /// removes the whole subtree. `set_at(0, None)` is an accepted no-op.
    fn set_at(&mut self, location: Location, value: Option<T>) -> Result<()>;

    /// First (`forward`) or last child of `parent`; 0 when childless.
    /// Parent 0 is the list head/tail or the tree's virtual root.
    fn child_location(&self, parent: Location, forward: bool) -> Result<Location>;

    /// Next (`forward`) or previous sibling, 0 at the ring boundary.
    fn sibling_location(&self, location: Location, forward: bool) -> Result<Location>;

    /// Parent of a live location; 0 for top-level entries.
    fn parent_location(&self, location: Location) -> Result<Location>;

    /// Linear scan for a value equal to `value`, starting at `from`
    /// (0 = scan the whole container) in the given direction. Returns 0
    /// when absent or when `from` is not a live location.
    fn location_of(&self, value: &T, from: Location, forward: bool) -> Location;

    /// Linear scan for the first value ordered strictly greater
    /// (`greater`) or strictly less than `value`. Incomparable pairs are
    /// skipped. Returns 0 when no such value exists.
    fn find_less_greater(&self, value: &T, from: Location, forward: bool, greater: bool)
        -> Location;

    /// Removes every value, emitting one removal event per location.
    fn clear(&mut self) -> Result<()>;

    /// Registers an observer for this container's change events.
    fn add_observer(&mut self, callback: Callback<T>) -> Result<ObserverId>;

    /// Unregisters an observer; returns whether it was registered.
    fn remove_observer(&mut self, id: ObserverId) -> Result<bool>;

    /// `true` if at least one observer is registered.
    fn has_observers(&self) -> bool;
}
