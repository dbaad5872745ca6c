//! Tree container over the free-slot recycling table
//!
//! Each live location carries a parent pointer (0 = top level under the
//! virtual root), at most one first-child pointer, and sibling pointers
//! forming a circular ring among same-parent children. Child insertion is
//! O(1); removing a value removes the whole subtree, deepest-leftmost
//! node first, emitting one event per freed node while the freed node's
//! ancestor linkage is still intact.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::constants::NIL;
use crate::core::config::StoreConfig;
use crate::log_trace;
use crate::storage::slot_store::{SlotStore, StoreValue};
use crate::structures::link_table::LinkTable;
use crate::types::error::{Result, StorageError};
use crate::types::event::StoreEvent;
use crate::types::location::{is_nil, InsertPos, Location};
use crate::types::observer::{Callback, ObserverId, ObserverList, SharedObservers};

/// Links of one live tree slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TreeLinks {
    /// Parent location, 0 for top-level nodes.
    parent: Location,
    /// First child, 0 for leaves.
    first_child: Location,
    /// Next sibling in the circular same-parent ring.
    next: Location,
    /// Previous sibling in the circular same-parent ring.
    prev: Location,
}

/// Location-addressed tree with a virtual root at the sentinel.
#[derive(Debug)]
pub struct TreeStore<T> {
    links: LinkTable<TreeLinks>,
    /// Parallel value array; index 0 stays empty.
    values: Vec<Option<T>>,
    /// First child of the virtual root.
    root_first: Location,
    observers: SharedObservers<T>,
}

impl<T: StoreValue> Default for TreeStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoreValue> TreeStore<T> {
    /// Creates an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Creates an empty tree pre-sized for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&StoreConfig { initial_capacity: capacity, ..Default::default() })
    }

    /// Creates an empty tree from an explicit configuration.
    pub fn with_config(config: &StoreConfig) -> Self {
        let links = LinkTable::with_capacity_and_growth(
            config.initial_capacity,
            config.growth_numerator,
            config.growth_denominator,
        );
        let mut store = TreeStore {
            links,
            values: Vec::new(),
            root_first: NIL,
            observers: Rc::new(RefCell::new(ObserverList::new())),
        };
        store.sync_values();
        store
    }

    /// Borrowed read of the value at `location`.
    pub fn get_ref(&self, location: Location) -> Option<&T> {
        if self.links.is_live(location) {
            self.values.get(location as usize)?.as_ref()
        } else {
            None
        }
    }

    /// Current number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.links.capacity()
    }

    /// Allocates an address and inserts `value` at `pos`. Returns the
    /// new location.
    pub fn insert(&mut self, pos: InsertPos, value: T) -> Result<Location> {
        self.guard_reentry()?;
        let location = self.links.empty_location();
        self.insert_at(pos, location, value)?;
        Ok(location)
    }

    /// Removes the subtree rooted at `location`, deepest-leftmost first,
    /// emitting one removal event per freed node. Returns the value that
    /// was stored at `location` itself.
    pub fn remove_subtree(&mut self, location: Location) -> Result<T> {
        self.guard_reentry()?;
        if !self.links.is_live(location) {
            return Err(StorageError::bad_location("remove_subtree", location).into());
        }
        let mut removed_root = None;
        loop {
            // Descend the first-child chain to the current deepest-leftmost
            // descendant; it is a leaf by construction.
            let mut cur = location;
            while let Some(links) = self.links.get(cur) {
                if is_nil(links.first_child) {
                    break;
                }
                cur = links.first_child;
            }
            let pos = self.pos_context(cur);
            self.detach(cur);
            self.links.release(cur)?;
            let old = self.values[cur as usize].take().expect("live slot holds a value");

            log_trace!("tree removed location {cur}");
            let done = cur == location;
            if done {
                removed_root = Some(old.clone());
            }
            self.emit(StoreEvent::removed(cur, pos, old));
            if done {
                break;
            }
        }
        Ok(removed_root.expect("removal loop frees the requested node"))
    }

    /// Shrinks backing storage to the highest live address. Live
    /// locations never move. Idempotent. Returns the new capacity.
    pub fn minimize_capacity(&mut self) -> usize {
        let capacity = self.links.minimize_capacity();
        self.values.truncate(capacity + 1);
        capacity
    }

    /// Live locations in preorder (node before its children, children
    /// first-to-last), the traversal order the structural codec fixes.
    pub fn iter_locations(&self) -> impl Iterator<Item = Location> + '_ {
        std::iter::successors(nonzero(self.root_first), move |&loc| {
            nonzero(self.preorder_next(loc))
        })
    }

    /// Validates the free chain and every sibling ring. Development-time
    /// assertion layer; unreachable from correct API usage.
    pub fn verify(&self) -> Result<()> {
        self.links.verify()?;
        let mut count = 0usize;
        self.verify_ring(NIL, &mut count)?;
        if count != self.links.live_count() {
            return Err(StorageError::Corruption(format!(
                "{count} reachable nodes but {} live slots",
                self.links.live_count()
            ))
            .into());
        }
        Ok(())
    }

    // --- internals ----------------------------------------------------------

    fn sync_values(&mut self) {
        let needed = self.links.capacity() + 1;
        if self.values.len() < needed {
            self.values.resize_with(needed, || None);
        }
    }

    fn guard_reentry(&self) -> Result<()> {
        // Mid-fan-out the observer list is mutably borrowed, so a failed
        // borrow is the same signal as the notifying flag.
        let notifying =
            self.observers.try_borrow().map(|o| o.is_notifying()).unwrap_or(true);
        if notifying {
            return Err(StorageError::IllegalStore(
                "mutation re-entered from an observer callback".into(),
            )
            .into());
        }
        Ok(())
    }

    fn emit(&self, event: StoreEvent<T>) {
        self.observers.borrow_mut().notify(&event);
    }

    fn first_child_of(&self, parent: Location) -> Location {
        if is_nil(parent) {
            self.root_first
        } else {
            self.links.get(parent).map(|l| l.first_child).unwrap_or(NIL)
        }
    }

    fn set_first_child(&mut self, parent: Location, location: Location) {
        if is_nil(parent) {
            self.root_first = location;
        } else {
            self.links.get_mut(parent).expect("live parent").first_child = location;
        }
    }

    /// Structural position of a live node: first child of its parent or
    /// after its previous sibling.
    fn pos_context(&self, location: Location) -> InsertPos {
        let links = self.links.get(location).expect("live");
        if self.first_child_of(links.parent) == location {
            InsertPos::FirstChildOf(links.parent)
        } else {
            InsertPos::After(links.prev)
        }
    }

    /// Unlinks a node from its sibling ring; links of the node itself
    /// are left for `release` to reclaim.
    fn detach(&mut self, location: Location) {
        let TreeLinks { parent, next, prev, .. } =
            self.links.get(location).expect("live").clone();
        if next == location {
            // Only child.
            self.set_first_child(parent, NIL);
        } else {
            self.links.get_mut(prev).expect("live sibling").next = next;
            self.links.get_mut(next).expect("live sibling").prev = prev;
            if self.first_child_of(parent) == location {
                self.set_first_child(parent, next);
            }
        }
    }

    /// Claims `location` and links it at `pos`, emitting the add event.
    fn insert_linked(&mut self, pos: InsertPos, location: Location, value: T) -> Result<()> {
        match pos {
            InsertPos::After(sibling) if !is_nil(sibling) => {
                let TreeLinks { parent, next, .. } = self
                    .links
                    .get(sibling)
                    .cloned()
                    .ok_or_else(|| StorageError::bad_location("insert_at", sibling))?;
                self.links.claim(
                    location,
                    TreeLinks { parent, first_child: NIL, next, prev: sibling },
                )?;
                self.sync_values();
                self.links.get_mut(sibling).expect("live sibling").next = location;
                self.links.get_mut(next).expect("live sibling").prev = location;
                self.values[location as usize] = Some(value);

                log_trace!("tree inserted location {location} after {sibling}");
                self.emit(StoreEvent::added(location, InsertPos::After(sibling)));
                Ok(())
            }
            // After(0) and FirstChildOf(parent) insert a new first child.
            InsertPos::After(_) => self.insert_first_child(NIL, location, value),
            InsertPos::FirstChildOf(parent) => self.insert_first_child(parent, location, value),
        }
    }

    fn insert_first_child(&mut self, parent: Location, location: Location, value: T) -> Result<()> {
        if !is_nil(parent) && !self.links.is_live(parent) {
            return Err(StorageError::bad_location("insert_at", parent).into());
        }
        let first = self.first_child_of(parent);
        let (next, prev) = if is_nil(first) {
            // Sole child: the sibling ring is a self-loop.
            (location, location)
        } else {
            (first, self.links.get(first).expect("live child").prev)
        };
        self.links.claim(location, TreeLinks { parent, first_child: NIL, next, prev })?;
        self.sync_values();
        if !is_nil(first) {
            let last = self.links.get(first).expect("live child").prev;
            // `last` may equal `first` when the ring had one member.
            self.links.get_mut(last).expect("live child").next = location;
            self.links.get_mut(first).expect("live child").prev = location;
        }
        self.set_first_child(parent, location);
        self.values[location as usize] = Some(value);

        log_trace!("tree inserted location {location} as first child of {parent}");
        self.emit(StoreEvent::added(location, InsertPos::FirstChildOf(parent)));
        Ok(())
    }

    /// Preorder successor: first child, else next sibling, else the next
    /// sibling of the nearest ancestor that has one.
    fn preorder_next(&self, location: Location) -> Location {
        let links = self.links.get(location).expect("live");
        if !is_nil(links.first_child) {
            return links.first_child;
        }
        let mut cur = location;
        loop {
            let links = self.links.get(cur).expect("live");
            let first = self.first_child_of(links.parent);
            if links.next != first {
                return links.next;
            }
            if is_nil(links.parent) {
                return NIL;
            }
            cur = links.parent;
        }
    }

    /// Preorder predecessor: the previous sibling's deepest-last
    /// descendant, else the parent.
    fn preorder_prev(&self, location: Location) -> Location {
        let links = self.links.get(location).expect("live");
        if self.first_child_of(links.parent) == location {
            return links.parent;
        }
        self.deepest_last(links.prev)
    }

    fn deepest_last(&self, mut location: Location) -> Location {
        while let Some(links) = self.links.get(location) {
            if is_nil(links.first_child) {
                break;
            }
            // Last child is the first child's ring predecessor.
            location = self.links.get(links.first_child).expect("live child").prev;
        }
        location
    }

    fn verify_ring(&self, parent: Location, count: &mut usize) -> Result<()> {
        let first = self.first_child_of(parent);
        if is_nil(first) {
            return Ok(());
        }
        let mut cur = first;
        loop {
            let links = self.links.get(cur).ok_or_else(|| {
                StorageError::Corruption(format!("sibling ring references empty location {cur}"))
            })?;
            if links.parent != parent {
                return Err(StorageError::Corruption(format!(
                    "location {cur} has parent {} but hangs under {parent}",
                    links.parent
                ))
                .into());
            }
            let next_prev = self
                .links
                .get(links.next)
                .map(|l| l.prev)
                .ok_or_else(|| StorageError::Corruption(format!("dangling sibling at {cur}")))?;
            if next_prev != cur {
                return Err(StorageError::Corruption(format!(
                    "sibling ring mismatch between {cur} and {}",
                    links.next
                ))
                .into());
            }
            if self.get_ref(cur).is_none() {
                return Err(
                    StorageError::Corruption(format!("live location {cur} has no value")).into()
                );
            }
            *count += 1;
            if *count > self.links.live_count() {
                return Err(
                    StorageError::Corruption("tree walk exceeds live count".into()).into()
                );
            }
            self.verify_ring(cur, count)?;
            cur = links.next;
            if cur == first {
                break;
            }
        }
        Ok(())
    }

    fn scan(&self, from: Location, forward: bool, pred: impl Fn(&T) -> bool) -> Location {
        let mut cur = if is_nil(from) {
            if forward {
                self.root_first
            } else if is_nil(self.root_first) {
                NIL
            } else {
                // Last node in preorder: deepest-last of the last top-level node.
                let last_top = self.links.get(self.root_first).expect("live").prev;
                self.deepest_last(last_top)
            }
        } else if self.links.is_live(from) {
            from
        } else {
            return NIL;
        };
        while !is_nil(cur) {
            if self.get_ref(cur).map(&pred).unwrap_or(false) {
                return cur;
            }
            cur = if forward { self.preorder_next(cur) } else { self.preorder_prev(cur) };
        }
        NIL
    }
}

impl<T: StoreValue> SlotStore<T> for TreeStore<T> {
    fn get_at(&self, location: Location) -> Option<T> {
        self.get_ref(location).cloned()
    }

    fn is_valid_at(&self, location: Location) -> bool {
        self.links.is_live(location)
    }

    fn len(&self) -> usize {
        self.links.live_count()
    }

    fn empty_location(&mut self) -> Location {
        self.links.empty_location()
    }

    fn insert_at(&mut self, pos: InsertPos, location: Location, value: T) -> Result<()> {
        self.guard_reentry()?;
        self.insert_linked(pos, location, value)
    }

    fn set_at(&mut self, location: Location, value: Option<T>) -> Result<()> {
        self.guard_reentry()?;
        match value {
            Some(value) => {
                if is_nil(location) {
                    return Err(StorageError::bad_location("set_at", location).into());
                }
                if self.links.is_live(location) {
                    let old = self.values[location as usize]
                        .replace(value)
                        .expect("live slot holds a value");
                    let pos = self.pos_context(location);
                    self.emit(StoreEvent::modified(location, pos, old));
                    Ok(())
                } else if is_nil(self.root_first) {
                    self.insert_linked(InsertPos::FirstChildOf(NIL), location, value)
                } else {
                    // Fresh address: link as the last top-level node.
                    let last = self.links.get(self.root_first).expect("live").prev;
                    self.insert_linked(InsertPos::After(last), location, value)
                }
            }
            None => {
                if is_nil(location) || !self.links.is_live(location) {
                    return Ok(());
                }
                self.remove_subtree(location).map(|_| ())
            }
        }
    }

    fn child_location(&self, parent: Location, forward: bool) -> Result<Location> {
        if !is_nil(parent) && !self.links.is_live(parent) {
            return Err(StorageError::bad_location("child_location", parent).into());
        }
        let first = self.first_child_of(parent);
        if is_nil(first) {
            return Ok(NIL);
        }
        Ok(if forward { first } else { self.links.get(first).expect("live child").prev })
    }

    fn sibling_location(&self, location: Location, forward: bool) -> Result<Location> {
        let links = self
            .links
            .get(location)
            .ok_or_else(|| StorageError::bad_location("sibling_location", location))?;
        let first = self.first_child_of(links.parent);
        if forward {
            Ok(if links.next == first { NIL } else { links.next })
        } else {
            Ok(if location == first { NIL } else { links.prev })
        }
    }

    fn parent_location(&self, location: Location) -> Result<Location> {
        self.links
            .get(location)
            .map(|l| l.parent)
            .ok_or_else(|| StorageError::bad_location("parent_location", location).into())
    }

    fn location_of(&self, value: &T, from: Location, forward: bool) -> Location {
        self.scan(from, forward, |v| v == value)
    }

    fn find_less_greater(
        &self,
        value: &T,
        from: Location,
        forward: bool,
        greater: bool,
    ) -> Location {
        let want = if greater { Ordering::Greater } else { Ordering::Less };
        self.scan(from, forward, |v| v.partial_cmp(value) == Some(want))
    }

    fn clear(&mut self) -> Result<()> {
        while !is_nil(self.root_first) {
            self.remove_subtree(self.root_first)?;
        }
        Ok(())
    }

    fn add_observer(&mut self, callback: Callback<T>) -> Result<ObserverId> {
        self.observers.borrow_mut().add_observer(callback)
    }

    fn remove_observer(&mut self, id: ObserverId) -> Result<bool> {
        self.observers.borrow_mut().remove_observer(id)
    }

    fn has_observers(&self) -> bool {
        self.observers.borrow().has_observers()
    }
}

/// Duplicates the structure (link table and value slots) while the
/// observer list starts out empty. Values are cloned; wrap them in `Rc`
/// for shallow sharing.
impl<T: StoreValue> Clone for TreeStore<T> {
    fn clone(&self) -> Self {
        TreeStore {
            links: self.links.clone(),
            values: self.values.clone(),
            root_first: self.root_first,
            observers: Rc::new(RefCell::new(ObserverList::new())),
        }
    }
}

#[inline]
fn nonzero(location: Location) -> Option<Location> {
    if is_nil(location) {
        None
    } else {
        Some(location)
    }
}
