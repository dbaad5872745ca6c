//! Doubly linked list container over the free-slot recycling table
//!
//! Live locations form a single ring anchored at the sentinel: the first
//! element's `prev` and the last element's `next` are 0. Insertion after
//! an arbitrary live element and removal are O(1); storage growth is
//! amortized O(1); value search is a linear scan.

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

/// Ring links of one live list slot; 0 points at the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ListLinks {
    next: Location,
    prev: Location,
}

/// Location-addressed doubly linked list.
#[derive(Debug)]
pub struct ListStore<T> {
    links: LinkTable<ListLinks>,
    /// Parallel value array; index 0 stays empty.
    values: Vec<Option<T>>,
    head: Location,
    tail: Location,
    observers: SharedObservers<T>,
}

impl<T: StoreValue> Default for ListStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoreValue> ListStore<T> {
    /// Creates an empty list with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Creates an empty list pre-sized for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&StoreConfig { initial_capacity: capacity, ..Default::default() })
    }

    /// Creates an empty list from an explicit configuration.
    pub fn with_config(config: &StoreConfig) -> Self {
        let links = LinkTable::with_capacity_and_growth(
            config.initial_capacity,
            config.growth_numerator,
            config.growth_denominator,
        );
        let mut store = ListStore {
            links,
            values: Vec::new(),
            head: NIL,
            tail: NIL,
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

    /// First element of the list, 0 when empty.
    pub fn first(&self) -> Location {
        self.head
    }

    /// Last element of the list, 0 when empty.
    pub fn last(&self) -> Location {
        self.tail
    }

    /// Current number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.links.capacity()
    }

    /// Allocates an address and inserts `value` right after `prev`
    /// (0 = head). Returns the new location.
    pub fn insert_after(&mut self, prev: Location, value: T) -> Result<Location> {
        self.guard_reentry()?;
        let location = self.links.empty_location();
        self.insert_at(InsertPos::After(prev), location, value)?;
        Ok(location)
    }

    /// Appends `value` at the tail. Returns the new location.
    pub fn push_back(&mut self, value: T) -> Result<Location> {
        let tail = self.tail;
        self.insert_after(tail, value)
    }

    /// Removes the value at `location`, returning it.
    pub fn remove_at(&mut self, location: Location) -> Result<T> {
        self.guard_reentry()?;
        let ListLinks { next, prev } = self
            .links
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::bad_location("remove_at", location))?;

        if is_nil(prev) {
            self.head = next;
        } else {
            self.links.get_mut(prev).expect("live prev").next = next;
        }
        if is_nil(next) {
            self.tail = prev;
        } else {
            self.links.get_mut(next).expect("live next").prev = prev;
        }
        self.links.release(location)?;
        let old = self.values[location as usize].take().expect("live slot holds a value");

        log_trace!("list removed location {location}");
        self.emit(StoreEvent::removed(location, InsertPos::After(prev), old.clone()));
        Ok(old)
    }

    /// Shrinks backing storage to the highest live address. Live
    /// locations never move. Idempotent. Returns the new capacity.
    pub fn minimize_capacity(&mut self) -> usize {
        let capacity = self.links.minimize_capacity();
        self.values.truncate(capacity + 1);
        capacity
    }

    /// Live locations in forward ring order.
    pub fn iter_locations(&self) -> impl Iterator<Item = Location> + '_ {
        std::iter::successors(nonzero(self.head), move |&loc| {
            nonzero(self.links.get(loc).map(|l| l.next).unwrap_or(NIL))
        })
    }

    /// Validates the free chain and the live ring. Development-time
    /// assertion layer; unreachable from correct API usage.
    pub fn verify(&self) -> Result<()> {
        self.links.verify()?;

        let mut count = 0usize;
        let mut prev = NIL;
        let mut cur = self.head;
        while !is_nil(cur) {
            let links = self.links.get(cur).ok_or_else(|| {
                StorageError::Corruption(format!("ring references empty location {cur}"))
            })?;
            if links.prev != prev {
                return Err(StorageError::Corruption(format!(
                    "ring back-link mismatch at {cur}: {} != {prev}",
                    links.prev
                ))
                .into());
            }
            if self.get_ref(cur).is_none() {
                return Err(StorageError::Corruption(format!(
                    "live location {cur} has no value"
                ))
                .into());
            }
            count += 1;
            if count > self.links.live_count() {
                return Err(StorageError::Corruption("list ring does not terminate".into()).into());
            }
            prev = cur;
            cur = links.next;
        }
        if prev != self.tail {
            return Err(StorageError::Corruption(format!(
                "ring tail is {} but the walk ends at {prev}",
                self.tail
            ))
            .into());
        }
        if count != self.links.live_count() {
            return Err(StorageError::Corruption(format!(
                "{count} ring members but {} live slots",
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

    /// Claims `location` and links it right after `prev` (0 = head).
    fn insert_linked(&mut self, prev: Location, location: Location, value: T) -> Result<()> {
        if !is_nil(prev) && !self.links.is_live(prev) {
            return Err(StorageError::bad_location("insert_at", prev).into());
        }
        let next = if is_nil(prev) {
            self.head
        } else {
            self.links.get(prev).expect("checked live").next
        };
        self.links.claim(location, ListLinks { next, prev })?;
        self.sync_values();

        if is_nil(prev) {
            self.head = location;
        } else {
            self.links.get_mut(prev).expect("live prev").next = location;
        }
        if is_nil(next) {
            self.tail = location;
        } else {
            self.links.get_mut(next).expect("live next").prev = location;
        }
        self.values[location as usize] = Some(value);

        log_trace!("list inserted location {location} after {prev}");
        self.emit(StoreEvent::added(location, InsertPos::After(prev)));
        Ok(())
    }
}

impl<T: StoreValue> SlotStore<T> for ListStore<T> {
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
        let prev = match pos {
            InsertPos::After(p) => p,
            // For a flat sequence the virtual root's first child is the head.
            InsertPos::FirstChildOf(p) if is_nil(p) => NIL,
            InsertPos::FirstChildOf(p) => {
                return Err(StorageError::IllegalArgument(format!(
                    "insert_at: list elements cannot nest under location {p}"
                ))
                .into());
            }
        };
        self.insert_linked(prev, location, value)
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
                    let prev = self.links.get(location).expect("live").prev;
                    self.emit(StoreEvent::modified(location, InsertPos::After(prev), old));
                    Ok(())
                } else {
                    // Fresh address: link at the tail, extending storage as needed.
                    let prev = self.tail;
                    self.insert_linked(prev, location, value)
                }
            }
            None => {
                if is_nil(location) || !self.links.is_live(location) {
                    return Ok(());
                }
                self.remove_at(location).map(|_| ())
            }
        }
    }

    fn child_location(&self, parent: Location, forward: bool) -> Result<Location> {
        if is_nil(parent) {
            Ok(if forward { self.head } else { self.tail })
        } else if self.links.is_live(parent) {
            // List elements have no children.
            Ok(NIL)
        } else {
            Err(StorageError::bad_location("child_location", parent).into())
        }
    }

    fn sibling_location(&self, location: Location, forward: bool) -> Result<Location> {
        let links = self
            .links
            .get(location)
            .ok_or_else(|| StorageError::bad_location("sibling_location", location))?;
        Ok(if forward { links.next } else { links.prev })
    }

    fn parent_location(&self, location: Location) -> Result<Location> {
        if self.links.is_live(location) {
            Ok(NIL)
        } else {
            Err(StorageError::bad_location("parent_location", location).into())
        }
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
        while !is_nil(self.head) {
            self.remove_at(self.head)?;
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

impl<T: StoreValue> ListStore<T> {
    fn scan(&self, from: Location, forward: bool, pred: impl Fn(&T) -> bool) -> Location {
        let mut cur = if is_nil(from) {
            if forward {
                self.head
            } else {
                self.tail
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
            let links = self.links.get(cur).expect("live");
            cur = if forward { links.next } else { links.prev };
        }
        NIL
    }
}

/// Duplicates the structure (link table and value slots) while the
/// observer list starts out empty. Values are cloned; wrap them in `Rc`
/// for shallow sharing.
impl<T: StoreValue> Clone for ListStore<T> {
    fn clone(&self) -> Self {
        ListStore {
            links: self.links.clone(),
            values: self.values.clone(),
            head: self.head,
            tail: self.tail,
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
