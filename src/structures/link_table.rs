//! Free-slot recycling table shared by the list and tree containers
//!
//! A `LinkTable` turns a flat growable array into a set of live slots plus
//! a recyclable free chain. Each slot is a tagged sum: `Free { next, prev }`
//! threaded into a circular doubly-linked free ring through the virtual
//! anchor 0, or `Live(links)` carrying the container's link payload. A slot
//! is in exactly one of the two states at all times; that invariant is what
//! gives O(1) allocation and recycling without a second index structure.
//!
//! Live addresses are stable for the lifetime of the value: growth appends,
//! [`LinkTable::minimize_capacity`] only compacts the free tail.

use crate::constants::{GROWTH_DENOMINATOR, GROWTH_NUMERATOR, MAX_LOCATIONS, NIL};
use crate::log_debug;
use crate::types::error::StorageError;
use crate::types::location::{is_nil, Location};

/// One slot of the table: recyclable or carrying live container links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEntry<L> {
    /// Member of the circular free ring; 0 links point at the anchor.
    Free {
        /// Next free slot in ring order.
        next: Location,
        /// Previous free slot in ring order.
        prev: Location,
    },
    /// Occupied slot carrying the container's link payload.
    Live(L),
}

/// Growable slot table with a circular doubly-linked free chain.
#[derive(Debug, Clone)]
pub struct LinkTable<L> {
    /// Index 0 is a placeholder; addressable slots are `1..slots.len()`.
    slots: Vec<SlotEntry<L>>,
    /// First free slot (anchor's forward link), 0 when the ring is empty.
    free_head: Location,
    /// Last free slot (anchor's backward link), 0 when the ring is empty.
    free_tail: Location,
    /// Insertion point for recycled slots; reuse is approximately FIFO.
    last_recycled: Location,
    /// Number of live slots.
    live: usize,
    /// Growth factor numerator.
    growth_num: usize,
    /// Growth factor denominator.
    growth_den: usize,
}

impl<L> LinkTable<L> {
    /// Creates a table with `capacity` addressable free slots and the
    /// default growth factor.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_growth(capacity, GROWTH_NUMERATOR, GROWTH_DENOMINATOR)
    }

    /// Creates a table with an explicit growth factor; `num/den` must be
    /// strictly greater than 1 (validated by `StoreConfig`).
    pub fn with_capacity_and_growth(capacity: usize, num: usize, den: usize) -> Self {
        let mut table = LinkTable {
            slots: vec![SlotEntry::Free { next: NIL, prev: NIL }],
            free_head: NIL,
            free_tail: NIL,
            last_recycled: NIL,
            live: 0,
            growth_num: num,
            growth_den: den,
        };
        if capacity > 0 {
            table.grow(capacity);
        }
        table
    }

    /// Number of addressable slots (live + free).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of live slots.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// `true` if `location` addresses a live slot.
    #[inline]
    pub fn is_live(&self, location: Location) -> bool {
        matches!(self.entry(location), Some(SlotEntry::Live(_)))
    }

    /// Link payload of a live slot.
    #[inline]
    pub fn get(&self, location: Location) -> Option<&L> {
        match self.entry(location) {
            Some(SlotEntry::Live(links)) => Some(links),
            _ => None,
        }
    }

    /// Mutable link payload of a live slot.
    #[inline]
    pub fn get_mut(&mut self, location: Location) -> Option<&mut L> {
        match self.entry_mut(location) {
            Some(SlotEntry::Live(links)) => Some(links),
            _ => None,
        }
    }

    /// The address the next allocation will use, growing storage if the
    /// free ring is exhausted. The slot stays free until [`claim`]ed.
    ///
    /// Returns the oldest recycled location when one exists, otherwise the
    /// lowest unused capacity slot.
    ///
    /// [`claim`]: Self::claim
    pub fn empty_location(&mut self) -> Location {
        if self.free_head == NIL {
            self.grow_auto();
        }
        self.free_head
    }

    /// Takes a specific free slot out of the ring and makes it live.
    ///
    /// Addresses beyond current capacity count as unused capacity: the
    /// table grows to cover them. An occupied address is an
    /// illegal-argument violation.
    pub fn claim(&mut self, location: Location, links: L) -> Result<(), StorageError> {
        if is_nil(location) {
            return Err(StorageError::bad_location("claim", location));
        }
        if location as usize >= self.slots.len() {
            self.grow_to_cover(location)?;
        }
        match &self.slots[location as usize] {
            SlotEntry::Live(_) => Err(StorageError::IllegalArgument(format!(
                "claim: location {location} is occupied, expected an empty slot"
            ))),
            SlotEntry::Free { .. } => {
                self.unlink_free(location);
                self.slots[location as usize] = SlotEntry::Live(links);
                self.live += 1;
                Ok(())
            }
        }
    }

    /// Returns a live slot to the free ring, right after the
    /// last-recycled pointer, and hands back its link payload.
    pub fn release(&mut self, location: Location) -> Result<L, StorageError> {
        if is_nil(location) || location as usize >= self.slots.len() {
            return Err(StorageError::bad_location("release", location));
        }
        let placeholder = SlotEntry::Free { next: NIL, prev: NIL };
        match std::mem::replace(&mut self.slots[location as usize], placeholder) {
            SlotEntry::Live(links) => {
                let after = self.last_recycled;
                self.insert_free_after(after, location);
                self.last_recycled = location;
                self.live -= 1;
                Ok(links)
            }
            entry @ SlotEntry::Free { .. } => {
                self.slots[location as usize] = entry;
                Err(StorageError::bad_location("release", location))
            }
        }
    }

    /// Shrinks backing storage to the smallest prefix containing every
    /// live slot. Live addresses never move; only the free tail is
    /// compacted. Idempotent. Returns the new capacity.
    pub fn minimize_capacity(&mut self) -> usize {
        let mut top = 0usize;
        for addr in (1..self.slots.len()).rev() {
            if matches!(self.slots[addr], SlotEntry::Live(_)) {
                top = addr;
                break;
            }
        }
        if top + 1 < self.slots.len() {
            for addr in (top as u32 + 1)..self.slots.len() as u32 {
                self.unlink_free(addr);
            }
            self.slots.truncate(top + 1);
            log_debug!("link table compacted to {} slots", self.capacity());
        }
        self.capacity()
    }

    /// Walks the free ring and the slot array, validating the dual-state
    /// invariant. Development-time assertion layer: correct external API
    /// usage can never make this fail.
    pub fn verify(&self) -> Result<(), StorageError> {
        let len = self.slots.len();
        let mut in_ring = vec![false; len];

        let mut prev = NIL;
        let mut cur = self.free_head;
        let mut steps = 0usize;
        while cur != NIL {
            if steps > len {
                return Err(StorageError::Corruption("free chain does not terminate".into()));
            }
            let idx = cur as usize;
            if idx >= len {
                return Err(StorageError::Corruption(format!(
                    "free chain points past capacity at {cur}"
                )));
            }
            match &self.slots[idx] {
                SlotEntry::Live(_) => {
                    return Err(StorageError::Corruption(format!(
                        "live location {cur} threaded into the free chain"
                    )));
                }
                SlotEntry::Free { next, prev: back } => {
                    if *back != prev {
                        return Err(StorageError::Corruption(format!(
                            "free chain back-link mismatch at {cur}: {back} != {prev}"
                        )));
                    }
                    if in_ring[idx] {
                        return Err(StorageError::Corruption(format!(
                            "location {cur} appears twice in the free chain"
                        )));
                    }
                    in_ring[idx] = true;
                    prev = cur;
                    cur = *next;
                }
            }
            steps += 1;
        }
        if self.free_tail != prev {
            return Err(StorageError::Corruption(format!(
                "free chain tail is {} but the ring ends at {prev}",
                self.free_tail
            )));
        }

        let mut live = 0usize;
        for addr in 1..len {
            match &self.slots[addr] {
                SlotEntry::Live(_) => live += 1,
                SlotEntry::Free { .. } if !in_ring[addr] => {
                    return Err(StorageError::Corruption(format!(
                        "empty location {addr} is not reachable from the free chain"
                    )));
                }
                SlotEntry::Free { .. } => {}
            }
        }
        if live != self.live {
            return Err(StorageError::Corruption(format!(
                "live count {} does not match table contents {live}",
                self.live
            )));
        }
        if self.last_recycled != NIL
            && !matches!(self.slots[self.last_recycled as usize], SlotEntry::Free { .. })
        {
            return Err(StorageError::Corruption(
                "last-recycled pointer does not reference a free slot".into(),
            ));
        }
        Ok(())
    }

    // --- free ring plumbing -------------------------------------------------

    /// Forward link of a ring member; 0 reads the anchor.
    fn next_free(&self, location: Location) -> Location {
        if is_nil(location) {
            return self.free_head;
        }
        match &self.slots[location as usize] {
            SlotEntry::Free { next, .. } => *next,
            SlotEntry::Live(_) => unreachable!("next_free on a live slot"),
        }
    }

    fn set_next_free(&mut self, location: Location, value: Location) {
        if is_nil(location) {
            self.free_head = value;
            return;
        }
        match &mut self.slots[location as usize] {
            SlotEntry::Free { next, .. } => *next = value,
            SlotEntry::Live(_) => unreachable!("set_next_free on a live slot"),
        }
    }

    fn set_prev_free(&mut self, location: Location, value: Location) {
        if is_nil(location) {
            self.free_tail = value;
            return;
        }
        match &mut self.slots[location as usize] {
            SlotEntry::Free { prev, .. } => *prev = value,
            SlotEntry::Live(_) => unreachable!("set_prev_free on a live slot"),
        }
    }

    fn unlink_free(&mut self, location: Location) {
        let (next, prev) = match &self.slots[location as usize] {
            SlotEntry::Free { next, prev } => (*next, *prev),
            SlotEntry::Live(_) => unreachable!("unlink_free on a live slot"),
        };
        self.set_next_free(prev, next);
        self.set_prev_free(next, prev);
        if self.last_recycled == location {
            self.last_recycled = prev;
        }
    }

    fn insert_free_after(&mut self, after: Location, location: Location) {
        let next = self.next_free(after);
        self.slots[location as usize] = SlotEntry::Free { next, prev: after };
        self.set_next_free(after, location);
        self.set_prev_free(next, location);
    }

    // --- growth -------------------------------------------------------------

    /// Appends `additional` free slots as one address-ordered sub-chain
    /// spliced onto the ring tail.
    fn grow(&mut self, additional: usize) {
        debug_assert!(additional > 0);
        assert!(
            self.capacity() + additional <= MAX_LOCATIONS,
            "link table capacity overflow"
        );
        let start = self.slots.len() as Location;
        let end = start + additional as Location - 1;
        for addr in start..=end {
            self.slots.push(SlotEntry::Free {
                next: if addr < end { addr + 1 } else { NIL },
                prev: if addr > start { addr - 1 } else { NIL },
            });
        }
        // Splice the fresh sub-chain between the current tail and the anchor.
        let tail = self.free_tail;
        self.set_next_free(tail, start);
        self.set_prev_free(start, tail);
        self.free_tail = end;
        log_debug!("link table grew by {additional} slots to {}", self.capacity());
    }

    /// Grows by the configured >1x factor so insertion stays amortized O(1).
    fn grow_auto(&mut self) {
        let cap = self.capacity();
        let target = std::cmp::max(cap * self.growth_num / self.growth_den, cap + 1);
        self.grow(target - cap);
    }

    fn grow_to_cover(&mut self, location: Location) -> Result<(), StorageError> {
        if location as usize > MAX_LOCATIONS {
            return Err(StorageError::bad_location("claim", location));
        }
        let needed = location as usize + 1 - self.slots.len();
        let cap = self.capacity();
        let auto = std::cmp::max(cap * self.growth_num / self.growth_den, cap + 1) - cap;
        self.grow(std::cmp::max(needed, auto));
        Ok(())
    }

    #[inline]
    fn entry(&self, location: Location) -> Option<&SlotEntry<L>> {
        if is_nil(location) {
            return None;
        }
        self.slots.get(location as usize)
    }

    #[inline]
    fn entry_mut(&mut self, location: Location) -> Option<&mut SlotEntry<L>> {
        if is_nil(location) {
            return None;
        }
        self.slots.get_mut(location as usize)
    }
}
