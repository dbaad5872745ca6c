//! Transparent filter/decorator over any location-addressed container
//!
//! A filter owns no values: it holds at most one source container and a
//! relay that subscribes to the source's observer list, forwarding every
//! change event to the filter's own observers. Re-pointing the source
//! synthesizes removal events for everything currently visible, then
//! addition events for everything newly reachable, so downstream
//! observers see a clean teardown and rebuild.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::NIL;
use crate::log_debug;
use crate::storage::slot_store::{SharedStore, SlotStore, StoreValue};
use crate::types::error::{Result, StorageError};
use crate::types::event::StoreEvent;
use crate::types::location::{is_nil, InsertPos, Location};
use crate::types::observer::{Callback, ObserverId, ObserverList, SharedObservers};

/// Non-owning proxy container relaying a source's content and events.
pub struct FilterStore<T: StoreValue> {
    source: Option<SharedStore<T>>,
    observers: SharedObservers<T>,
    relay: Option<ObserverId>,
}

impl<T: StoreValue> Default for FilterStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoreValue> FilterStore<T> {
    /// Creates a filter with no source attached.
    pub fn new() -> Self {
        FilterStore {
            source: None,
            observers: Rc::new(RefCell::new(ObserverList::new())),
            relay: None,
        }
    }

    /// Creates a sourceless filter ready for sharing and composition.
    pub fn new_shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// The currently attached source, if any.
    pub fn source(&self) -> Option<SharedStore<T>> {
        self.source.clone()
    }

    /// Attaches `new_source`, detaching any previous one.
    ///
    /// No-op when `new_source` is the current source. Attaching the
    /// filter to itself is treated as detaching. On detach the filter
    /// walks its currently visible hierarchy and synthesizes removal
    /// events (children before parents) before unsubscribing; on attach
    /// it subscribes first, then synthesizes addition events (parents
    /// before children, siblings in order).
    pub fn set_source(
        this: &Rc<RefCell<Self>>,
        new_source: Option<SharedStore<T>>,
    ) -> Result<()> {
        // Self-attachment would relay events in a cycle; treat as none.
        let new_source = match new_source {
            Some(src)
                if Rc::as_ptr(&src) as *const () == Rc::as_ptr(this) as *const () =>
            {
                None
            }
            other => other,
        };

        {
            let me = this.borrow();
            match (&me.source, &new_source) {
                (None, None) => return Ok(()),
                (Some(a), Some(b))
                    if Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const () =>
                {
                    return Ok(());
                }
                _ => {}
            }
        }

        // Teardown: synthesize removals while the old source is still
        // readable through the filter, then unsubscribe.
        let old_source = this.borrow().source.clone();
        if let Some(old) = &old_source {
            let observers = Rc::clone(&this.borrow().observers);
            let nodes = visible_nodes(&*old.borrow())?;
            for (location, pos, value) in nodes.into_iter().rev() {
                observers.borrow_mut().notify(&StoreEvent::removed(location, pos, value));
            }
            let relay = this.borrow_mut().relay.take();
            if let Some(id) = relay {
                let _ = old.borrow_mut().remove_observer(id)?;
            }
            this.borrow_mut().source = None;
        }

        // Attach: subscribe before the rebuild so no mutation between the
        // two can be missed, then synthesize additions.
        if let Some(src) = new_source {
            let observers = Rc::clone(&this.borrow().observers);
            let relay_observers = Rc::clone(&observers);
            let id = src.borrow_mut().add_observer(Box::new(move |event| {
                relay_observers.borrow_mut().notify(event);
            }))?;
            {
                let mut me = this.borrow_mut();
                me.relay = Some(id);
                me.source = Some(Rc::clone(&src));
            }
            let nodes = visible_nodes(&*src.borrow())?;
            for (location, pos, _) in nodes {
                observers.borrow_mut().notify(&StoreEvent::added(location, pos));
            }
        }

        log_debug!("filter source re-pointed");
        Ok(())
    }

    fn sourceless_write(&self, op: &str) -> crate::types::error::Error {
        StorageError::IllegalStore(format!("{op}: filter has no source attached")).into()
    }

    fn guard_reentry(&self) -> Result<()> {
        // While the relay fans an event out, the filter's observer list
        // is mutably borrowed; writing through the filter at that moment
        // would re-enter the source mutation that is still in progress.
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
}

/// Preorder walk of everything reachable through a container's location
/// API, with each node's structural position and value.
fn visible_nodes<T: StoreValue>(
    store: &dyn SlotStore<T>,
) -> Result<Vec<(Location, InsertPos, T)>> {
    let mut out = Vec::new();
    let mut cur = store.child_location(NIL, true)?;
    while !is_nil(cur) {
        let prev = store.sibling_location(cur, false)?;
        let pos = if is_nil(prev) {
            InsertPos::FirstChildOf(store.parent_location(cur)?)
        } else {
            InsertPos::After(prev)
        };
        if let Some(value) = store.get_at(cur) {
            out.push((cur, pos, value));
        }
        let child = store.child_location(cur, true)?;
        if !is_nil(child) {
            cur = child;
            continue;
        }
        loop {
            let next = store.sibling_location(cur, true)?;
            if !is_nil(next) {
                cur = next;
                break;
            }
            let parent = store.parent_location(cur)?;
            if is_nil(parent) {
                cur = NIL;
                break;
            }
            cur = parent;
        }
    }
    Ok(out)
}

impl<T: StoreValue> SlotStore<T> for FilterStore<T> {
    fn get_at(&self, location: Location) -> Option<T> {
        self.source.as_ref().and_then(|s| s.borrow().get_at(location))
    }

    fn is_valid_at(&self, location: Location) -> bool {
        self.source.as_ref().map(|s| s.borrow().is_valid_at(location)).unwrap_or(false)
    }

    fn len(&self) -> usize {
        self.source.as_ref().map(|s| s.borrow().len()).unwrap_or(0)
    }

    fn empty_location(&mut self) -> Location {
        match &self.source {
            Some(s) => s.borrow_mut().empty_location(),
            None => NIL,
        }
    }

    fn insert_at(&mut self, pos: InsertPos, location: Location, value: T) -> Result<()> {
        self.guard_reentry()?;
        match &self.source {
            Some(s) => s.borrow_mut().insert_at(pos, location, value),
            None => Err(self.sourceless_write("insert_at")),
        }
    }

    fn set_at(&mut self, location: Location, value: Option<T>) -> Result<()> {
        self.guard_reentry()?;
        match &self.source {
            Some(s) => s.borrow_mut().set_at(location, value),
            // Sourceless filters accept only the trivial no-op request.
            None if is_nil(location) && value.is_none() => Ok(()),
            None => Err(self.sourceless_write("set_at")),
        }
    }

    fn child_location(&self, parent: Location, forward: bool) -> Result<Location> {
        match &self.source {
            Some(s) => s.borrow().child_location(parent, forward),
            None if is_nil(parent) => Ok(NIL),
            None => Err(StorageError::bad_location("child_location", parent).into()),
        }
    }

    fn sibling_location(&self, location: Location, forward: bool) -> Result<Location> {
        match &self.source {
            Some(s) => s.borrow().sibling_location(location, forward),
            None => Err(StorageError::bad_location("sibling_location", location).into()),
        }
    }

    fn parent_location(&self, location: Location) -> Result<Location> {
        match &self.source {
            Some(s) => s.borrow().parent_location(location),
            None => Err(StorageError::bad_location("parent_location", location).into()),
        }
    }

    fn location_of(&self, value: &T, from: Location, forward: bool) -> Location {
        self.source
            .as_ref()
            .map(|s| s.borrow().location_of(value, from, forward))
            .unwrap_or(NIL)
    }

    fn find_less_greater(
        &self,
        value: &T,
        from: Location,
        forward: bool,
        greater: bool,
    ) -> Location {
        self.source
            .as_ref()
            .map(|s| s.borrow().find_less_greater(value, from, forward, greater))
            .unwrap_or(NIL)
    }

    fn clear(&mut self) -> Result<()> {
        self.guard_reentry()?;
        match &self.source {
            Some(s) => s.borrow_mut().clear(),
            None => Ok(()),
        }
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

impl<T: StoreValue> Drop for FilterStore<T> {
    fn drop(&mut self) {
        // Best-effort unsubscribe; the source may already be gone.
        if let (Some(src), Some(id)) = (&self.source, self.relay.take()) {
            if let Ok(mut source) = src.try_borrow_mut() {
                let _ = source.remove_observer(id);
            }
        }
    }
}
