//! Observer registration and synchronous event fan-out
//!
//! Containers own an [`ObserverList`] and invoke it from within each
//! mutating call. Dispatch is synchronous and reentrant by design (single
//! writer, no task queue); a "currently notifying" flag rejects
//! observer-list changes made from inside a callback instead of leaving
//! that as an undocumented caller obligation.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::types::error::{Result, StorageError};
use crate::types::event::StoreEvent;

/// Handle returned by [`ObserverList::add_observer`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Boxed observer callback.
pub type Callback<T> = Box<dyn FnMut(&StoreEvent<T>)>;

/// Ordered list of observers with synchronous fan-out.
pub struct ObserverList<T> {
    entries: Vec<(ObserverId, Callback<T>)>,
    next_id: u64,
    notifying: Cell<bool>,
}

/// A container observer list shared with filter relays.
pub type SharedObservers<T> = Rc<std::cell::RefCell<ObserverList<T>>>;

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObserverList<T> {
    /// Creates an empty observer list.
    pub fn new() -> Self {
        ObserverList { entries: Vec::new(), next_id: 1, notifying: Cell::new(false) }
    }

    /// Registers `callback` and returns its removal handle.
    ///
    /// Rejected while a notification fan-out is in progress.
    pub fn add_observer(&mut self, callback: Callback<T>) -> Result<ObserverId> {
        self.guard()?;
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        Ok(id)
    }

    /// Unregisters the observer behind `id`; returns whether it existed.
    ///
    /// Rejected while a notification fan-out is in progress.
    pub fn remove_observer(&mut self, id: ObserverId) -> Result<bool> {
        self.guard()?;
        let before = self.entries.len();
        self.entries.retain(|(eid, _)| *eid != id);
        Ok(self.entries.len() != before)
    }

    /// `true` if at least one observer is registered.
    pub fn has_observers(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` while a fan-out is in progress on this list.
    pub fn is_notifying(&self) -> bool {
        self.notifying.get()
    }

    /// Delivers `event` to every observer, in registration order.
    ///
    /// Runs synchronously inside the mutating call that produced the
    /// event. Observers must not mutate the same container from within
    /// the callback; containers check [`is_notifying`](Self::is_notifying)
    /// and reject such reentry.
    pub fn notify(&mut self, event: &StoreEvent<T>) {
        if self.entries.is_empty() {
            return;
        }
        self.notifying.set(true);
        for (_, callback) in self.entries.iter_mut() {
            callback(event);
        }
        self.notifying.set(false);
    }

    fn guard(&self) -> Result<()> {
        if self.notifying.get() {
            return Err(StorageError::IllegalStore(
                "observer list changed during notification fan-out".into(),
            )
            .into());
        }
        Ok(())
    }
}

impl<T> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.entries.len())
            .field("notifying", &self.notifying.get())
            .finish()
    }
}
