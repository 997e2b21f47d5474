//! Keep-alive table for host state reachable from native callbacks.
//!
//! The library only ever sees a [`CallbackId`], passed as the `cookie`
//! pointer. Callbacks resolve it back to their state through the registry on
//! every delivery, so a delivery that races with unregistration finds nothing
//! and is dropped instead of touching freed memory.

use std::fmt;
use std::num::NonZeroU64;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::Mutex;

/// Identifier of a registered callback. Never zero and never reused within a
/// process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(NonZeroU64);

impl CallbackId {
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// The cookie handed to the library.
    pub fn as_cookie(self) -> *mut c_void {
        self.0.get() as usize as *mut c_void
    }

    /// Recovers the id from a cookie; `None` for a null cookie.
    pub fn from_cookie(cookie: *mut c_void) -> Option<Self> {
        NonZeroU64::new(cookie as usize as u64).map(CallbackId)
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// Registered entries keyed by id, behind a single lock.
///
/// Lookups clone the `Arc` under the lock and return it, so callers run
/// handlers without holding the lock and a handler may unregister itself.
pub struct CallbackRegistry<T> {
    entries: Mutex<FxHashMap<CallbackId, Arc<T>>>,
    next_id: AtomicU64,
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, entry: T) -> CallbackId {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        // the counter starts at one and a u64 does not wrap in practice
        let id = CallbackId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN));
        self.entries.lock().insert(id, Arc::new(entry));
        id
    }

    /// Removes an entry. Returns `false` if it was already gone.
    pub fn unregister(&self, id: CallbackId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Removes and returns an entry; at most one caller gets it.
    pub fn take(&self, id: CallbackId) -> Option<Arc<T>> {
        self.entries.lock().remove(&id)
    }

    pub fn get(&self, id: CallbackId) -> Option<Arc<T>> {
        self.entries.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}
