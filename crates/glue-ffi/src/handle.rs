//! Typed opaque handles.
//!
//! The library hands out bare addresses for readers, result endpoints and
//! resources. They are wrapped here with an ownership tag so the type system
//! tells them apart:
//!
//! * [`NativeOwned`] handles belong to the library. The host may pass them
//!   back to accessor calls and copy them freely but never releases them.
//! * [`HostOwned`] handles must be released exactly once through
//!   [`NativeGlue::destroy_resource`](crate::NativeGlue::destroy_resource),
//!   which takes the handle by value. They are neither `Clone` nor `Copy`.

use std::fmt;
use std::marker::PhantomData;
use std::os::raw::c_void;
use std::ptr::NonNull;

/// Tag for handles the library owns.
#[derive(Debug)]
pub enum NativeOwned {}

/// Tag for handles the host must dispose.
#[derive(Debug)]
pub enum HostOwned {}

/// Non-null opaque pointer tagged with its owner.
#[repr(transparent)]
pub struct NativeHandle<O> {
    raw: NonNull<c_void>,
    _owner: PhantomData<fn() -> O>,
}

/// Reader or result endpoint lent by the library.
pub type BorrowedHandle = NativeHandle<NativeOwned>;

/// Subscription, endpoint registration or other resource the host releases.
pub type ResourceHandle = NativeHandle<HostOwned>;

impl<O> NativeHandle<O> {
    /// Wraps a raw address returned by the library; `None` for null.
    ///
    /// # Safety
    /// `raw` must be null or an address the library produced for a handle
    /// of this ownership kind.
    pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(|raw| NativeHandle {
            raw,
            _owner: PhantomData,
        })
    }

    /// The address to hand back to the library.
    pub fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    /// Address as an integer, for logging and bookkeeping.
    pub fn addr(&self) -> usize {
        self.raw.as_ptr() as usize
    }
}

impl ResourceHandle {
    /// Gives up ownership without releasing the resource.
    pub fn into_raw(self) -> *mut c_void {
        self.raw.as_ptr()
    }
}

impl Clone for BorrowedHandle {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for BorrowedHandle {}

// SAFETY: the handles are opaque tokens; the library synchronises access to
// the objects behind them and accepts them from any thread.
unsafe impl<O> Send for NativeHandle<O> {}
unsafe impl<O> Sync for NativeHandle<O> {}

impl<O> PartialEq for NativeHandle<O> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<O> Eq for NativeHandle<O> {}

impl<O> fmt::Debug for NativeHandle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.addr())
    }
}
