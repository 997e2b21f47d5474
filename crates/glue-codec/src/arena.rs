//! Owner of the memory encoded wire values point into.

use std::ffi::CString;
use std::os::raw::{c_char, c_longlong};

use glue_ffi::{GlueArg, GlueValue};

use crate::c_string;
use crate::error::CodecResult;

/// Backing storage for encoded values.
///
/// Every buffer is a separate heap allocation that is never resized after
/// its address has been handed out, so pointers stay valid while the arena
/// is moved around and until it is dropped.
#[derive(Default)]
pub struct WireArena {
    strings: Vec<CString>,
    bools: Vec<Box<[bool]>>,
    longs: Vec<Box<[c_longlong]>>,
    doubles: Vec<Box<[f64]>>,
    string_arrays: Vec<Box<[*const c_char]>>,
    values: Vec<Box<[GlueValue]>>,
    args: Vec<Box<[GlueArg]>>,
}

impl WireArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, text: &str) -> CodecResult<*const c_char> {
        let owned = c_string(text)?;
        let ptr = owned.as_ptr();
        self.strings.push(owned);
        Ok(ptr)
    }

    pub fn bools(&mut self, items: Box<[bool]>) -> *const bool {
        let ptr = items.as_ptr();
        self.bools.push(items);
        ptr
    }

    pub fn longs(&mut self, items: Box<[c_longlong]>) -> *const c_longlong {
        let ptr = items.as_ptr();
        self.longs.push(items);
        ptr
    }

    pub fn doubles(&mut self, items: Box<[f64]>) -> *const f64 {
        let ptr = items.as_ptr();
        self.doubles.push(items);
        ptr
    }

    /// Interns each string and stores the pointer array.
    pub fn string_array<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) -> CodecResult<*const *const c_char> {
        let ptrs = items
            .into_iter()
            .map(|s| self.string(s))
            .collect::<CodecResult<Vec<_>>>()?
            .into_boxed_slice();
        let ptr = ptrs.as_ptr();
        self.string_arrays.push(ptrs);
        Ok(ptr)
    }

    pub fn values(&mut self, items: Box<[GlueValue]>) -> *const GlueValue {
        let ptr = items.as_ptr();
        self.values.push(items);
        ptr
    }

    pub fn args(&mut self, items: Box<[GlueArg]>) -> *const GlueArg {
        let ptr = items.as_ptr();
        self.args.push(items);
        ptr
    }

    /// Number of buffers held, for diagnostics.
    pub fn allocations(&self) -> usize {
        self.strings.len()
            + self.bools.len()
            + self.longs.len()
            + self.doubles.len()
            + self.string_arrays.len()
            + self.values.len()
            + self.args.len()
    }
}

// SAFETY: every pointer stored in the arena points into a buffer the arena
// itself owns, and the buffers are never mutated after being handed out.
unsafe impl Send for WireArena {}
unsafe impl Sync for WireArena {}

impl std::fmt::Debug for WireArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireArena")
            .field("allocations", &self.allocations())
            .finish()
    }
}
