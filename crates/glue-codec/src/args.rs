//! Named argument arrays for native calls.

use std::os::raw::c_int;
use std::ptr;

use glue_ffi::GlueArg;

use crate::arena::WireArena;
use crate::codec::encode;
use crate::error::{CodecError, CodecResult};
use crate::value::{HostMap, HostValue};

/// An encoded argument array together with the memory it points into.
///
/// Keep it alive until the native call that receives [`WireArgs::as_ptr`]
/// has returned.
#[derive(Debug, Default)]
pub struct WireArgs {
    arena: WireArena,
    args: Box<[GlueArg]>,
}

impl WireArgs {
    /// Pointer to the first argument, null when there are none.
    pub fn as_ptr(&self) -> *const GlueArg {
        if self.args.is_empty() {
            ptr::null()
        } else {
            self.args.as_ptr()
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Length as passed to the library. Fits by construction.
    pub fn len_c(&self) -> c_int {
        self.args.len() as c_int
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn as_slice(&self) -> &[GlueArg] {
        &self.args
    }
}

// SAFETY: the argument array only points into `arena`, which moves with it.
unsafe impl Send for WireArgs {}
unsafe impl Sync for WireArgs {}

/// Encodes every entry of `map` as a named argument, in map order.
pub fn build_args(map: &HostMap) -> CodecResult<WireArgs> {
    if c_int::try_from(map.len()).is_err() {
        return Err(CodecError::TooLarge { len: map.len() });
    }

    let mut arena = WireArena::new();
    let mut args = Vec::with_capacity(map.len());
    for (name, value) in map {
        args.push(GlueArg {
            name: arena.string(name)?,
            value: encode(value, &mut arena)?,
        });
    }

    Ok(WireArgs {
        arena,
        args: args.into_boxed_slice(),
    })
}

/// Like [`build_args`] for an untyped value. `Null` means no arguments; any
/// other non-map is rejected.
pub fn build_args_from(value: &HostValue) -> CodecResult<WireArgs> {
    match value {
        HostValue::Null => Ok(WireArgs::default()),
        HostValue::Map(map) => build_args(map),
        other => Err(CodecError::InvalidInput(format!(
            "expected a map of arguments, got {}",
            other.type_name()
        ))),
    }
}
