//! Conversion between host values and the Glue wire format.
//!
//! [`codec`] turns [`GlueValue`](glue_ffi::GlueValue)s into [`HostValue`]s and
//! back, [`args`] assembles named argument arrays for native calls. Encoded
//! memory lives in a [`WireArena`] that must outlive the native call it is
//! handed to.

pub mod arena;
pub mod args;
pub mod codec;
pub mod error;
pub mod value;

pub use arena::WireArena;
pub use args::{build_args, build_args_from, WireArgs};
pub use codec::{decode, decode_arg_list, decode_payload, encode, encode_records, MAX_DEPTH};
pub use error::{CodecError, CodecResult};
pub use value::{HostMap, HostValue};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Converts a name or message to a C string for a native call.
pub fn c_string(text: &str) -> CodecResult<CString> {
    CString::new(text).map_err(|err| CodecError::InteriorNul {
        offset: err.nul_position(),
    })
}

/// Reads a library-owned C string, replacing invalid UTF-8. `None` for null.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays alive
/// for the duration of the call.
pub unsafe fn lossy_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}
