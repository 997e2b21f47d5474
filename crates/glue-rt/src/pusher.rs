//! Pushing results back through the library.

use std::fmt;
use std::os::raw::{c_int, c_void};
use std::sync::Arc;

use glue_codec::{build_args, build_args_from, c_string, HostMap, HostValue, WireArgs};
use glue_ffi::{BorrowedHandle, NativeGlue, GLUE_OK};

use crate::error::{GlueError, GlueResult};

/// Sends results to the result endpoint of one incoming call.
///
/// May be used any number of times, from any thread, which is how streaming
/// results are produced. Every method returns the status of the native
/// push; encoding errors are raised before anything reaches the library.
#[derive(Clone)]
pub struct ResultPusher {
    native: Arc<dyn NativeGlue>,
    endpoint: String,
    target: Option<BorrowedHandle>,
}

impl ResultPusher {
    pub(crate) fn new(native: Arc<dyn NativeGlue>, endpoint: String, target: Option<BorrowedHandle>) -> Self {
        Self {
            native,
            endpoint,
            target,
        }
    }

    /// Endpoint the originating call was made on.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn push(&self, result: &HostMap) -> GlueResult<c_int> {
        let args = build_args(result)?;
        let target = self.target()?;
        Ok(unsafe { push_args(&*self.native, target.as_raw(), &args) })
    }

    /// Like [`push`](Self::push) for an untyped value; must be a map or null.
    pub fn push_value(&self, result: &HostValue) -> GlueResult<c_int> {
        let args = build_args_from(result)?;
        let target = self.target()?;
        Ok(unsafe { push_args(&*self.native, target.as_raw(), &args) })
    }

    pub fn push_json(&self, result: &serde_json::Value) -> GlueResult<c_int> {
        let target = self.target()?;
        unsafe { push_json(&*self.native, target.as_raw(), result) }
    }

    /// Completes the call with an error message instead of a result.
    pub fn push_failure(&self, message: &str) -> GlueResult<c_int> {
        let message = c_string(message)?;
        let target = self.target()?;
        let status = unsafe { self.native.push_failure(target.as_raw(), message.as_ptr()) };
        log_status("glue_push_failure", status);
        Ok(status)
    }

    fn target(&self) -> GlueResult<BorrowedHandle> {
        self.target.ok_or_else(|| GlueError::NoResultTarget {
            endpoint: self.endpoint.clone(),
        })
    }
}

impl fmt::Debug for ResultPusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultPusher")
            .field("endpoint", &self.endpoint)
            .field("target", &self.target)
            .finish()
    }
}

/// Pushes an encoded argument array to a result endpoint, streaming
/// endpoint or branch.
///
/// # Safety
/// `target` must be a push target the library handed out and that is still
/// alive.
pub(crate) unsafe fn push_args(native: &dyn NativeGlue, target: *mut c_void, args: &WireArgs) -> c_int {
    let status = native.push_payload(target, args.as_ptr(), args.len_c(), false);
    log_status("glue_push_payload", status);
    status
}

/// # Safety
/// As [`push_args`].
pub(crate) unsafe fn push_json(
    native: &dyn NativeGlue,
    target: *mut c_void,
    value: &serde_json::Value,
) -> GlueResult<c_int> {
    let json = c_string(&serde_json::to_string(value)?)?;
    let status = native.push_json_payload(target, json.as_ptr(), false);
    log_status("glue_push_json_payload", status);
    Ok(status)
}

pub(crate) fn log_status(call: &str, status: c_int) {
    if status != GLUE_OK {
        log::warn!("{call} returned status {status}");
    }
}
