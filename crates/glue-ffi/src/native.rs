//! The call surface of the native library.
//!
//! One method per C export. Methods are `unsafe` because they take raw
//! pointers whose validity the caller guarantees: strings are NUL-terminated
//! UTF-8, argument arrays hold `args_len` initialised entries and stay alive
//! for the duration of the call, and every callback/cookie pair stays valid
//! for as long as the library may call it.
//!
//! Resource-producing calls return `None` when the library hands back null.

use std::os::raw::{c_char, c_double, c_int, c_longlong, c_void};

use crate::callbacks::{
    ContextCallback, GlueEndpointStatusCallback, GlueInitCallback, InvocationCallback,
    InvokeAllCallback, PayloadCallback, StreamCallback,
};
use crate::handle::{BorrowedHandle, ResourceHandle};
use crate::wire::{GlueArg, GlueValue};

pub trait NativeGlue: Send + Sync + 'static {
    /// Starts connecting. State transitions are reported to `callback`.
    unsafe fn init(&self, app_name: *const c_char, callback: GlueInitCallback, cookie: *mut c_void) -> c_int;

    unsafe fn register_endpoint(
        &self,
        name: *const c_char,
        callback: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle>;

    /// `on_subscribe` accepts or rejects subscribers, `on_request` receives
    /// the subscription requests that were accepted.
    unsafe fn register_streaming_endpoint(
        &self,
        name: *const c_char,
        on_subscribe: StreamCallback,
        on_request: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle>;

    unsafe fn open_streaming_branch(
        &self,
        endpoint: &ResourceHandle,
        branch: *const c_char,
    ) -> Option<BorrowedHandle>;

    unsafe fn invoke(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<PayloadCallback>,
        cookie: *mut c_void,
    ) -> c_int;

    unsafe fn invoke_all(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<InvokeAllCallback>,
        cookie: *mut c_void,
    ) -> c_int;

    unsafe fn subscribe_context(
        &self,
        context: *const c_char,
        field_path: *const c_char,
        callback: ContextCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle>;

    unsafe fn subscribe_stream(
        &self,
        stream: *const c_char,
        callback: PayloadCallback,
        args: *const GlueArg,
        args_len: c_int,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle>;

    unsafe fn subscribe_endpoints_status(
        &self,
        callback: GlueEndpointStatusCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle>;

    /// `target` is a result endpoint, a streaming endpoint or a branch.
    unsafe fn push_payload(
        &self,
        target: *mut c_void,
        args: *const GlueArg,
        args_len: c_int,
        resolve_only: bool,
    ) -> c_int;

    unsafe fn push_json_payload(&self, target: *mut c_void, json: *const c_char, resolve_only: bool) -> c_int;

    unsafe fn push_failure(&self, target: *mut c_void, message: *const c_char) -> c_int;

    unsafe fn raise_simple_notification(
        &self,
        title: *const c_char,
        description: *const c_char,
        severity: c_int,
        cookie: *mut c_void,
    ) -> c_int;

    /// Releases a resource. Consuming the handle makes a second release of
    /// the same handle impossible to express.
    unsafe fn destroy_resource(&self, resource: ResourceHandle) -> c_int;

    unsafe fn read_context_sync(&self, context: *const c_char) -> Option<BorrowedHandle>;

    unsafe fn write_context(
        &self,
        context: *const c_char,
        field_path: *const c_char,
        value: GlueValue,
        resolve: bool,
    ) -> c_int;

    unsafe fn read_b(&self, reader: BorrowedHandle, path: *const c_char) -> bool;
    unsafe fn read_i(&self, reader: BorrowedHandle, path: *const c_char) -> c_int;
    unsafe fn read_l(&self, reader: BorrowedHandle, path: *const c_char) -> c_longlong;
    unsafe fn read_d(&self, reader: BorrowedHandle, path: *const c_char) -> c_double;
    /// The returned string is owned by the library; null when absent.
    unsafe fn read_s(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char;
    unsafe fn read_json(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char;
    /// The returned value points into library-owned memory.
    unsafe fn read_glue_value(&self, reader: BorrowedHandle, path: *const c_char) -> GlueValue;
}
