//! `NativeGlue` backed by the vendor library at link time.
//!
//! Locating the library (search paths, runtime bootstrap) is the embedding
//! application's job; this module only declares the exports.

use std::os::raw::{c_char, c_double, c_int, c_longlong, c_void};

use crate::callbacks::{
    ContextCallback, GlueEndpointStatusCallback, GlueInitCallback, InvocationCallback,
    InvokeAllCallback, PayloadCallback, StreamCallback,
};
use crate::handle::{BorrowedHandle, ResourceHandle};
use crate::native::NativeGlue;
use crate::wire::{GlueArg, GlueValue};

#[link(name = "GlueCLILib")]
extern "C" {
    fn glue_init(app_name: *const c_char, callback: GlueInitCallback, cookie: *mut c_void) -> c_int;
    fn glue_register_endpoint(name: *const c_char, callback: InvocationCallback, cookie: *mut c_void) -> *mut c_void;
    fn glue_register_streaming_endpoint(
        name: *const c_char,
        on_subscribe: StreamCallback,
        on_request: InvocationCallback,
        cookie: *mut c_void,
    ) -> *mut c_void;
    fn glue_open_streaming_branch(endpoint: *mut c_void, branch: *const c_char) -> *mut c_void;
    fn glue_invoke(
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<PayloadCallback>,
        cookie: *mut c_void,
    ) -> c_int;
    fn glue_invoke_all(
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<InvokeAllCallback>,
        cookie: *mut c_void,
    ) -> c_int;
    fn glue_subscribe_context(
        context: *const c_char,
        field_path: *const c_char,
        callback: ContextCallback,
        cookie: *mut c_void,
    ) -> *mut c_void;
    fn glue_subscribe_stream(
        stream: *const c_char,
        callback: PayloadCallback,
        args: *const GlueArg,
        args_len: c_int,
        cookie: *mut c_void,
    ) -> *mut c_void;
    fn glue_subscribe_endpoints_status(callback: GlueEndpointStatusCallback, cookie: *mut c_void) -> *mut c_void;
    fn glue_push_payload(target: *mut c_void, args: *const GlueArg, args_len: c_int, resolve_only: bool) -> c_int;
    fn glue_push_json_payload(target: *mut c_void, json: *const c_char, resolve_only: bool) -> c_int;
    fn glue_push_failure(target: *mut c_void, message: *const c_char) -> c_int;
    fn glue_raise_simple_notification(
        title: *const c_char,
        description: *const c_char,
        severity: c_int,
        cookie: *mut c_void,
    ) -> c_int;
    fn glue_destroy_resource(resource: *mut c_void) -> c_int;
    fn glue_read_context_sync(context: *const c_char) -> *mut c_void;
    fn glue_write_context(context: *const c_char, field_path: *const c_char, value: GlueValue, resolve: bool) -> c_int;
    fn glue_read_b(reader: *mut c_void, path: *const c_char) -> bool;
    fn glue_read_i(reader: *mut c_void, path: *const c_char) -> c_int;
    fn glue_read_l(reader: *mut c_void, path: *const c_char) -> c_longlong;
    fn glue_read_d(reader: *mut c_void, path: *const c_char) -> c_double;
    fn glue_read_s(reader: *mut c_void, path: *const c_char) -> *const c_char;
    fn glue_read_json(reader: *mut c_void, path: *const c_char) -> *const c_char;
    fn glue_read_glue_value(reader: *mut c_void, path: *const c_char) -> GlueValue;
}

/// The process-wide vendor library.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedGlue;

impl NativeGlue for LinkedGlue {
    unsafe fn init(&self, app_name: *const c_char, callback: GlueInitCallback, cookie: *mut c_void) -> c_int {
        glue_init(app_name, callback, cookie)
    }

    unsafe fn register_endpoint(
        &self,
        name: *const c_char,
        callback: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        ResourceHandle::from_raw(glue_register_endpoint(name, callback, cookie))
    }

    unsafe fn register_streaming_endpoint(
        &self,
        name: *const c_char,
        on_subscribe: StreamCallback,
        on_request: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        ResourceHandle::from_raw(glue_register_streaming_endpoint(name, on_subscribe, on_request, cookie))
    }

    unsafe fn open_streaming_branch(&self, endpoint: &ResourceHandle, branch: *const c_char) -> Option<BorrowedHandle> {
        BorrowedHandle::from_raw(glue_open_streaming_branch(endpoint.as_raw(), branch))
    }

    unsafe fn invoke(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<PayloadCallback>,
        cookie: *mut c_void,
    ) -> c_int {
        glue_invoke(method, args, args_len, callback, cookie)
    }

    unsafe fn invoke_all(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<InvokeAllCallback>,
        cookie: *mut c_void,
    ) -> c_int {
        glue_invoke_all(method, args, args_len, callback, cookie)
    }

    unsafe fn subscribe_context(
        &self,
        context: *const c_char,
        field_path: *const c_char,
        callback: ContextCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        ResourceHandle::from_raw(glue_subscribe_context(context, field_path, callback, cookie))
    }

    unsafe fn subscribe_stream(
        &self,
        stream: *const c_char,
        callback: PayloadCallback,
        args: *const GlueArg,
        args_len: c_int,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        ResourceHandle::from_raw(glue_subscribe_stream(stream, callback, args, args_len, cookie))
    }

    unsafe fn subscribe_endpoints_status(
        &self,
        callback: GlueEndpointStatusCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        ResourceHandle::from_raw(glue_subscribe_endpoints_status(callback, cookie))
    }

    unsafe fn push_payload(&self, target: *mut c_void, args: *const GlueArg, args_len: c_int, resolve_only: bool) -> c_int {
        glue_push_payload(target, args, args_len, resolve_only)
    }

    unsafe fn push_json_payload(&self, target: *mut c_void, json: *const c_char, resolve_only: bool) -> c_int {
        glue_push_json_payload(target, json, resolve_only)
    }

    unsafe fn push_failure(&self, target: *mut c_void, message: *const c_char) -> c_int {
        glue_push_failure(target, message)
    }

    unsafe fn raise_simple_notification(
        &self,
        title: *const c_char,
        description: *const c_char,
        severity: c_int,
        cookie: *mut c_void,
    ) -> c_int {
        glue_raise_simple_notification(title, description, severity, cookie)
    }

    unsafe fn destroy_resource(&self, resource: ResourceHandle) -> c_int {
        glue_destroy_resource(resource.into_raw())
    }

    unsafe fn read_context_sync(&self, context: *const c_char) -> Option<BorrowedHandle> {
        BorrowedHandle::from_raw(glue_read_context_sync(context))
    }

    unsafe fn write_context(&self, context: *const c_char, field_path: *const c_char, value: GlueValue, resolve: bool) -> c_int {
        glue_write_context(context, field_path, value, resolve)
    }

    unsafe fn read_b(&self, reader: BorrowedHandle, path: *const c_char) -> bool {
        glue_read_b(reader.as_raw(), path)
    }

    unsafe fn read_i(&self, reader: BorrowedHandle, path: *const c_char) -> c_int {
        glue_read_i(reader.as_raw(), path)
    }

    unsafe fn read_l(&self, reader: BorrowedHandle, path: *const c_char) -> c_longlong {
        glue_read_l(reader.as_raw(), path)
    }

    unsafe fn read_d(&self, reader: BorrowedHandle, path: *const c_char) -> c_double {
        glue_read_d(reader.as_raw(), path)
    }

    unsafe fn read_s(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char {
        glue_read_s(reader.as_raw(), path)
    }

    unsafe fn read_json(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char {
        glue_read_json(reader.as_raw(), path)
    }

    unsafe fn read_glue_value(&self, reader: BorrowedHandle, path: *const c_char) -> GlueValue {
        glue_read_glue_value(reader.as_raw(), path)
    }
}
