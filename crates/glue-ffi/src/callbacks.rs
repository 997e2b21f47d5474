//! Signatures of the functions the library calls back into.
//!
//! Every callback receives the `cookie` that was passed when it was
//! registered. String parameters are UTF-8, and a null payload pointer means
//! "absent". Callbacks fire on library-owned threads.

use std::os::raw::{c_char, c_int, c_void};

use crate::wire::{GluePayload, GlueValue};

/// `(state, message, payload?, cookie)`
pub type GlueInitCallback =
    extern "C" fn(state: c_int, message: *const c_char, payload: *const GluePayload, cookie: *mut c_void);

/// `(endpoint, origin, available, cookie)`
pub type GlueEndpointStatusCallback =
    extern "C" fn(endpoint: *const c_char, origin: *const c_char, available: bool, cookie: *mut c_void);

/// Incoming call on a registered endpoint:
/// `(endpoint, cookie, payload?, result_endpoint)`.
pub type InvocationCallback = extern "C" fn(
    endpoint: *const c_char,
    cookie: *mut c_void,
    payload: *const GluePayload,
    result_endpoint: *mut c_void,
);

/// Result of an invocation or a stream delivery: `(origin, cookie, payload?)`.
pub type PayloadCallback =
    extern "C" fn(origin: *const c_char, cookie: *mut c_void, payload: *const GluePayload);

/// Results of an invoke-all: `(origin, cookie, payloads, payloads_len)`.
pub type InvokeAllCallback = extern "C" fn(
    origin: *const c_char,
    cookie: *mut c_void,
    payloads: *const GluePayload,
    payloads_len: c_int,
);

/// Subscription request on a streaming endpoint. Returning `false` rejects
/// the subscriber; the callee may then store a message in `out_error`, which
/// must stay valid until the next call on the same endpoint.
pub type StreamCallback = extern "C" fn(
    origin: *const c_char,
    cookie: *mut c_void,
    payload: *const GluePayload,
    out_error: *mut *const c_char,
) -> bool;

/// `(context, field_path, value?, cookie)`
pub type ContextCallback =
    extern "C" fn(context: *const c_char, field_path: *const c_char, value: *const GlueValue, cookie: *mut c_void);
