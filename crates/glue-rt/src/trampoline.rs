//! The functions the library calls back into, and the host state behind
//! them.
//!
//! Every callback category shares one process-wide registry. The cookie
//! passed to the library is the [`CallbackId`] of the registration; each
//! delivery looks it up again, so deliveries that arrive after
//! unregistration are dropped. Every `extern "C"` body runs under
//! `catch_unwind`: a panic must never unwind into native frames.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::Arc;

use glue_codec::{c_string, decode, lossy_string, HostValue};
use fxhash::FxHashMap;
use glue_ffi::{BorrowedHandle, GluePayload, GlueState, GlueValue, NativeGlue};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::events::{
    CallResult, ContextUpdate, EndpointCall, EndpointHandler, EndpointStatus, StateHandler, SubscribeHandler,
};
use crate::pusher::ResultPusher;
use crate::registry::{CallbackId, CallbackRegistry};

pub(crate) type ResultCallback = Box<dyn FnOnce(Option<CallResult>) + Send>;
pub(crate) type ResultsCallback = Box<dyn FnOnce(Vec<CallResult>) + Send>;

/// Host state of one registered callback.
pub(crate) enum Trampoline {
    Init(InitState),
    Endpoint(EndpointState),
    Streaming(StreamingState),
    /// One-shot; claimed by the first delivery.
    Invoke(Mutex<Option<ResultCallback>>),
    /// One-shot; all instance results arrive in a single delivery.
    InvokeAll(Mutex<Option<ResultsCallback>>),
    Context(Box<dyn Fn(ContextUpdate) + Send + Sync>),
    Stream(Box<dyn Fn(CallResult) + Send + Sync>),
    EndpointStatus(Box<dyn Fn(EndpointStatus) + Send + Sync>),
}

impl Trampoline {
    fn kind(&self) -> &'static str {
        match self {
            Trampoline::Init(_) => "init",
            Trampoline::Endpoint(_) => "endpoint",
            Trampoline::Streaming(_) => "streaming endpoint",
            Trampoline::Invoke(_) => "invoke",
            Trampoline::InvokeAll(_) => "invoke-all",
            Trampoline::Context(_) => "context",
            Trampoline::Stream(_) => "stream",
            Trampoline::EndpointStatus(_) => "endpoint status",
        }
    }
}

static TRAMPOLINES: Lazy<CallbackRegistry<Trampoline>> = Lazy::new(CallbackRegistry::new);

pub(crate) fn register(trampoline: Trampoline) -> CallbackId {
    let kind = trampoline.kind();
    let id = TRAMPOLINES.register(trampoline);
    log::debug!("Registered {kind} callback {id}");
    id
}

pub(crate) fn unregister(id: CallbackId) -> bool {
    let removed = TRAMPOLINES.unregister(id);
    if removed {
        log::debug!("Unregistered callback {id}");
    }
    removed
}

/// Number of callbacks currently reachable from the library.
pub fn pending_callbacks() -> usize {
    TRAMPOLINES.len()
}

/// Whether a delivery to `id` would still reach a handler.
pub fn is_registered(id: CallbackId) -> bool {
    TRAMPOLINES.contains(id)
}

fn lookup(cookie: *mut c_void, kind: &str) -> Option<Arc<Trampoline>> {
    let Some(id) = CallbackId::from_cookie(cookie) else {
        log::warn!("{kind} callback delivered without a cookie");
        return None;
    };
    let found = TRAMPOLINES.get(id);
    if found.is_none() {
        log::debug!("Dropping {kind} delivery for released callback {id}");
    }
    found
}

/// Like [`lookup`] but unregisters the entry, for one-shot callbacks.
fn claim(cookie: *mut c_void, kind: &str) -> Option<Arc<Trampoline>> {
    let Some(id) = CallbackId::from_cookie(cookie) else {
        log::warn!("{kind} callback delivered without a cookie");
        return None;
    };
    let found = TRAMPOLINES.take(id);
    match found {
        Some(_) => log::debug!("Released one-shot {kind} callback {id}"),
        None => log::debug!("Dropping repeated {kind} delivery for {id}"),
    }
    found
}

fn mismatch(expected: &str, found: &Trampoline) {
    log::error!("Expected a {expected} callback, the cookie belongs to a {} callback", found.kind());
}

/// Runs `f`, turning a panic into a logged `None`.
pub(crate) fn call_guarded<R>(label: &str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            log::error!("{label} panicked: {}", panic_message(payload.as_ref()));
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

// --- Initialization ---

/// Where the outcome of the initialization handshake goes.
pub(crate) enum Completion {
    /// An async task awaiting a [`Handshake`](crate::handshake::Handshake).
    Task(oneshot::Sender<bool>),
    /// A thread blocked in `initialize_blocking`.
    Thread(crossbeam::channel::Sender<bool>),
}

impl Completion {
    fn complete(self, initialized: bool) {
        let delivered = match self {
            Completion::Task(tx) => tx.send(initialized).is_ok(),
            Completion::Thread(tx) => tx.try_send(initialized).is_ok(),
        };
        if !delivered {
            log::debug!("Initialization finished after its waiter went away");
        }
    }
}

pub(crate) struct InitState {
    on_state_change: Option<StateHandler>,
    completion: Mutex<Option<Completion>>,
}

impl InitState {
    pub(crate) fn new(on_state_change: Option<StateHandler>, completion: Completion) -> Self {
        Self {
            on_state_change,
            completion: Mutex::new(Some(completion)),
        }
    }

    /// Forwards every transition; the first terminal state resolves the
    /// handshake.
    fn transition(&self, state: GlueState, message: &str) {
        log::info!("Glue state {state:?}: {message}");
        if let Some(handler) = &self.on_state_change {
            call_guarded("State change handler", || handler(state, message));
        }
        if state.is_terminal() {
            if let Some(completion) = self.completion.lock().take() {
                completion.complete(state == GlueState::Initialized);
            }
        }
    }
}

pub(crate) extern "C" fn init_trampoline(
    state: c_int,
    message: *const c_char,
    _payload: *const GluePayload,
    cookie: *mut c_void,
) {
    call_guarded("Init callback", || {
        let Some(trampoline) = lookup(cookie, "init") else {
            return;
        };
        let Trampoline::Init(init) = &*trampoline else {
            return mismatch("init", &trampoline);
        };
        let message = unsafe { lossy_string(message) }.unwrap_or_default();
        init.transition(GlueState::from(state), &message);
    });
}

// --- Endpoints ---

pub(crate) struct EndpointState {
    native: Arc<dyn NativeGlue>,
    handler: EndpointHandler,
}

impl EndpointState {
    pub(crate) fn new(native: Arc<dyn NativeGlue>, handler: EndpointHandler) -> Self {
        Self { native, handler }
    }

    /// Decodes the call, runs the handler and reports failures to the
    /// caller through the result endpoint.
    unsafe fn dispatch(&self, endpoint: *const c_char, payload: *const GluePayload, result_endpoint: *mut c_void) {
        let name = lossy_string(endpoint).unwrap_or_default();
        let pusher = ResultPusher::new(
            self.native.clone(),
            name.clone(),
            BorrowedHandle::from_raw(result_endpoint),
        );

        let call = match EndpointCall::decode(name, None, payload) {
            Ok(call) => call,
            Err(err) => {
                log::error!("Failed to decode call on {}: {err}", pusher.endpoint());
                report_failure(&pusher, &err.to_string());
                return;
            }
        };

        match call_guarded("Endpoint handler", || (self.handler)(call, pusher.clone())) {
            Some(Ok(())) => {}
            Some(Err(report)) => {
                log::error!("Handler for {} failed: {report}", pusher.endpoint());
                report_failure(&pusher, &report.to_string());
            }
            None => report_failure(&pusher, "endpoint handler panicked"),
        }
    }
}

fn report_failure(pusher: &ResultPusher, message: &str) {
    if let Err(err) = pusher.push_failure(message) {
        log::warn!("Could not report failure on {}: {err}", pusher.endpoint());
    }
}

pub(crate) extern "C" fn endpoint_trampoline(
    endpoint: *const c_char,
    cookie: *mut c_void,
    payload: *const GluePayload,
    result_endpoint: *mut c_void,
) {
    call_guarded("Endpoint callback", || {
        let Some(trampoline) = lookup(cookie, "endpoint") else {
            return;
        };
        match &*trampoline {
            Trampoline::Endpoint(state) => unsafe { state.dispatch(endpoint, payload, result_endpoint) },
            Trampoline::Streaming(state) => unsafe { state.requests.dispatch(endpoint, payload, result_endpoint) },
            other => mismatch("endpoint", other),
        }
    });
}

pub(crate) struct StreamingState {
    name: String,
    requests: EndpointState,
    on_subscribe: SubscribeHandler,
    /// Rejection messages handed out through `out_error`. The library reads
    /// them after the callback returns, possibly while another thread is
    /// being rejected, so each distinct message lives as long as the
    /// endpoint.
    rejections: Mutex<FxHashMap<String, CString>>,
}

impl StreamingState {
    pub(crate) fn new(name: String, requests: EndpointState, on_subscribe: SubscribeHandler) -> Self {
        Self {
            name,
            requests,
            on_subscribe,
            rejections: Mutex::new(FxHashMap::default()),
        }
    }

    unsafe fn admit(&self, origin: *const c_char, payload: *const GluePayload, out_error: *mut *const c_char) -> bool {
        let call = match EndpointCall::decode(self.name.clone(), lossy_string(origin), payload) {
            Ok(call) => call,
            Err(err) => return self.reject(out_error, &format!("malformed subscription request: {err}")),
        };

        match call_guarded("Subscription handler", || (self.on_subscribe)(&call)) {
            Some(Ok(())) => {
                log::debug!("Accepted subscriber {:?} on {}", call.origin, self.name);
                true
            }
            Some(Err(message)) => self.reject(out_error, &message),
            None => self.reject(out_error, "subscription handler panicked"),
        }
    }

    unsafe fn reject(&self, out_error: *mut *const c_char, message: &str) -> bool {
        log::info!("Rejected subscriber on {}: {message}", self.name);
        if out_error.is_null() {
            return false;
        }
        let mut rejections = self.rejections.lock();
        *out_error = match rejections.entry(message.replace('\0', " ")) {
            Entry::Occupied(entry) => entry.get().as_ptr(),
            Entry::Vacant(entry) => match c_string(entry.key()) {
                Ok(text) => entry.insert(text).as_ptr(),
                Err(_) => ptr::null(),
            },
        };
        false
    }
}

pub(crate) extern "C" fn stream_subscribe_trampoline(
    origin: *const c_char,
    cookie: *mut c_void,
    payload: *const GluePayload,
    out_error: *mut *const c_char,
) -> bool {
    call_guarded("Stream subscription callback", || {
        let Some(trampoline) = lookup(cookie, "stream subscription") else {
            return false;
        };
        let Trampoline::Streaming(state) = &*trampoline else {
            mismatch("streaming endpoint", &trampoline);
            return false;
        };
        unsafe { state.admit(origin, payload, out_error) }
    })
    .unwrap_or(false)
}

// --- Invocation results ---

pub(crate) extern "C" fn invoke_trampoline(origin: *const c_char, cookie: *mut c_void, payload: *const GluePayload) {
    call_guarded("Invoke callback", || {
        let Some(trampoline) = claim(cookie, "invoke") else {
            return;
        };
        let Trampoline::Invoke(slot) = &*trampoline else {
            return mismatch("invoke", &trampoline);
        };
        let Some(callback) = slot.lock().take() else {
            return;
        };

        let origin = unsafe { lossy_string(origin) };
        let result = match unsafe { payload.as_ref() } {
            None => None,
            Some(payload) => match unsafe { CallResult::decode(origin, payload) } {
                Ok(result) => Some(result),
                Err(err) => {
                    log::error!("Failed to decode invocation result: {err}");
                    None
                }
            },
        };
        call_guarded("Result handler", || callback(result));
    });
}

pub(crate) extern "C" fn invoke_all_trampoline(
    origin: *const c_char,
    cookie: *mut c_void,
    payloads: *const GluePayload,
    payloads_len: c_int,
) {
    call_guarded("Invoke-all callback", || {
        let Some(trampoline) = claim(cookie, "invoke-all") else {
            return;
        };
        let Trampoline::InvokeAll(slot) = &*trampoline else {
            return mismatch("invoke-all", &trampoline);
        };
        let Some(callback) = slot.lock().take() else {
            return;
        };

        let origin = unsafe { lossy_string(origin) };
        let payloads: &[GluePayload] = if payloads.is_null() || payloads_len <= 0 {
            &[]
        } else {
            unsafe { slice::from_raw_parts(payloads, payloads_len as usize) }
        };
        let results = payloads
            .iter()
            .filter_map(|payload| match unsafe { CallResult::decode(origin.clone(), payload) } {
                Ok(result) => Some(result),
                Err(err) => {
                    log::error!("Skipping undecodable invoke-all result: {err}");
                    None
                }
            })
            .collect();
        call_guarded("Invoke-all handler", || callback(results));
    });
}

// --- Subscriptions ---

pub(crate) extern "C" fn stream_data_trampoline(origin: *const c_char, cookie: *mut c_void, payload: *const GluePayload) {
    call_guarded("Stream callback", || {
        let Some(trampoline) = lookup(cookie, "stream") else {
            return;
        };
        let Trampoline::Stream(handler) = &*trampoline else {
            return mismatch("stream", &trampoline);
        };
        let Some(payload) = (unsafe { payload.as_ref() }) else {
            log::debug!("Ignoring empty stream delivery");
            return;
        };
        match unsafe { CallResult::decode(lossy_string(origin), payload) } {
            Ok(data) => {
                call_guarded("Stream handler", || handler(data));
            }
            Err(err) => log::error!("Failed to decode stream data: {err}"),
        }
    });
}

pub(crate) extern "C" fn context_trampoline(
    context: *const c_char,
    field_path: *const c_char,
    value: *const GlueValue,
    cookie: *mut c_void,
) {
    call_guarded("Context callback", || {
        let Some(trampoline) = lookup(cookie, "context") else {
            return;
        };
        let Trampoline::Context(handler) = &*trampoline else {
            return mismatch("context", &trampoline);
        };
        let value = match unsafe { value.as_ref() } {
            None => HostValue::Null,
            Some(value) => match unsafe { decode(value) } {
                Ok(value) => value,
                Err(err) => {
                    log::error!("Failed to decode context update: {err}");
                    return;
                }
            },
        };
        let update = ContextUpdate {
            context: unsafe { lossy_string(context) }.unwrap_or_default(),
            field_path: unsafe { lossy_string(field_path) }.unwrap_or_default(),
            value,
        };
        call_guarded("Context handler", || handler(update));
    });
}

pub(crate) extern "C" fn endpoint_status_trampoline(
    endpoint: *const c_char,
    origin: *const c_char,
    available: bool,
    cookie: *mut c_void,
) {
    call_guarded("Endpoint status callback", || {
        let Some(trampoline) = lookup(cookie, "endpoint status") else {
            return;
        };
        let Trampoline::EndpointStatus(handler) = &*trampoline else {
            return mismatch("endpoint status", &trampoline);
        };
        let status = EndpointStatus {
            endpoint: unsafe { lossy_string(endpoint) }.unwrap_or_default(),
            origin: unsafe { lossy_string(origin) }.unwrap_or_default(),
            available,
        };
        call_guarded("Endpoint status handler", || handler(status));
    });
}
