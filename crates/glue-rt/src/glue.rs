//! Host-facing entry point.

use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use glue_codec::{build_args, c_string, encode, HostMap, HostValue, WireArena};
use glue_ffi::{GlueNotificationSeverity, NativeGlue, ResourceHandle, GLUE_OK};
use tokio::sync::oneshot;

use crate::config::GlueConfig;
use crate::error::{GlueError, GlueResult};
use crate::events::{CallResult, ContextUpdate, EndpointCall, EndpointStatus, StateHandler};
use crate::handshake::Handshake;
use crate::pusher::{log_status, ResultPusher};
use crate::reader::ContextReader;
use crate::registry::CallbackId;
use crate::subscription::{StreamingEndpoint, Subscription};
use crate::trampoline::{self, Completion, EndpointState, InitState, StreamingState, Trampoline};

/// Client of the Glue library.
///
/// Cheap to clone; all clones drive the same native library. Arguments are
/// encoded before anything reaches the library, so encoding errors leave no
/// registration behind. Native status codes are returned as-is; `0` is
/// success.
#[derive(Clone)]
pub struct Glue {
    native: Arc<dyn NativeGlue>,
}

impl Glue {
    pub fn new(native: impl NativeGlue) -> Self {
        Self {
            native: Arc::new(native),
        }
    }

    pub fn from_arc(native: Arc<dyn NativeGlue>) -> Self {
        Self { native }
    }

    /// Client over the library linked into the process.
    #[cfg(feature = "link")]
    pub fn linked() -> Self {
        Self::new(glue_ffi::LinkedGlue)
    }

    pub fn native(&self) -> &Arc<dyn NativeGlue> {
        &self.native
    }

    /// Number of callbacks currently reachable from the library, across all
    /// clients.
    pub fn pending_callbacks(&self) -> usize {
        trampoline::pending_callbacks()
    }

    // --- Initialization ---

    /// Starts the initialization handshake.
    ///
    /// Every state transition is forwarded to `on_state_change`. The
    /// returned future resolves to `true` on the initialized state and to
    /// `false` on disconnection; a failing initialize call resolves it to
    /// `false` straight away. Callers bound the wait themselves, or use
    /// [`initialize_with_timeout`](Self::initialize_with_timeout).
    pub fn initialize(&self, app_name: &str, on_state_change: Option<StateHandler>) -> Handshake {
        let app_name = match c_string(app_name) {
            Ok(name) => name,
            Err(err) => {
                log::error!("Cannot initialize: {err}");
                return Handshake::ready(false);
            }
        };

        let (tx, rx) = oneshot::channel();
        let id = trampoline::register(Trampoline::Init(InitState::new(on_state_change, Completion::Task(tx))));
        let status = unsafe { self.native.init(app_name.as_ptr(), trampoline::init_trampoline, id.as_cookie()) };
        if status != GLUE_OK {
            log::warn!("glue_init returned status {status}");
            trampoline::unregister(id);
            return Handshake::ready(false);
        }
        Handshake::pending(id, rx)
    }

    /// [`initialize`](Self::initialize) raced against `timeout`.
    pub async fn initialize_with_timeout(
        &self,
        app_name: &str,
        on_state_change: Option<StateHandler>,
        timeout: Duration,
    ) -> GlueResult<()> {
        match tokio::time::timeout(timeout, self.initialize(app_name, on_state_change)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GlueError::HandshakeFailed),
            Err(_) => Err(GlueError::HandshakeTimeout(timeout)),
        }
    }

    /// Initializes with the application name and timeout of `config`.
    pub async fn initialize_configured(
        &self,
        config: &GlueConfig,
        on_state_change: Option<StateHandler>,
    ) -> GlueResult<()> {
        self.initialize_with_timeout(&config.app.name, on_state_change, config.init_timeout())
            .await
    }

    /// Blocking handshake for callers without an async runtime. The calling
    /// thread waits on a channel the library thread completes.
    pub fn initialize_blocking(
        &self,
        app_name: &str,
        on_state_change: Option<StateHandler>,
        timeout: Duration,
    ) -> GlueResult<()> {
        let app_name = c_string(app_name)?;
        let (tx, rx) = channel::bounded(1);
        let id = trampoline::register(Trampoline::Init(InitState::new(on_state_change, Completion::Thread(tx))));

        let status = unsafe { self.native.init(app_name.as_ptr(), trampoline::init_trampoline, id.as_cookie()) };
        if status != GLUE_OK {
            log::warn!("glue_init returned status {status}");
            trampoline::unregister(id);
            return Err(GlueError::HandshakeFailed);
        }

        let outcome = rx.recv_timeout(timeout);
        trampoline::unregister(id);
        match outcome {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => Err(GlueError::HandshakeFailed),
            Err(RecvTimeoutError::Timeout) => Err(GlueError::HandshakeTimeout(timeout)),
        }
    }

    // --- Endpoints ---

    /// Serves calls to `name`.
    ///
    /// The handler receives the decoded call and a pusher bound to the
    /// caller's result endpoint. Returning `Err` (or panicking) completes
    /// the call with a failure.
    ///
    /// Dropping the returned handle releases the registration; call
    /// `detach()` on it to keep it for the life of the process.
    pub fn register_endpoint<F>(&self, name: &str, handler: F) -> GlueResult<Subscription>
    where
        F: Fn(EndpointCall, ResultPusher) -> miette::Result<()> + Send + Sync + 'static,
    {
        let c_name = c_string(name)?;
        let id = trampoline::register(Trampoline::Endpoint(EndpointState::new(
            self.native.clone(),
            Box::new(handler),
        )));
        let resource = unsafe {
            self.native
                .register_endpoint(c_name.as_ptr(), trampoline::endpoint_trampoline, id.as_cookie())
        };
        self.attach("glue_register_endpoint", "endpoint", id, resource)
    }

    /// Serves a stream under `name`.
    ///
    /// `on_subscribe` admits or rejects each subscriber; a rejection message
    /// is passed back to it. `on_request` handles the requests of admitted
    /// subscribers like an ordinary endpoint handler.
    ///
    /// Dropping the returned handle releases the registration; call
    /// `detach()` on it to keep it for the life of the process.
    pub fn register_streaming_endpoint<S, R>(
        &self,
        name: &str,
        on_subscribe: S,
        on_request: R,
    ) -> GlueResult<StreamingEndpoint>
    where
        S: Fn(&EndpointCall) -> Result<(), String> + Send + Sync + 'static,
        R: Fn(EndpointCall, ResultPusher) -> miette::Result<()> + Send + Sync + 'static,
    {
        let c_name = c_string(name)?;
        let state = StreamingState::new(
            name.to_string(),
            EndpointState::new(self.native.clone(), Box::new(on_request)),
            Box::new(on_subscribe),
        );
        let id = trampoline::register(Trampoline::Streaming(state));
        let resource = unsafe {
            self.native.register_streaming_endpoint(
                c_name.as_ptr(),
                trampoline::stream_subscribe_trampoline,
                trampoline::endpoint_trampoline,
                id.as_cookie(),
            )
        };
        let subscription = self.attach("glue_register_streaming_endpoint", "streaming endpoint", id, resource)?;
        Ok(StreamingEndpoint::new(name.to_string(), subscription))
    }

    // --- Invocation ---

    /// Invokes `method` without waiting for its result.
    pub fn invoke(&self, method: &str, args: &HostMap) -> GlueResult<c_int> {
        self.invoke_inner(method, args, None)
    }

    /// Invokes `method`; `on_result` runs once with the result, on a library
    /// thread. It gets `None` when the library delivered no payload or a
    /// payload that failed to decode; the decode error is logged. When the
    /// immediate status is non-zero the callback is dropped unrun.
    pub fn invoke_with<F>(&self, method: &str, args: &HostMap, on_result: F) -> GlueResult<c_int>
    where
        F: FnOnce(Option<CallResult>) + Send + 'static,
    {
        self.invoke_inner(method, args, Some(Box::new(on_result)))
    }

    fn invoke_inner(
        &self,
        method: &str,
        args: &HostMap,
        on_result: Option<trampoline::ResultCallback>,
    ) -> GlueResult<c_int> {
        let c_method = c_string(method)?;
        let wire = build_args(args)?;

        let id = on_result.map(|callback| trampoline::register(Trampoline::Invoke(parking_lot::Mutex::new(Some(callback)))));
        let callback = id.map(|_| trampoline::invoke_trampoline as glue_ffi::PayloadCallback);
        let cookie = id.map_or(std::ptr::null_mut(), CallbackId::as_cookie);

        let status = unsafe {
            self.native
                .invoke(c_method.as_ptr(), wire.as_ptr(), wire.len_c(), callback, cookie)
        };
        if status != GLUE_OK {
            log::warn!("glue_invoke({method}) returned status {status}");
            // the library will not deliver a result
            if let Some(id) = id {
                trampoline::unregister(id);
            }
        }
        Ok(status)
    }

    /// Invokes `method` on every instance that serves it. `on_results` runs
    /// once with the results of all instances.
    pub fn invoke_all<F>(&self, method: &str, args: &HostMap, on_results: F) -> GlueResult<c_int>
    where
        F: FnOnce(Vec<CallResult>) + Send + 'static,
    {
        let c_method = c_string(method)?;
        let wire = build_args(args)?;

        let callback: trampoline::ResultsCallback = Box::new(on_results);
        let id = trampoline::register(Trampoline::InvokeAll(parking_lot::Mutex::new(Some(callback))));
        let status = unsafe {
            self.native.invoke_all(
                c_method.as_ptr(),
                wire.as_ptr(),
                wire.len_c(),
                Some(trampoline::invoke_all_trampoline),
                id.as_cookie(),
            )
        };
        if status != GLUE_OK {
            log::warn!("glue_invoke_all({method}) returned status {status}");
            trampoline::unregister(id);
        }
        Ok(status)
    }

    // --- Subscriptions ---

    /// Follows `field_path` of `context`. Updates without a value arrive as
    /// `Null`.
    ///
    /// Dropping the returned handle releases the registration; call
    /// `detach()` on it to keep it for the life of the process.
    pub fn subscribe_context<F>(&self, context: &str, field_path: &str, on_update: F) -> GlueResult<Subscription>
    where
        F: Fn(ContextUpdate) + Send + Sync + 'static,
    {
        let c_context = c_string(context)?;
        let c_field = c_string(field_path)?;
        let id = trampoline::register(Trampoline::Context(Box::new(on_update)));
        let resource = unsafe {
            self.native.subscribe_context(
                c_context.as_ptr(),
                c_field.as_ptr(),
                trampoline::context_trampoline,
                id.as_cookie(),
            )
        };
        self.attach("glue_subscribe_context", "context subscription", id, resource)
    }

    /// Subscribes to a stream published by a streaming endpoint.
    ///
    /// Dropping the returned handle releases the registration; call
    /// `detach()` on it to keep it for the life of the process.
    pub fn subscribe_stream<F>(&self, stream: &str, args: &HostMap, on_data: F) -> GlueResult<Subscription>
    where
        F: Fn(CallResult) + Send + Sync + 'static,
    {
        let c_stream = c_string(stream)?;
        let wire = build_args(args)?;
        let id = trampoline::register(Trampoline::Stream(Box::new(on_data)));
        let resource = unsafe {
            self.native.subscribe_stream(
                c_stream.as_ptr(),
                trampoline::stream_data_trampoline,
                wire.as_ptr(),
                wire.len_c(),
                id.as_cookie(),
            )
        };
        self.attach("glue_subscribe_stream", "stream subscription", id, resource)
    }

    /// Follows the availability of remote endpoints.
    ///
    /// Dropping the returned handle releases the registration; call
    /// `detach()` on it to keep it for the life of the process.
    pub fn subscribe_endpoint_status<F>(&self, on_status: F) -> GlueResult<Subscription>
    where
        F: Fn(EndpointStatus) + Send + Sync + 'static,
    {
        let id = trampoline::register(Trampoline::EndpointStatus(Box::new(on_status)));
        let resource = unsafe {
            self.native
                .subscribe_endpoints_status(trampoline::endpoint_status_trampoline, id.as_cookie())
        };
        self.attach("glue_subscribe_endpoints_status", "endpoint status subscription", id, resource)
    }

    fn attach(
        &self,
        call: &'static str,
        label: &'static str,
        id: CallbackId,
        resource: Option<ResourceHandle>,
    ) -> GlueResult<Subscription> {
        match resource {
            Some(resource) => Ok(Subscription::new(label, self.native.clone(), id, resource)),
            None => {
                log::warn!("{call} returned no resource");
                trampoline::unregister(id);
                Err(GlueError::null_handle(call))
            }
        }
    }

    // --- Notifications and contexts ---

    pub fn raise_notification(
        &self,
        title: &str,
        description: &str,
        severity: GlueNotificationSeverity,
    ) -> GlueResult<c_int> {
        let c_title = c_string(title)?;
        let c_description = c_string(description)?;
        let status = unsafe {
            self.native.raise_simple_notification(
                c_title.as_ptr(),
                c_description.as_ptr(),
                severity as c_int,
                std::ptr::null_mut(),
            )
        };
        log_status("glue_raise_simple_notification", status);
        Ok(status)
    }

    /// Snapshot reader of `context`.
    pub fn read_context(&self, context: &str) -> GlueResult<ContextReader> {
        let c_context = c_string(context)?;
        let reader = unsafe { self.native.read_context_sync(c_context.as_ptr()) }
            .ok_or_else(|| GlueError::null_handle("glue_read_context_sync"))?;
        Ok(ContextReader::new(self.native.clone(), context.to_string(), reader))
    }

    /// Writes `value` to `field_path` of `context`. Falsy values clear the
    /// field, following the codec's normalisation.
    pub fn write_context(&self, context: &str, field_path: &str, value: &HostValue) -> GlueResult<c_int> {
        let c_context = c_string(context)?;
        let c_field = c_string(field_path)?;
        let mut arena = WireArena::new();
        let wire = encode(value, &mut arena)?;
        let status = unsafe {
            self.native
                .write_context(c_context.as_ptr(), c_field.as_ptr(), wire, false)
        };
        log_status("glue_write_context", status);
        Ok(status)
    }
}

impl fmt::Debug for Glue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glue")
            .field("pending_callbacks", &self.pending_callbacks())
            .finish()
    }
}
