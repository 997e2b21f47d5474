//! In-process stand-in for the native library.
//!
//! Records every call it receives and lets tests play the library's side of
//! the callbacks, either inline or from a spawned thread the way the real
//! library delivers them.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_longlong, c_void};
use std::ptr;
use std::sync::Arc;
use std::thread;

use glue_codec::{build_args, decode_payload, encode, HostMap, HostValue, WireArena, WireArgs};
use glue_ffi::{
    BorrowedHandle, ContextCallback, GlueArg, GlueEndpointStatusCallback, GlueInitCallback, GluePayload, GlueState,
    GlueValue, InvocationCallback, InvokeAllCallback, NativeGlue, PayloadCallback, ResourceHandle, StreamCallback,
};
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum Push {
    Payload { target: usize, values: HostMap },
    Json { target: usize, text: String },
    Failure { target: usize, message: String },
}

#[derive(Clone, Copy)]
pub struct Endpoint {
    pub on_request: InvocationCallback,
    pub on_subscribe: Option<StreamCallback>,
    pub cookie: usize,
    pub resource: usize,
}

#[derive(Clone)]
pub struct Invocation {
    pub method: String,
    pub args: HostMap,
    pub callback: Option<PayloadCallback>,
    pub all: Option<InvokeAllCallback>,
    pub cookie: usize,
}

#[derive(Clone, Copy)]
pub enum Watch {
    Context(ContextCallback),
    Stream(PayloadCallback),
    Status(GlueEndpointStatusCallback),
}

#[derive(Clone, Copy)]
pub struct Watcher {
    pub watch: Watch,
    pub cookie: usize,
    pub resource: usize,
}

#[derive(Default)]
pub struct FakeState {
    /// Status returned by `init`, `invoke` and `invoke_all`.
    pub call_status: c_int,
    /// Resource-producing calls return null while set.
    pub refuse_resources: bool,
    next_address: usize,

    pub init: Option<(GlueInitCallback, usize)>,
    pub app_name: Option<String>,
    pub endpoints: HashMap<String, Endpoint>,
    pub branches: Vec<(usize, String, usize)>,
    pub invocations: Vec<Invocation>,
    pub watchers: Vec<Watcher>,
    pub stream_args: Vec<HostMap>,
    pub pushes: Vec<Push>,
    pub notifications: Vec<(String, String, c_int)>,
    pub destroyed: Vec<usize>,
    pub writes: Vec<(String, String, HostValue)>,
    pub contexts: HashMap<String, HostMap>,
    readers: HashMap<usize, String>,
    /// Memory handed out by reads; lives as long as the fake.
    arenas: Vec<WireArena>,
    strings: Vec<CString>,
}

impl FakeState {
    fn address(&mut self) -> usize {
        self.next_address += 0x10;
        0x1000 + self.next_address
    }

    fn resource(&mut self) -> Option<ResourceHandle> {
        if self.refuse_resources {
            return None;
        }
        let address = self.address();
        unsafe { ResourceHandle::from_raw(address as *mut c_void) }
    }

    fn field(&self, reader: BorrowedHandle, path: *const c_char) -> HostValue {
        let path = unsafe { text(path) };
        self.readers
            .get(&reader.addr())
            .and_then(|context| self.contexts.get(context))
            .and_then(|fields| fields.get(&path))
            .cloned()
            .unwrap_or_default()
    }

    fn keep_string(&mut self, value: String) -> *const c_char {
        let owned = CString::new(value).unwrap();
        let ptr = owned.as_ptr();
        self.strings.push(owned);
        ptr
    }
}

#[derive(Default, Clone)]
pub struct FakeGlue {
    pub state: Arc<Mutex<FakeState>>,
}

unsafe fn text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

unsafe fn args_map(args: *const GlueArg, args_len: c_int) -> HostMap {
    let payload = payload_of(args, args_len, ptr::null());
    decode_payload(&payload).unwrap()
}

fn payload_of(args: *const GlueArg, args_len: c_int, origin: *const c_char) -> GluePayload {
    GluePayload {
        reader: ptr::null(),
        origin,
        status: 0,
        args,
        args_len,
    }
}

fn cookie(raw: usize) -> *mut c_void {
    raw as *mut c_void
}

impl FakeGlue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_call_status(&self, status: c_int) {
        self.state.lock().call_status = status;
    }

    pub fn refuse_resources(&self, refuse: bool) {
        self.state.lock().refuse_resources = refuse;
    }

    pub fn set_context(&self, context: &str, fields: HostMap) {
        self.state.lock().contexts.insert(context.to_string(), fields);
    }

    pub fn pushes(&self) -> Vec<Push> {
        self.state.lock().pushes.clone()
    }

    pub fn destroyed(&self) -> Vec<usize> {
        self.state.lock().destroyed.clone()
    }

    pub fn invocation(&self, index: usize) -> Invocation {
        self.state.lock().invocations[index].clone()
    }

    pub fn watcher(&self, index: usize) -> Watcher {
        self.state.lock().watchers[index]
    }

    pub fn endpoint(&self, name: &str) -> Endpoint {
        self.state.lock().endpoints[name]
    }

    // --- Playing the library ---

    pub fn fire_init(&self, state: GlueState, message: &str) {
        let (callback, raw) = self.state.lock().init.expect("init was not called");
        let message = CString::new(message).unwrap();
        callback(state.into(), message.as_ptr(), ptr::null(), cookie(raw));
    }

    /// Fires the states one after another from a library thread.
    pub fn fire_init_from_thread(&self, states: Vec<GlueState>) -> thread::JoinHandle<()> {
        let fake = self.clone();
        thread::spawn(move || {
            for state in states {
                fake.fire_init(state, &format!("{state:?}"));
            }
        })
    }

    /// Calls a registered endpoint. Returns the result endpoint address the
    /// handler's pushes are recorded under.
    pub fn call_endpoint(&self, name: &str, args: Option<&HostMap>) -> usize {
        let (endpoint, target) = {
            let mut state = self.state.lock();
            let endpoint = state.endpoints[name];
            (endpoint, state.address())
        };
        let c_name = CString::new(name).unwrap();
        let origin = CString::new("caller").unwrap();
        match args {
            Some(args) => {
                let wire = build_args(args).unwrap();
                let payload = payload_of(wire.as_ptr(), wire.len_c(), origin.as_ptr());
                (endpoint.on_request)(c_name.as_ptr(), cookie(endpoint.cookie), &payload, target as *mut c_void);
            }
            None => (endpoint.on_request)(c_name.as_ptr(), cookie(endpoint.cookie), ptr::null(), target as *mut c_void),
        }
        target
    }

    /// Asks a streaming endpoint to admit a subscriber. Returns the verdict
    /// and the rejection message.
    pub fn subscribe_to(&self, name: &str, origin: &str, args: &HostMap) -> (bool, Option<String>) {
        let (accepted, error) = self.subscribe_raw(name, origin, args);
        (accepted, read_error(error))
    }

    /// Like [`subscribe_to`](Self::subscribe_to) but hands back the address
    /// of the rejection message so it can be read later, as the library
    /// does.
    pub fn subscribe_raw(&self, name: &str, origin: &str, args: &HostMap) -> (bool, usize) {
        let endpoint = self.endpoint(name);
        let on_subscribe = endpoint.on_subscribe.expect("not a streaming endpoint");
        let origin = CString::new(origin).unwrap();
        let wire = build_args(args).unwrap();
        let payload = payload_of(wire.as_ptr(), wire.len_c(), ptr::null());
        let mut error: *const c_char = ptr::null();
        let accepted = on_subscribe(origin.as_ptr(), cookie(endpoint.cookie), &payload, &mut error);
        (accepted, error as usize)
    }

    /// Delivers the result of the `index`th invocation.
    pub fn deliver_result(&self, index: usize, values: Option<&HostMap>) {
        let invocation = self.invocation(index);
        let callback = invocation.callback.expect("invoked without a callback");
        let origin = CString::new("responder").unwrap();
        match values {
            Some(values) => {
                let wire = build_args(values).unwrap();
                let payload = payload_of(wire.as_ptr(), wire.len_c(), origin.as_ptr());
                callback(origin.as_ptr(), cookie(invocation.cookie), &payload);
            }
            None => callback(origin.as_ptr(), cookie(invocation.cookie), ptr::null()),
        }
    }

    /// Delivers one result per instance to the `index`th invoke-all.
    pub fn deliver_all(&self, index: usize, results: &[HostMap]) {
        let invocation = self.invocation(index);
        let callback = invocation.all.expect("not an invoke-all");
        let wires: Vec<WireArgs> = results.iter().map(|values| build_args(values).unwrap()).collect();
        let origins: Vec<CString> = (0..results.len())
            .map(|i| CString::new(format!("instance-{i}")).unwrap())
            .collect();
        let payloads: Vec<GluePayload> = wires
            .iter()
            .zip(&origins)
            .map(|(wire, origin)| payload_of(wire.as_ptr(), wire.len_c(), origin.as_ptr()))
            .collect();
        callback(
            ptr::null(),
            cookie(invocation.cookie),
            payloads.as_ptr(),
            payloads.len() as c_int,
        );
    }

    pub fn update_context(&self, index: usize, context: &str, field: &str, value: Option<&HostValue>) {
        let watcher = self.watcher(index);
        let Watch::Context(callback) = watcher.watch else {
            panic!("watcher {index} is not a context subscription");
        };
        let context = CString::new(context).unwrap();
        let field = CString::new(field).unwrap();
        let mut arena = WireArena::new();
        match value {
            Some(value) => {
                let wire = encode(value, &mut arena).unwrap();
                callback(context.as_ptr(), field.as_ptr(), &wire, cookie(watcher.cookie));
            }
            None => callback(context.as_ptr(), field.as_ptr(), ptr::null(), cookie(watcher.cookie)),
        }
    }

    pub fn send_stream(&self, index: usize, values: &HostMap) {
        let watcher = self.watcher(index);
        let Watch::Stream(callback) = watcher.watch else {
            panic!("watcher {index} is not a stream subscription");
        };
        let origin = CString::new("publisher").unwrap();
        let wire = build_args(values).unwrap();
        let payload = payload_of(wire.as_ptr(), wire.len_c(), origin.as_ptr());
        callback(origin.as_ptr(), cookie(watcher.cookie), &payload);
    }

    pub fn endpoint_status(&self, index: usize, endpoint: &str, origin: &str, available: bool) {
        let watcher = self.watcher(index);
        let Watch::Status(callback) = watcher.watch else {
            panic!("watcher {index} is not a status subscription");
        };
        let endpoint = CString::new(endpoint).unwrap();
        let origin = CString::new(origin).unwrap();
        callback(endpoint.as_ptr(), origin.as_ptr(), available, cookie(watcher.cookie));
    }
}

impl NativeGlue for FakeGlue {
    unsafe fn init(&self, app_name: *const c_char, callback: GlueInitCallback, cookie: *mut c_void) -> c_int {
        let mut state = self.state.lock();
        state.app_name = Some(text(app_name));
        state.init = Some((callback, cookie as usize));
        state.call_status
    }

    unsafe fn register_endpoint(
        &self,
        name: *const c_char,
        callback: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        let mut state = self.state.lock();
        let resource = state.resource()?;
        state.endpoints.insert(
            text(name),
            Endpoint {
                on_request: callback,
                on_subscribe: None,
                cookie: cookie as usize,
                resource: resource.addr(),
            },
        );
        Some(resource)
    }

    unsafe fn register_streaming_endpoint(
        &self,
        name: *const c_char,
        on_subscribe: StreamCallback,
        on_request: InvocationCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        let mut state = self.state.lock();
        let resource = state.resource()?;
        state.endpoints.insert(
            text(name),
            Endpoint {
                on_request,
                on_subscribe: Some(on_subscribe),
                cookie: cookie as usize,
                resource: resource.addr(),
            },
        );
        Some(resource)
    }

    unsafe fn open_streaming_branch(&self, endpoint: &ResourceHandle, branch: *const c_char) -> Option<BorrowedHandle> {
        let mut state = self.state.lock();
        let address = state.address();
        state.branches.push((endpoint.addr(), text(branch), address));
        BorrowedHandle::from_raw(address as *mut c_void)
    }

    unsafe fn invoke(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<PayloadCallback>,
        cookie: *mut c_void,
    ) -> c_int {
        let mut state = self.state.lock();
        state.invocations.push(Invocation {
            method: text(method),
            args: args_map(args, args_len),
            callback,
            all: None,
            cookie: cookie as usize,
        });
        state.call_status
    }

    unsafe fn invoke_all(
        &self,
        method: *const c_char,
        args: *const GlueArg,
        args_len: c_int,
        callback: Option<InvokeAllCallback>,
        cookie: *mut c_void,
    ) -> c_int {
        let mut state = self.state.lock();
        state.invocations.push(Invocation {
            method: text(method),
            args: args_map(args, args_len),
            callback: None,
            all: callback,
            cookie: cookie as usize,
        });
        state.call_status
    }

    unsafe fn subscribe_context(
        &self,
        _context: *const c_char,
        _field_path: *const c_char,
        callback: ContextCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        let mut state = self.state.lock();
        let resource = state.resource()?;
        state.watchers.push(Watcher {
            watch: Watch::Context(callback),
            cookie: cookie as usize,
            resource: resource.addr(),
        });
        Some(resource)
    }

    unsafe fn subscribe_stream(
        &self,
        _stream: *const c_char,
        callback: PayloadCallback,
        args: *const GlueArg,
        args_len: c_int,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        let mut state = self.state.lock();
        let resource = state.resource()?;
        let args = args_map(args, args_len);
        state.stream_args.push(args);
        state.watchers.push(Watcher {
            watch: Watch::Stream(callback),
            cookie: cookie as usize,
            resource: resource.addr(),
        });
        Some(resource)
    }

    unsafe fn subscribe_endpoints_status(
        &self,
        callback: GlueEndpointStatusCallback,
        cookie: *mut c_void,
    ) -> Option<ResourceHandle> {
        let mut state = self.state.lock();
        let resource = state.resource()?;
        state.watchers.push(Watcher {
            watch: Watch::Status(callback),
            cookie: cookie as usize,
            resource: resource.addr(),
        });
        Some(resource)
    }

    unsafe fn push_payload(&self, target: *mut c_void, args: *const GlueArg, args_len: c_int, _resolve_only: bool) -> c_int {
        let values = args_map(args, args_len);
        self.state.lock().pushes.push(Push::Payload {
            target: target as usize,
            values,
        });
        0
    }

    unsafe fn push_json_payload(&self, target: *mut c_void, json: *const c_char, _resolve_only: bool) -> c_int {
        self.state.lock().pushes.push(Push::Json {
            target: target as usize,
            text: text(json),
        });
        0
    }

    unsafe fn push_failure(&self, target: *mut c_void, message: *const c_char) -> c_int {
        self.state.lock().pushes.push(Push::Failure {
            target: target as usize,
            message: text(message),
        });
        0
    }

    unsafe fn raise_simple_notification(
        &self,
        title: *const c_char,
        description: *const c_char,
        severity: c_int,
        _cookie: *mut c_void,
    ) -> c_int {
        let mut state = self.state.lock();
        state.notifications.push((text(title), text(description), severity));
        state.call_status
    }

    unsafe fn destroy_resource(&self, resource: ResourceHandle) -> c_int {
        self.state.lock().destroyed.push(resource.into_raw() as usize);
        0
    }

    unsafe fn read_context_sync(&self, context: *const c_char) -> Option<BorrowedHandle> {
        let mut state = self.state.lock();
        let context = text(context);
        if !state.contexts.contains_key(&context) {
            return None;
        }
        let address = state.address();
        state.readers.insert(address, context);
        BorrowedHandle::from_raw(address as *mut c_void)
    }

    unsafe fn write_context(
        &self,
        context: *const c_char,
        field_path: *const c_char,
        value: GlueValue,
        _resolve: bool,
    ) -> c_int {
        let value = glue_codec::decode(&value).unwrap();
        self.state
            .lock()
            .writes
            .push((text(context), text(field_path), value));
        0
    }

    unsafe fn read_b(&self, reader: BorrowedHandle, path: *const c_char) -> bool {
        self.state.lock().field(reader, path).as_bool().unwrap_or(false)
    }

    unsafe fn read_i(&self, reader: BorrowedHandle, path: *const c_char) -> c_int {
        self.state.lock().field(reader, path).as_i64().unwrap_or(0) as c_int
    }

    unsafe fn read_l(&self, reader: BorrowedHandle, path: *const c_char) -> c_longlong {
        self.state.lock().field(reader, path).as_i64().unwrap_or(0)
    }

    unsafe fn read_d(&self, reader: BorrowedHandle, path: *const c_char) -> c_double {
        self.state.lock().field(reader, path).as_f64().unwrap_or(0.0)
    }

    unsafe fn read_s(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char {
        let mut state = self.state.lock();
        match state.field(reader, path) {
            HostValue::Text(value) => state.keep_string(value),
            _ => ptr::null(),
        }
    }

    unsafe fn read_json(&self, reader: BorrowedHandle, path: *const c_char) -> *const c_char {
        let mut state = self.state.lock();
        match state.field(reader, path) {
            HostValue::Null => ptr::null(),
            value => state.keep_string(serde_json::Value::from(value).to_string()),
        }
    }

    unsafe fn read_glue_value(&self, reader: BorrowedHandle, path: *const c_char) -> GlueValue {
        let mut state = self.state.lock();
        let value = state.field(reader, path);
        let mut arena = WireArena::new();
        let wire = encode(&value, &mut arena).unwrap();
        state.arenas.push(arena);
        wire
    }
}

/// Reads a rejection message by the address [`FakeGlue::subscribe_raw`]
/// returned.
pub fn read_error(address: usize) -> Option<String> {
    let error = address as *const c_char;
    if error.is_null() {
        None
    } else {
        Some(unsafe { text(error) })
    }
}
