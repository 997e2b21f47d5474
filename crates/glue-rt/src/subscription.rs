//! Disposers for native resources backed by a registered callback.

use std::fmt;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glue_codec::{build_args, c_string, HostMap};
use glue_ffi::{NativeGlue, ResourceHandle};
use parking_lot::Mutex;

use crate::error::{GlueError, GlueResult};
use crate::pusher::{log_status, push_args, push_json, ResultPusher};
use crate::registry::CallbackId;
use crate::trampoline;

/// A live subscription or endpoint registration.
///
/// [`unsubscribe`](Self::unsubscribe) destroys the native resource and then
/// unregisters the callback. It runs at most once, however many clones call
/// it, and it also runs when the last clone is dropped unless the
/// subscription was [`detach`](Self::detach)ed.
#[derive(Clone)]
#[must_use = "dropping the subscription releases it; call detach() to keep it"]
pub struct Subscription {
    inner: Arc<Inner>,
}

struct Inner {
    label: &'static str,
    native: Arc<dyn NativeGlue>,
    id: CallbackId,
    resource: Mutex<Option<ResourceHandle>>,
    detached: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(label: &'static str, native: Arc<dyn NativeGlue>, id: CallbackId, resource: ResourceHandle) -> Self {
        log::debug!("Opened {label} {resource:?} for callback {id}");
        Self {
            inner: Arc::new(Inner {
                label,
                native,
                id,
                resource: Mutex::new(Some(resource)),
                detached: AtomicBool::new(false),
            }),
        }
    }

    /// Releases the subscription. Returns the status of the native release,
    /// or `None` if it had already been released.
    pub fn unsubscribe(&self) -> Option<c_int> {
        self.inner.release()
    }

    pub fn is_active(&self) -> bool {
        self.inner.resource.lock().is_some()
    }

    /// The id deliveries for this subscription are routed by.
    pub fn callback_id(&self) -> CallbackId {
        self.inner.id
    }

    /// Keeps the subscription alive for the rest of the process; dropping
    /// the handle no longer releases it. An explicit `unsubscribe` on a
    /// remaining clone still works.
    pub fn detach(self) {
        self.inner.detached.store(true, Ordering::Release);
    }

    /// Runs `f` with the resource while it is alive. The resource cannot be
    /// released while `f` runs.
    pub(crate) fn with_resource<R>(&self, f: impl FnOnce(&ResourceHandle) -> R) -> Option<R> {
        self.inner.resource.lock().as_ref().map(f)
    }

    pub(crate) fn native(&self) -> &Arc<dyn NativeGlue> {
        &self.inner.native
    }
}

impl Inner {
    fn release(&self) -> Option<c_int> {
        let resource = self.resource.lock().take()?;
        let status = unsafe { self.native.destroy_resource(resource) };
        log_status("glue_destroy_resource", status);
        trampoline::unregister(self.id);
        log::debug!("Closed {} for callback {}", self.label, self.id);
        Some(status)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.detached.load(Ordering::Acquire) {
            self.release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.inner.label)
            .field("callback", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A registered streaming endpoint.
///
/// Pushing to the endpoint reaches every accepted subscriber; a branch
/// reaches the subscribers of that branch only.
#[derive(Clone, Debug)]
#[must_use = "dropping the subscription releases it; call detach() to keep it"]
pub struct StreamingEndpoint {
    name: String,
    subscription: Subscription,
}

impl StreamingEndpoint {
    pub(crate) fn new(name: String, subscription: Subscription) -> Self {
        Self { name, subscription }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&self, data: &HostMap) -> GlueResult<c_int> {
        let args = build_args(data)?;
        let native = self.subscription.native();
        self.subscription
            .with_resource(|resource| unsafe { push_args(&**native, resource.as_raw(), &args) })
            .ok_or(GlueError::ResourceReleased {
                what: "streaming endpoint",
            })
    }

    pub fn push_json(&self, data: &serde_json::Value) -> GlueResult<c_int> {
        let native = self.subscription.native();
        self.subscription
            .with_resource(|resource| unsafe { push_json(&**native, resource.as_raw(), data) })
            .ok_or(GlueError::ResourceReleased {
                what: "streaming endpoint",
            })?
    }

    /// Opens (or reuses) a named branch. The returned pusher targets the
    /// branch and is valid while the endpoint is registered.
    pub fn open_branch(&self, branch: &str) -> GlueResult<ResultPusher> {
        let branch_name = c_string(branch)?;
        let native = self.subscription.native();
        let handle = self
            .subscription
            .with_resource(|resource| unsafe { native.open_streaming_branch(resource, branch_name.as_ptr()) })
            .ok_or(GlueError::ResourceReleased {
                what: "streaming endpoint",
            })?
            .ok_or_else(|| GlueError::null_handle("glue_open_streaming_branch"))?;
        log::debug!("Opened branch {branch} of {}", self.name);
        Ok(ResultPusher::new(
            native.clone(),
            format!("{}/{branch}", self.name),
            Some(handle),
        ))
    }

    pub fn unsubscribe(&self) -> Option<c_int> {
        self.subscription.unsubscribe()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}
