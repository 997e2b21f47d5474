//! Raw C-ABI surface of the Glue client library.
//!
//! Everything in this crate mirrors the vendor header: the tagged-union value
//! layout, the callback signatures the library calls back into, and the call
//! surface itself as the [`NativeGlue`] trait. Nothing here interprets values;
//! that is the job of `glue-codec`.

pub mod callbacks;
pub mod handle;
pub mod native;
pub mod wire;

#[cfg(feature = "link")]
pub mod linked;

pub use callbacks::{
    ContextCallback, GlueEndpointStatusCallback, GlueInitCallback, InvocationCallback,
    InvokeAllCallback, PayloadCallback, StreamCallback,
};
pub use handle::{BorrowedHandle, HostOwned, NativeHandle, NativeOwned, ResourceHandle};
pub use native::NativeGlue;
pub use wire::{GlueArg, GlueNotificationSeverity, GluePayload, GlueState, GlueType, GlueValue, GlueValueData};

#[cfg(feature = "link")]
pub use linked::LinkedGlue;

/// Status code the library returns for a successful call.
pub const GLUE_OK: std::os::raw::c_int = 0;
