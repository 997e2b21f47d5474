//! Host runtime for the Glue client library.
//!
//! [`Glue`] is the entry point: it initializes the connection, registers
//! endpoints, invokes remote methods and subscribes to contexts and streams.
//! Every callback the library may call is kept alive in a process-wide
//! registry until its [`Subscription`] is released (or, for one-shot
//! results, until the result arrives). The library reaches the host from its
//! own threads; handler panics and decoding errors are logged and never
//! cross back into native code.
//!
//! ```no_run
//! # async fn run(glue: glue_rt::Glue) -> glue_rt::GlueResult<()> {
//! use std::time::Duration;
//! use glue_rt::HostMap;
//!
//! glue.initialize_with_timeout("pricing", None, Duration::from_secs(10)).await?;
//!
//! let _endpoint = glue.register_endpoint("Pricing.Quote", |call, pusher| {
//!     let mut result = HostMap::new();
//!     result.insert("symbol".into(), call.arg("symbol").cloned().unwrap_or_default());
//!     result.insert("bid".into(), 1.0842.into());
//!     pusher.push(&result)?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod glue;
pub mod handshake;
pub mod pusher;
pub mod reader;
pub mod registry;
pub mod subscription;
mod trampoline;

pub use config::GlueConfig;
pub use error::{GlueError, GlueResult};
pub use events::{CallResult, ContextUpdate, EndpointCall, EndpointHandler, EndpointStatus, StateHandler};
pub use glue::Glue;
pub use handshake::Handshake;
pub use pusher::ResultPusher;
pub use reader::ContextReader;
pub use registry::{CallbackId, CallbackRegistry};
pub use subscription::{StreamingEndpoint, Subscription};
pub use trampoline::{is_registered, pending_callbacks};

pub use glue_codec::{HostMap, HostValue};
pub use glue_ffi::{GlueNotificationSeverity, GlueState};
