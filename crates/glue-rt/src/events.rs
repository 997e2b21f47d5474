//! Decoded deliveries handed to user handlers.

use std::os::raw::c_int;

use glue_codec::{decode_arg_list, decode_payload, lossy_string, CodecResult, HostMap, HostValue};
use glue_ffi::{GluePayload, GlueState};

use crate::pusher::ResultPusher;

/// Observer of connection state transitions.
pub type StateHandler = Box<dyn Fn(GlueState, &str) + Send + Sync>;

/// Handler of an incoming call on a registered endpoint. An `Err` is
/// reported back to the caller as a failure result.
pub type EndpointHandler = Box<dyn Fn(EndpointCall, ResultPusher) -> miette::Result<()> + Send + Sync>;

/// Decides whether a subscriber may join a streaming endpoint. The `Err`
/// message is passed back to the subscriber.
pub type SubscribeHandler = Box<dyn Fn(&EndpointCall) -> Result<(), String> + Send + Sync>;

/// A call received by an endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointCall {
    pub endpoint: String,
    pub origin: Option<String>,
    /// One single-entry map per argument, in wire order. `None` when the
    /// library delivered no payload at all.
    pub args: Option<Vec<HostValue>>,
}

impl EndpointCall {
    /// `origin` wins over the origin recorded in the payload.
    pub(crate) unsafe fn decode(
        endpoint: String,
        origin: Option<String>,
        payload: *const GluePayload,
    ) -> CodecResult<Self> {
        let Some(payload) = payload.as_ref() else {
            return Ok(EndpointCall {
                endpoint,
                origin,
                args: None,
            });
        };
        Ok(EndpointCall {
            endpoint,
            origin: origin.or_else(|| lossy_string(payload.origin)),
            args: Some(decode_arg_list(payload)?),
        })
    }

    /// First argument with the given name.
    pub fn arg(&self, name: &str) -> Option<&HostValue> {
        self.args.as_ref()?.iter().find_map(|entry| entry.get(name))
    }
}

/// Result of an invocation, or one delivery of a stream.
#[derive(Clone, Debug, PartialEq)]
pub struct CallResult {
    pub origin: Option<String>,
    pub status: c_int,
    pub values: HostMap,
}

impl CallResult {
    pub(crate) unsafe fn decode(origin: Option<String>, payload: &GluePayload) -> CodecResult<Self> {
        Ok(CallResult {
            origin: origin.or_else(|| lossy_string(payload.origin)),
            status: payload.status,
            values: decode_payload(payload)?,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == glue_ffi::GLUE_OK
    }
}

/// Change of a subscribed context field. `value` is `Null` when the library
/// sent no value.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextUpdate {
    pub context: String,
    pub field_path: String,
    pub value: HostValue,
}

/// Availability change of a remote endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointStatus {
    pub endpoint: String,
    pub origin: String,
    pub available: bool,
}
