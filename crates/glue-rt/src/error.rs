use std::os::raw::c_int;
use std::time::Duration;

use glue_codec::CodecError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by the host-facing API.
///
/// Failures inside user handlers never show up here: they are caught and
/// logged where the library calls back into the host.
#[derive(Debug, Error, Diagnostic)]
pub enum GlueError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error("Native call {call} failed with status {code}")]
    #[diagnostic(
        code("GLUE-NATIVE-001"),
        help("A status of -1 means the library returned a null handle")
    )]
    NativeCallFailure { call: &'static str, code: c_int },

    #[error("Initialization ended without reaching the initialized state")]
    #[diagnostic(code("GLUE-INIT-001"))]
    HandshakeFailed,

    #[error("Initialization did not complete within {0:?}")]
    #[diagnostic(code("GLUE-INIT-002"))]
    HandshakeTimeout(Duration),

    #[error("The {what} has already been released")]
    #[diagnostic(code("GLUE-RES-001"))]
    ResourceReleased { what: &'static str },

    #[error("The call on {endpoint} carries no result endpoint")]
    #[diagnostic(code("GLUE-RES-002"))]
    NoResultTarget { endpoint: String },

    #[error("JSON error: {0}")]
    #[diagnostic(code("GLUE-JSON-001"))]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code("GLUE-CFG-001"))]
    Config(String),
}

impl GlueError {
    /// Failure of a call that returned a null handle.
    pub(crate) fn null_handle(call: &'static str) -> Self {
        GlueError::NativeCallFailure { call, code: -1 }
    }
}

pub type GlueResult<T> = Result<T, GlueError>;
