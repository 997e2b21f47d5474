use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use glue_codec::{c_string, decode, lossy_string, HostValue};
use glue_ffi::{BorrowedHandle, NativeGlue};

use crate::error::GlueResult;

/// Synchronous snapshot reader of a context.
///
/// The reader belongs to the library; the host only passes it back to the
/// accessor calls and never releases it. Paths are field paths inside the
/// context, e.g. `"prices.EURUSD"`.
#[derive(Clone)]
pub struct ContextReader {
    native: Arc<dyn NativeGlue>,
    context: String,
    reader: BorrowedHandle,
}

impl ContextReader {
    pub(crate) fn new(native: Arc<dyn NativeGlue>, context: String, reader: BorrowedHandle) -> Self {
        Self {
            native,
            context,
            reader,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn read_bool(&self, path: &str) -> GlueResult<bool> {
        let path = c_string(path)?;
        Ok(unsafe { self.native.read_b(self.reader, path.as_ptr()) })
    }

    pub fn read_i32(&self, path: &str) -> GlueResult<c_int> {
        let path = c_string(path)?;
        Ok(unsafe { self.native.read_i(self.reader, path.as_ptr()) })
    }

    pub fn read_i64(&self, path: &str) -> GlueResult<i64> {
        let path = c_string(path)?;
        Ok(unsafe { self.native.read_l(self.reader, path.as_ptr()) })
    }

    pub fn read_f64(&self, path: &str) -> GlueResult<f64> {
        let path = c_string(path)?;
        Ok(unsafe { self.native.read_d(self.reader, path.as_ptr()) })
    }

    /// `None` when the field is absent.
    pub fn read_string(&self, path: &str) -> GlueResult<Option<String>> {
        let path = c_string(path)?;
        Ok(unsafe { lossy_string(self.native.read_s(self.reader, path.as_ptr())) })
    }

    /// Reads a field as JSON text and parses it. `None` when absent.
    pub fn read_json(&self, path: &str) -> GlueResult<Option<serde_json::Value>> {
        let path = c_string(path)?;
        let text = unsafe { lossy_string(self.native.read_json(self.reader, path.as_ptr())) };
        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Reads a field as a wire value and decodes it.
    pub fn read_value(&self, path: &str) -> GlueResult<HostValue> {
        let path = c_string(path)?;
        let value = unsafe { self.native.read_glue_value(self.reader, path.as_ptr()) };
        Ok(unsafe { decode(&value)? })
    }
}

impl fmt::Debug for ContextReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextReader")
            .field("context", &self.context)
            .field("reader", &self.reader)
            .finish()
    }
}
