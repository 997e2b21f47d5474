//! `#[repr(C)]` layouts shared with the native library.

use std::fmt;
use std::os::raw::{c_char, c_double, c_int, c_longlong, c_void};
use std::ptr;

/// Discriminant of a [`GlueValue`].
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GlueType {
    None = 0,
    Bool = 1,
    /// 32-bit integer.
    Int = 2,
    /// 64-bit integer.
    Long = 3,
    Double = 4,
    String = 5,
    /// Milliseconds since the Unix epoch, carried in the `l` field.
    DateTime = 6,
    Tuple = 7,
    Composite = 8,
    CompositeArray = 9,
}

impl GlueType {
    /// Name used by the vendor header, handy in log lines.
    pub fn name(self) -> &'static str {
        match self {
            GlueType::None => "glue_none",
            GlueType::Bool => "glue_bool",
            GlueType::Int => "glue_int",
            GlueType::Long => "glue_long",
            GlueType::Double => "glue_double",
            GlueType::String => "glue_string",
            GlueType::DateTime => "glue_datetime",
            GlueType::Tuple => "glue_tuple",
            GlueType::Composite => "glue_composite",
            GlueType::CompositeArray => "glue_composite_array",
        }
    }

    /// Kinds that can appear both as a scalar (`len == -1`) and as a
    /// homogeneous array (`len >= 0`).
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            GlueType::Bool
                | GlueType::Int
                | GlueType::Long
                | GlueType::Double
                | GlueType::String
                | GlueType::DateTime
        )
    }
}

impl TryFrom<c_int> for GlueType {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => GlueType::None,
            1 => GlueType::Bool,
            2 => GlueType::Int,
            3 => GlueType::Long,
            4 => GlueType::Double,
            5 => GlueType::String,
            6 => GlueType::DateTime,
            7 => GlueType::Tuple,
            8 => GlueType::Composite,
            9 => GlueType::CompositeArray,
            other => return Err(other),
        })
    }
}

/// Payload of a [`GlueValue`]. Which field is live is decided by the
/// discriminant and the length of the enclosing value.
#[repr(C)]
#[derive(Copy, Clone)]
pub union GlueValueData {
    pub b: bool,
    pub i: c_int,
    pub l: c_longlong,
    pub d: c_double,
    pub s: *const c_char,

    pub bb: *const bool,
    pub ii: *const c_int,
    pub ll: *const c_longlong,
    pub dd: *const c_double,
    pub ss: *const *const c_char,

    /// Array of `GlueArg` for composites and composite arrays.
    pub composite: *const GlueArg,
    /// Array of `GlueValue` for tuples.
    pub tuple: *const GlueValue,
}

impl GlueValueData {
    /// All-zero payload (null pointer in every pointer field).
    pub const fn null() -> Self {
        GlueValueData { tuple: ptr::null() }
    }
}

/// Tagged-union value crossing the ABI boundary.
///
/// `len` is `-1` for scalars and the element count for arrays and
/// collections (`0` for an empty one).
#[repr(C)]
#[derive(Copy, Clone)]
pub struct GlueValue {
    pub data: GlueValueData,
    pub type_: c_int,
    pub len: c_int,
}

impl GlueValue {
    /// The `{none, -1}` value used for absent and falsy values.
    pub const fn none() -> Self {
        GlueValue {
            data: GlueValueData::null(),
            type_: GlueType::None as c_int,
            len: -1,
        }
    }

    pub const fn scalar(kind: GlueType, data: GlueValueData) -> Self {
        GlueValue {
            data,
            type_: kind as c_int,
            len: -1,
        }
    }

    pub const fn collection(kind: GlueType, data: GlueValueData, len: c_int) -> Self {
        GlueValue {
            data,
            type_: kind as c_int,
            len,
        }
    }

    /// Checked view of the discriminant; `Err` carries the unknown raw value.
    pub fn kind(&self) -> Result<GlueType, c_int> {
        GlueType::try_from(self.type_)
    }
}

impl Default for GlueValue {
    fn default() -> Self {
        GlueValue::none()
    }
}

impl fmt::Debug for GlueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            Ok(kind) => kind.name().to_string(),
            Err(raw) => format!("Unknown({raw})"),
        };
        f.debug_struct("GlueValue")
            .field("type", &kind)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Named value. Inside a composite array the name is left null.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GlueArg {
    pub name: *const c_char,
    pub value: GlueValue,
}

impl Default for GlueArg {
    fn default() -> Self {
        GlueArg {
            name: ptr::null(),
            value: GlueValue::none(),
        }
    }
}

/// Envelope of a call or a result.
///
/// `reader` is owned by the library and only valid for the duration of the
/// callback that delivered the payload.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GluePayload {
    pub reader: *const c_void,
    pub origin: *const c_char,
    pub status: c_int,
    pub args: *const GlueArg,
    pub args_len: c_int,
}

/// Connection state reported to the init callback.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GlueState {
    None,
    Connecting,
    Connected,
    Initialized,
    Disconnected,
    /// A value the header does not define; kept so it can be logged.
    Unknown(c_int),
}

impl GlueState {
    /// `Initialized` and `Disconnected` end the initialization handshake.
    pub fn is_terminal(self) -> bool {
        matches!(self, GlueState::Initialized | GlueState::Disconnected)
    }
}

impl From<c_int> for GlueState {
    fn from(raw: c_int) -> Self {
        match raw {
            0 => GlueState::None,
            1 => GlueState::Connecting,
            2 => GlueState::Connected,
            3 => GlueState::Initialized,
            4 => GlueState::Disconnected,
            other => GlueState::Unknown(other),
        }
    }
}

impl From<GlueState> for c_int {
    fn from(state: GlueState) -> Self {
        match state {
            GlueState::None => 0,
            GlueState::Connecting => 1,
            GlueState::Connected => 2,
            GlueState::Initialized => 3,
            GlueState::Disconnected => 4,
            GlueState::Unknown(raw) => raw,
        }
    }
}

#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum GlueNotificationSeverity {
    #[default]
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn discriminants_are_stable() {
        assert_eq!(GlueType::None as c_int, 0);
        assert_eq!(GlueType::Long as c_int, 3);
        assert_eq!(GlueType::CompositeArray as c_int, 9);
        assert_eq!(GlueType::try_from(7), Ok(GlueType::Tuple));
        assert_eq!(GlueType::try_from(42), Err(42));
    }

    #[test]
    fn value_layout_matches_header() {
        // eight-byte union followed by type and len
        assert_eq!(mem::size_of::<GlueValueData>(), 8);
        assert_eq!(mem::size_of::<GlueValue>(), 16);
        assert_eq!(mem::size_of::<GlueArg>(), mem::size_of::<usize>() + 16);
    }

    #[test]
    fn state_round_trips_raw_values() {
        for raw in 0..6 {
            assert_eq!(c_int::from(GlueState::from(raw)), raw);
        }
        assert!(GlueState::Initialized.is_terminal());
        assert!(GlueState::Disconnected.is_terminal());
        assert!(!GlueState::Connecting.is_terminal());
        assert_eq!(GlueState::from(9), GlueState::Unknown(9));
    }
}
