//! Value codec: [`GlueValue`] <-> [`HostValue`].
//!
//! Decoding rules:
//!
//! * `none` decodes to `Null`; a scalar string with a null pointer too.
//! * A scalar kind with `len >= 0` is a homogeneous array of `len`
//!   elements. Null string elements decode to `Null` in place.
//! * `datetime` carries epoch milliseconds in the long field and decodes
//!   to `Int`.
//! * `tuple` decodes element-wise to a `List`; a null tuple payload decodes
//!   to `Null`, not to an empty list.
//! * `composite` decodes to a `Map` in wire order; a null payload decodes
//!   to an empty map, never `Null`.
//! * `composite_array` decodes to `Records` when every element is a map,
//!   otherwise to a `List`; a null payload decodes to `Null`.
//!
//! Encoding collapses every falsy value (see [`HostValue::is_falsy`]) to
//! `{none, -1}`. This normalisation is part of the wire contract: peers
//! cannot tell `0`, `""` or `[]` from an absent value.

use std::os::raw::{c_char, c_int};
use std::slice;

use glue_ffi::{GlueArg, GluePayload, GlueType, GlueValue, GlueValueData};

use crate::arena::WireArena;
use crate::error::{CodecError, CodecResult};
use crate::lossy_string;
use crate::value::{HostMap, HostValue};

/// Nesting limit for tuples, composites and composite arrays, both ways.
pub const MAX_DEPTH: usize = 64;

/// Decodes a wire value into a host value.
///
/// # Safety
/// Every pointer reachable from `value` must be valid for the element count
/// its `len` field announces, and strings must be NUL-terminated.
pub unsafe fn decode(value: &GlueValue) -> CodecResult<HostValue> {
    decode_at(value, 0)
}

unsafe fn decode_at(value: &GlueValue, depth: usize) -> CodecResult<HostValue> {
    if depth > MAX_DEPTH {
        return Err(CodecError::malformed(format!("nesting deeper than {MAX_DEPTH} levels")));
    }

    let kind = value
        .kind()
        .map_err(|raw| CodecError::malformed(format!("unknown discriminant {raw}")))?;
    let len = value.len;

    match kind {
        GlueType::None => Ok(HostValue::Null),

        _ if kind.is_scalar() && len < 0 => Ok(decode_scalar(kind, &value.data)),

        GlueType::Bool => Ok(HostValue::List(
            elements(value.data.bb, len, kind)?.iter().map(|b| HostValue::Bool(*b)).collect(),
        )),
        GlueType::Int => Ok(HostValue::List(
            elements(value.data.ii, len, kind)?
                .iter()
                .map(|i| HostValue::Int((*i).into()))
                .collect(),
        )),
        GlueType::Long | GlueType::DateTime => Ok(HostValue::List(
            elements(value.data.ll, len, kind)?.iter().map(|l| HostValue::Int(*l)).collect(),
        )),
        GlueType::Double => Ok(HostValue::List(
            elements(value.data.dd, len, kind)?.iter().map(|d| HostValue::Float(*d)).collect(),
        )),
        GlueType::String => Ok(HostValue::List(
            elements(value.data.ss, len, kind)?
                .iter()
                .map(|s| lossy_string(*s).map_or(HostValue::Null, HostValue::Text))
                .collect(),
        )),

        GlueType::Tuple => {
            let ptr = value.data.tuple;
            if ptr.is_null() {
                return Ok(HostValue::Null);
            }
            let items = elements(ptr, len, kind)?
                .iter()
                .map(|item| decode_at(item, depth + 1))
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(HostValue::List(items))
        }

        GlueType::Composite => {
            let ptr = value.data.composite;
            if ptr.is_null() {
                return Ok(HostValue::Map(HostMap::new()));
            }
            decode_named(elements(ptr, len, kind)?, depth + 1).map(HostValue::Map)
        }

        GlueType::CompositeArray => {
            let ptr = value.data.composite;
            if ptr.is_null() {
                return Ok(HostValue::Null);
            }
            let items = elements(ptr, len, kind)?
                .iter()
                .map(|arg| decode_at(&arg.value, depth + 1))
                .collect::<CodecResult<Vec<_>>>()?;
            if items.iter().all(|item| matches!(item, HostValue::Map(_))) {
                let records = items
                    .into_iter()
                    .filter_map(|item| match item {
                        HostValue::Map(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                Ok(HostValue::Records(records))
            } else {
                Ok(HostValue::List(items))
            }
        }

        // scalar kinds with len < 0 were handled above
        _ => Err(CodecError::malformed(format!("{} with length {len}", kind.name()))),
    }
}

unsafe fn decode_scalar(kind: GlueType, data: &GlueValueData) -> HostValue {
    match kind {
        GlueType::Bool => HostValue::Bool(data.b),
        GlueType::Int => HostValue::Int(data.i.into()),
        GlueType::Long | GlueType::DateTime => HostValue::Int(data.l),
        GlueType::Double => HostValue::Float(data.d),
        GlueType::String => lossy_string(data.s).map_or(HostValue::Null, HostValue::Text),
        _ => HostValue::Null,
    }
}

/// Borrows `len` elements starting at `ptr`.
unsafe fn elements<'a, T>(ptr: *const T, len: c_int, kind: GlueType) -> CodecResult<&'a [T]> {
    if len < 0 {
        return Err(CodecError::malformed(format!("{} with negative length {len}", kind.name())));
    }
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(CodecError::malformed(format!(
            "{} announces {len} elements but has no payload",
            kind.name()
        )));
    }
    Ok(slice::from_raw_parts(ptr, len as usize))
}

/// Name of the `index`th argument; the positional placeholder when unset.
unsafe fn arg_name(name: *const c_char, index: usize) -> String {
    lossy_string(name).unwrap_or_else(|| format!("arg_{index}"))
}

unsafe fn decode_named(args: &[GlueArg], depth: usize) -> CodecResult<HostMap> {
    let mut map = HostMap::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        map.insert(arg_name(arg.name, index), decode_at(&arg.value, depth)?);
    }
    Ok(map)
}

/// Decodes the arguments of a payload into a map keyed by argument name,
/// in wire order.
///
/// # Safety
/// `payload.args` must point to `payload.args_len` valid arguments (or be
/// null with a zero length); see [`decode`].
pub unsafe fn decode_payload(payload: &GluePayload) -> CodecResult<HostMap> {
    decode_named(payload_args(payload)?, 0)
}

/// Decodes the arguments of a payload into a list of one-entry maps, one per
/// argument. Unlike [`decode_payload`] repeated names are kept.
///
/// # Safety
/// As [`decode_payload`].
pub unsafe fn decode_arg_list(payload: &GluePayload) -> CodecResult<Vec<HostValue>> {
    payload_args(payload)?
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            let mut entry = HostMap::with_capacity(1);
            entry.insert(arg_name(arg.name, index), decode_at(&arg.value, 0)?);
            Ok(HostValue::Map(entry))
        })
        .collect()
}

unsafe fn payload_args<'a>(payload: &GluePayload) -> CodecResult<&'a [GlueArg]> {
    if payload.args.is_null() && payload.args_len <= 0 {
        return Ok(&[]);
    }
    elements(payload.args, payload.args_len, GlueType::Composite)
}

/// Encodes a host value; the returned value points into `arena`.
pub fn encode(value: &HostValue, arena: &mut WireArena) -> CodecResult<GlueValue> {
    encode_at(value, arena, 0)
}

/// Encodes a list of maps as a composite array.
///
/// An empty list is falsy and encodes to `{none, -1}` like any other.
pub fn encode_records(records: &[HostMap], arena: &mut WireArena) -> CodecResult<GlueValue> {
    encode_records_at(records, arena, 0)
}

fn encode_at(value: &HostValue, arena: &mut WireArena, depth: usize) -> CodecResult<GlueValue> {
    if value.is_falsy() {
        return Ok(GlueValue::none());
    }
    if depth > MAX_DEPTH {
        return Err(CodecError::unsupported(format!(
            "{} nested deeper than {MAX_DEPTH} levels",
            value.type_name()
        )));
    }

    Ok(match value {
        HostValue::Null => GlueValue::none(),
        HostValue::Bool(b) => GlueValue::scalar(GlueType::Bool, GlueValueData { b: *b }),
        HostValue::Int(l) => GlueValue::scalar(GlueType::Long, GlueValueData { l: *l }),
        HostValue::Float(d) => GlueValue::scalar(GlueType::Double, GlueValueData { d: *d }),
        HostValue::Text(s) => GlueValue::scalar(GlueType::String, GlueValueData { s: arena.string(s)? }),
        HostValue::List(items) => encode_list(items, arena, depth)?,
        HostValue::Map(map) => encode_map(map, arena, depth)?,
        HostValue::Records(records) => encode_records_at(records, arena, depth)?,
    })
}

/// Homogeneous lists become arrays of the element kind, anything else a tuple.
fn encode_list(items: &[HostValue], arena: &mut WireArena, depth: usize) -> CodecResult<GlueValue> {
    let len = wire_len(items.len())?;

    if let Some(bools) = collect_all(items, HostValue::as_bool) {
        let data = GlueValueData { bb: arena.bools(bools) };
        return Ok(GlueValue::collection(GlueType::Bool, data, len));
    }
    if let Some(longs) = collect_all(items, HostValue::as_i64) {
        let data = GlueValueData { ll: arena.longs(longs) };
        return Ok(GlueValue::collection(GlueType::Long, data, len));
    }
    if let Some(doubles) = collect_all(items, |item| match item {
        HostValue::Float(f) => Some(*f),
        _ => None,
    }) {
        let data = GlueValueData { dd: arena.doubles(doubles) };
        return Ok(GlueValue::collection(GlueType::Double, data, len));
    }
    if items.iter().all(|item| matches!(item, HostValue::Text(_))) {
        let ptrs = arena.string_array(items.iter().filter_map(HostValue::as_str))?;
        return Ok(GlueValue::collection(GlueType::String, GlueValueData { ss: ptrs }, len));
    }

    let encoded = items
        .iter()
        .map(|item| encode_at(item, arena, depth + 1))
        .collect::<CodecResult<Vec<_>>>()?;
    let data = GlueValueData {
        tuple: arena.values(encoded.into_boxed_slice()),
    };
    Ok(GlueValue::collection(GlueType::Tuple, data, len))
}

fn collect_all<T>(items: &[HostValue], pick: impl Fn(&HostValue) -> Option<T>) -> Option<Box<[T]>> {
    items.iter().map(pick).collect::<Option<Vec<T>>>().map(Vec::into_boxed_slice)
}

fn encode_map(map: &HostMap, arena: &mut WireArena, depth: usize) -> CodecResult<GlueValue> {
    let len = wire_len(map.len())?;
    if map.is_empty() {
        return Ok(GlueValue::collection(GlueType::Composite, GlueValueData::null(), 0));
    }
    let mut args = Vec::with_capacity(map.len());
    for (name, value) in map {
        args.push(GlueArg {
            name: arena.string(name)?,
            value: encode_at(value, arena, depth + 1)?,
        });
    }
    let data = GlueValueData {
        composite: arena.args(args.into_boxed_slice()),
    };
    Ok(GlueValue::collection(GlueType::Composite, data, len))
}

fn encode_records_at(records: &[HostMap], arena: &mut WireArena, depth: usize) -> CodecResult<GlueValue> {
    if records.is_empty() {
        return Ok(GlueValue::none());
    }
    let len = wire_len(records.len())?;
    let mut args = Vec::with_capacity(records.len());
    for record in records {
        // composite array entries carry only a value; an empty record stays
        // an empty composite so the array still decodes as records
        args.push(GlueArg {
            name: std::ptr::null(),
            value: encode_map(record, arena, depth + 1)?,
        });
    }
    let data = GlueValueData {
        composite: arena.args(args.into_boxed_slice()),
    };
    Ok(GlueValue::collection(GlueType::CompositeArray, data, len))
}

fn wire_len(len: usize) -> CodecResult<c_int> {
    c_int::try_from(len).map_err(|_| CodecError::TooLarge { len })
}
