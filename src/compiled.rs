//! The compiled codec: a [`Schema`] is a frozen schema lowered into a
//! vector of per-field operation descriptors ([`CompiledField`]), with
//! dependency names resolved once, at compile time, into field-index slots.
//! `encode`/`decode` then run a tight loop over this vector instead of
//! re-interpreting the declaration on every call.

use std::collections::HashMap;

use regex::Regex;

use crate::bits::{BitReader, BitWriter};
use crate::errors::CodecError;
use crate::field::FieldKind;
use crate::schema::SchemaDecl;
use crate::value::{Record, Value};

#[derive(Debug, Clone)]
pub enum CompiledKind {
    Integer { bits: u32, signed: bool, min: Option<i64>, max: Option<i64> },
    Float16 { min: Option<f64>, max: Option<f64> },
    Float32 { min: Option<f64>, max: Option<f64> },
    Float64 { min: Option<f64>, max: Option<f64> },
    Boolean,
    String { include_size: bool, pattern: Option<Regex>, min_length: Option<usize>, max_length: Option<usize> },
    Blob { include_size: bool, min_length: Option<usize>, max_length: Option<usize> },
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub kind: CompiledKind,
    pub list: bool,
    pub optional: bool,
    /// Indices into the frozen field order of this field's `dependencies`,
    /// resolved once at compile time (spec §9: "indices of dependency
    /// result slots").
    pub dependency_indices: Vec<usize>,
    pub default: Option<Value>,
    /// Whether the value mapping must supply this field (spec §3:
    /// "required in the mapping iff it has neither `optional: true` nor
    /// a `default`"). Computed once from [`crate::field::Field::is_required_in_mapping`].
    pub required_in_mapping: bool,
}

/// A validated, frozen, topologically ordered schema, ready to encode and
/// decode values. Immutable; safe to share across threads (spec §5).
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<CompiledField>,
    metadata_prefix: Option<u8>,
    repeated: bool,
    static_bit_len: usize,
}

impl Schema {
    pub(crate) fn from_decl(decl: SchemaDecl) -> Result<Self, crate::errors::SchemaError> {
        let frozen = crate::schema::validate(decl.fields, decl.metadata)?;
        let name_to_idx: HashMap<&str, usize> =
            frozen.fields.iter().enumerate().map(|(i, (n, _))| (n.as_str(), i)).collect();

        let fields = frozen
            .fields
            .iter()
            .map(|(name, field)| CompiledField {
                name: name.clone(),
                kind: compile_kind(&field.kind),
                list: field.list,
                optional: field.optional,
                dependency_indices: field.dependencies.iter().map(|d| name_to_idx[d.as_str()]).collect(),
                default: field.default.clone(),
                required_in_mapping: field.is_required_in_mapping(),
            })
            .collect();

        Ok(Schema {
            fields,
            metadata_prefix: frozen.metadata.prefix,
            repeated: frozen.metadata.repeated,
            static_bit_len: frozen.static_bit_len,
        })
    }

    pub fn static_bit_len(&self) -> usize {
        self.static_bit_len
    }

    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Allocates exactly the right buffer, fills it, and returns it.
    pub fn encode(&self, value: &Record) -> Result<Vec<u8>, CodecError> {
        let mut writer = BitWriter::new();
        self.encode_into(value, &mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Writes into an externally supplied buffer and returns the number of
    /// bytes written.
    pub fn encode_into(&self, value: &Record, writer: &mut BitWriter) -> Result<usize, CodecError> {
        let entry = writer.position();
        if let Some(prefix) = self.metadata_prefix {
            writer.write_u8(prefix)?;
        }

        // Per-field Boolean outcome, used to resolve dependents' gates;
        // non-Boolean slots are unused and left `false`.
        let mut truthy = vec![false; self.fields.len()];

        for (i, field) in self.fields.iter().enumerate() {
            let dependencies_ok = field.dependency_indices.iter().all(|&d| truthy[d]);
            let user_value = value.get(&field.name);
            let resolved_value = user_value.or(field.default.as_ref());
            let write = resolved_value.is_some() && dependencies_ok;

            if field.optional {
                writer.write_boolean(write, false)?;
            } else if !field.dependency_indices.is_empty() && !write {
                // `write` is false here either because the gate is closed
                // (dependencies_ok == false, nothing to emit) or because the
                // gate is open but the value mapping omitted a field the
                // decoder will unconditionally try to read. The latter must
                // fail loudly rather than silently skip the field, or the
                // bytes this encoder accepts become unreadable by its own
                // decoder.
                if dependencies_ok && field.required_in_mapping {
                    return Err(CodecError::MissingField { field: field.name.clone() });
                }
            } else if field.required_in_mapping && resolved_value.is_none() {
                return Err(CodecError::MissingField { field: field.name.clone() });
            }

            if !write {
                continue;
            }
            let value = resolved_value.expect("write implies resolved_value is Some");

            if field.list {
                let Value::List(items) = value else {
                    return Err(CodecError::Malformed { field: field.name.clone(), reason: "expected a list value".into() });
                };
                if items.len() > u16::MAX as usize {
                    return Err(CodecError::OutOfRange {
                        field: field.name.clone(),
                        reason: format!("list of {} elements exceeds the 16-bit count prefix", items.len()),
                    });
                }
                writer.write_u16(items.len() as u16)?;
                for item in items {
                    encode_element(field, item, writer)?;
                }
            } else {
                encode_element(field, value, writer)?;
                if matches!(field.kind, CompiledKind::Boolean) {
                    truthy[i] = value.as_bool().unwrap_or(false);
                }
            }
        }

        Ok(writer.position() - entry)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        let mut reader = BitReader::new(bytes);
        self.decode_from(&mut reader)
    }

    pub fn decode_from(&self, reader: &mut BitReader) -> Result<Record, CodecError> {
        if let Some(expected) = self.metadata_prefix {
            let got = reader.read_u8(true)?;
            if got != expected {
                return Err(CodecError::Malformed {
                    field: "<prefix>".to_string(),
                    reason: format!("expected prefix {expected:#x}, got {got:#x}"),
                });
            }
        }

        let mut record = Record::new();
        let mut truthy = vec![false; self.fields.len()];

        for (i, field) in self.fields.iter().enumerate() {
            let dependencies_ok = field.dependency_indices.iter().all(|&d| truthy[d]);
            let read = if field.optional {
                reader.read_boolean(false, true)?
            } else {
                dependencies_ok
            };

            if read {
                let value = if field.list {
                    let count = reader.read_u16(true)?;
                    let mut items = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        items.push(decode_element(field, reader)?);
                    }
                    Value::List(items)
                } else {
                    decode_element(field, reader)?
                };
                if matches!(field.kind, CompiledKind::Boolean) {
                    truthy[i] = value.as_bool().unwrap_or(false);
                }
                record.insert(field.name.clone(), value);
            } else if let Some(default) = &field.default {
                record.insert(field.name.clone(), default.clone());
            }
        }

        Ok(record)
    }
}

fn compile_kind(kind: &FieldKind) -> CompiledKind {
    match kind {
        FieldKind::Integer { bits, signed, min, max } => {
            CompiledKind::Integer { bits: *bits, signed: *signed, min: *min, max: *max }
        }
        FieldKind::Float16 { min, max } => CompiledKind::Float16 { min: *min, max: *max },
        FieldKind::Float32 { min, max } => CompiledKind::Float32 { min: *min, max: *max },
        FieldKind::Float64 { min, max } => CompiledKind::Float64 { min: *min, max: *max },
        FieldKind::Boolean => CompiledKind::Boolean,
        FieldKind::String { include_size, pattern, min_length, max_length } => CompiledKind::String {
            include_size: include_size.unwrap_or(true),
            pattern: pattern.as_ref().map(|p| Regex::new(p).expect("pattern validated at schema-compile time")),
            min_length: *min_length,
            max_length: *max_length,
        },
        FieldKind::Blob { include_size, min_length, max_length } => CompiledKind::Blob {
            include_size: include_size.unwrap_or(true),
            min_length: *min_length,
            max_length: *max_length,
        },
    }
}

fn encode_element(field: &CompiledField, value: &Value, writer: &mut BitWriter) -> Result<(), CodecError> {
    match &field.kind {
        CompiledKind::Boolean => {
            let b = value.as_bool().ok_or_else(|| malformed(field, "expected a bool"))?;
            writer.write_boolean(b, false)
        }
        CompiledKind::Integer { bits, signed, min, max } => {
            let v = value.as_int().ok_or_else(|| malformed(field, "expected an integer"))?;
            check_range(field, v, *min, *max)?;
            writer.write_bits(v, *bits, *signed).map_err(|e| tag(e, &field.name))
        }
        CompiledKind::Float16 { min, max } => {
            let v = value.as_float().ok_or_else(|| malformed(field, "expected a float"))?;
            check_float_range(field, v, *min, *max)?;
            writer.write_f16(half::f16::from_f64(v))
        }
        CompiledKind::Float32 { min, max } => {
            let v = value.as_float().ok_or_else(|| malformed(field, "expected a float"))?;
            check_float_range(field, v, *min, *max)?;
            writer.write_f32(v as f32)
        }
        CompiledKind::Float64 { min, max } => {
            let v = value.as_float().ok_or_else(|| malformed(field, "expected a float"))?;
            check_float_range(field, v, *min, *max)?;
            writer.write_f64(v)
        }
        CompiledKind::String { include_size, pattern, min_length, max_length } => {
            let s = value.as_str().ok_or_else(|| malformed(field, "expected a string"))?;
            check_string(field, s, pattern, *min_length, *max_length)?;
            writer.write_string(s, *include_size).map_err(|e| tag(e, &field.name))
        }
        CompiledKind::Blob { include_size, min_length, max_length } => {
            let b = value.as_bytes().ok_or_else(|| malformed(field, "expected bytes"))?;
            check_length(field, b.len(), *min_length, *max_length)?;
            writer.write_blob(b, *include_size).map_err(|e| tag(e, &field.name))
        }
    }
}

fn decode_element(field: &CompiledField, reader: &mut BitReader) -> Result<Value, CodecError> {
    match &field.kind {
        CompiledKind::Boolean => Ok(Value::Bool(reader.read_boolean(false, true).map_err(|e| tag(e, &field.name))?)),
        CompiledKind::Integer { bits, signed, .. } => {
            Ok(Value::Int(reader.read_bits(*bits, *signed, true).map_err(|e| tag(e, &field.name))?))
        }
        CompiledKind::Float16 { .. } => Ok(Value::Float(reader.read_f16(true).map_err(|e| tag(e, &field.name))?.to_f64())),
        CompiledKind::Float32 { .. } => Ok(Value::Float(reader.read_f32(true).map_err(|e| tag(e, &field.name))? as f64)),
        CompiledKind::Float64 { .. } => Ok(Value::Float(reader.read_f64(true).map_err(|e| tag(e, &field.name))?)),
        CompiledKind::String { include_size, .. } => {
            Ok(Value::Str(reader.read_string(*include_size, None, true).map_err(|e| tag(e, &field.name))?))
        }
        CompiledKind::Blob { include_size, .. } => {
            Ok(Value::Bytes(reader.read_blob(*include_size, None, true).map_err(|e| tag(e, &field.name))?))
        }
    }
}

fn malformed(field: &CompiledField, reason: &str) -> CodecError {
    CodecError::Malformed { field: field.name.clone(), reason: reason.to_string() }
}

fn tag(err: CodecError, field: &str) -> CodecError {
    match err {
        CodecError::OutOfRange { reason, .. } => CodecError::OutOfRange { field: field.to_string(), reason },
        CodecError::Malformed { reason, .. } => CodecError::Malformed { field: field.to_string(), reason },
        CodecError::Overflow { .. } => CodecError::Overflow { field: field.to_string() },
        CodecError::Underflow { .. } => CodecError::Underflow { field: field.to_string() },
        CodecError::MissingField { .. } => CodecError::MissingField { field: field.to_string() },
    }
}

fn check_range(field: &CompiledField, v: i64, min: Option<i64>, max: Option<i64>) -> Result<(), CodecError> {
    if let Some(min) = min {
        if v < min {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("{v} below min {min}") });
        }
    }
    if let Some(max) = max {
        if v > max {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("{v} above max {max}") });
        }
    }
    Ok(())
}

fn check_float_range(field: &CompiledField, v: f64, min: Option<f64>, max: Option<f64>) -> Result<(), CodecError> {
    if let Some(min) = min {
        if v < min {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("{v} below min {min}") });
        }
    }
    if let Some(max) = max {
        if v > max {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("{v} above max {max}") });
        }
    }
    Ok(())
}

fn check_length(field: &CompiledField, len: usize, min: Option<usize>, max: Option<usize>) -> Result<(), CodecError> {
    if let Some(min) = min {
        if len < min {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("length {len} below minLength {min}") });
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(CodecError::OutOfRange { field: field.name.clone(), reason: format!("length {len} above maxLength {max}") });
        }
    }
    Ok(())
}

fn check_string(
    field: &CompiledField,
    s: &str,
    pattern: &Option<Regex>,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<(), CodecError> {
    check_length(field, s.len(), min_length, max_length)?;
    if let Some(pattern) = pattern {
        if !pattern.is_match(s) {
            return Err(CodecError::Malformed { field: field.name.clone(), reason: format!("{s:?} does not match the field's pattern") });
        }
    }
    Ok(())
}
