//! Schema declaration, validator, and topological field ordering.
//!
//! A [`SchemaDecl`] is what a caller builds up; [`SchemaDecl::compile`]
//! validates it against the rules below and hands back a
//! [`crate::compiled::Schema`] — a frozen, immutable, topologically ordered
//! descriptor the codec compiler runs against.

use std::collections::HashMap;

use regex::Regex;

use crate::errors::SchemaError;
use crate::field::{Field, FieldKind, Metadata};
use crate::value::Value;
use crate::bits::{range_max, range_min};

/// An unvalidated, declaration-order list of named fields plus metadata.
#[derive(Debug, Clone, Default)]
pub struct SchemaDecl {
    pub fields: Vec<(String, Field)>,
    pub metadata: Metadata,
}

impl SchemaDecl {
    pub fn new() -> Self {
        SchemaDecl::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validates this declaration and freezes it into a [`crate::compiled::Schema`].
    pub fn compile(self) -> Result<crate::compiled::Schema, SchemaError> {
        crate::compiled::Schema::from_decl(self)
    }
}

/// The outcome of validation: field order replaced by the topological sort,
/// `includeSize` defaults filled in, and the static bit-length floor computed.
pub(crate) struct Frozen {
    pub fields: Vec<(String, Field)>,
    pub metadata: Metadata,
    pub static_bit_len: usize,
}

/// Runs the five-step validation pipeline of the schema spec.
pub(crate) fn validate(mut fields: Vec<(String, Field)>, metadata: Metadata) -> Result<Frozen, SchemaError> {
    // Step 1: per-field constraint check (+ default-defaults, step 2, folded in
    // per field since it doesn't depend on ordering).
    for (name, field) in fields.iter_mut() {
        check_field_constraints(name, field)?;
        fill_include_size_default(field);
        if let Some(default) = &field.default {
            validate_default(name, field, default)?;
        }
    }

    // Step 3: dependency existence & typing.
    let name_to_idx: HashMap<String, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, (n, _))| (n.clone(), i))
        .collect();
    for (name, field) in &fields {
        for dep in &field.dependencies {
            let Some(&dep_idx) = name_to_idx.get(dep) else {
                return Err(SchemaError::UnknownDependency {
                    field: name.clone(),
                    dependency: dep.clone(),
                });
            };
            if !fields[dep_idx].1.kind.is_boolean() {
                return Err(SchemaError::NonBooleanDependency {
                    field: name.clone(),
                    dependency: dep.clone(),
                });
            }
            if fields[dep_idx].1.list {
                return Err(SchemaError::ListDependency {
                    field: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Step 4: topological ordering and cycle detection.
    let order = topological_order(&fields, &name_to_idx)?;
    let reordered: Vec<(String, Field)> = order.into_iter().map(|i| fields[i].clone()).collect();
    fields = reordered;

    // Step 5: static bit-length precomputation.
    let static_bit_len = static_bit_length(&fields, &metadata);

    Ok(Frozen { fields, metadata, static_bit_len })
}

fn check_field_constraints(name: &str, field: &mut Field) -> Result<(), SchemaError> {
    match &field.kind {
        FieldKind::Integer { bits, min, max, .. } => {
            if *bits < 1 || *bits > 53 {
                return Err(SchemaError::InvalidIntegerBits { field: name.to_string(), bits: *bits });
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::InvalidRange { field: name.to_string() });
                }
            }
        }
        FieldKind::Float16 { min, max } | FieldKind::Float32 { min, max } | FieldKind::Float64 { min, max } => {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::InvalidRange { field: name.to_string() });
                }
            }
        }
        FieldKind::Boolean => {}
        FieldKind::String { include_size, pattern, min_length, max_length } => {
            if field.list && *include_size == Some(false) {
                return Err(SchemaError::ListRequiresIncludeSize { field: name.to_string() });
            }
            if let (Some(min), Some(max)) = (min_length, max_length) {
                if min > max {
                    return Err(SchemaError::InvalidRange { field: name.to_string() });
                }
            }
            if let Some(pattern) = pattern {
                if Regex::new(pattern).is_err() {
                    return Err(SchemaError::InvalidPattern { field: name.to_string(), pattern: pattern.clone() });
                }
            }
        }
        FieldKind::Blob { include_size, min_length, max_length } => {
            if field.list && *include_size == Some(false) {
                return Err(SchemaError::ListRequiresIncludeSize { field: name.to_string() });
            }
            if let (Some(min), Some(max)) = (min_length, max_length) {
                if min > max {
                    return Err(SchemaError::InvalidRange { field: name.to_string() });
                }
            }
        }
    }
    Ok(())
}

fn fill_include_size_default(field: &mut Field) {
    match &mut field.kind {
        FieldKind::String { include_size, .. } | FieldKind::Blob { include_size, .. } => {
            if include_size.is_none() {
                *include_size = Some(true);
            }
        }
        _ => {}
    }
}

fn validate_default(name: &str, field: &Field, default: &Value) -> Result<(), SchemaError> {
    match (&field.kind, default) {
        (FieldKind::Integer { bits, signed, min, max }, _) if field.list => {
            let Value::List(items) = default else {
                return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a list default".into() });
            };
            for item in items {
                validate_integer_default(name, *bits, *signed, *min, *max, item)?;
            }
            Ok(())
        }
        (FieldKind::Integer { bits, signed, min, max }, _) => validate_integer_default(name, *bits, *signed, *min, *max, default),
        (FieldKind::Float16 { min, max }, _) | (FieldKind::Float32 { min, max }, _) | (FieldKind::Float64 { min, max }, _)
            if field.list =>
        {
            let Value::List(items) = default else {
                return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a list default".into() });
            };
            for item in items {
                validate_float_default(name, *min, *max, item)?;
            }
            Ok(())
        }
        (FieldKind::Float16 { min, max }, _) | (FieldKind::Float32 { min, max }, _) | (FieldKind::Float64 { min, max }, _) => {
            validate_float_default(name, *min, *max, default)
        }
        (FieldKind::Boolean, Value::Bool(_)) => Ok(()),
        (FieldKind::Boolean, _) => Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a bool default".into() }),
        (FieldKind::String { pattern, min_length, max_length, .. }, _) if field.list => {
            let Value::List(items) = default else {
                return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a list default".into() });
            };
            for item in items {
                validate_string_default(name, pattern, *min_length, *max_length, item)?;
            }
            Ok(())
        }
        (FieldKind::String { pattern, min_length, max_length, .. }, _) => {
            validate_string_default(name, pattern, *min_length, *max_length, default)
        }
        (FieldKind::Blob { min_length, max_length, .. }, _) if field.list => {
            let Value::List(items) = default else {
                return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a list default".into() });
            };
            for item in items {
                validate_blob_default(name, *min_length, *max_length, item)?;
            }
            Ok(())
        }
        (FieldKind::Blob { min_length, max_length, .. }, _) => validate_blob_default(name, *min_length, *max_length, default),
    }
}

fn validate_integer_default(
    name: &str,
    bits: u32,
    signed: bool,
    min: Option<i64>,
    max: Option<i64>,
    value: &Value,
) -> Result<(), SchemaError> {
    let Some(v) = value.as_int() else {
        return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected an integer default".into() });
    };
    let (lo, hi) = (min.unwrap_or(range_min(bits, signed)), max.unwrap_or(range_max(bits, signed)));
    if v < lo.max(range_min(bits, signed)) || v > hi.min(range_max(bits, signed)) {
        return Err(SchemaError::InvalidDefault {
            field: name.to_string(),
            reason: format!("{v} outside declared bounds [{lo}, {hi}] for a {bits}-bit integer"),
        });
    }
    Ok(())
}

fn validate_float_default(name: &str, min: Option<f64>, max: Option<f64>, value: &Value) -> Result<(), SchemaError> {
    let Some(v) = value.as_float() else {
        return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a float default".into() });
    };
    if let Some(min) = min {
        if v < min {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("{v} below min {min}") });
        }
    }
    if let Some(max) = max {
        if v > max {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("{v} above max {max}") });
        }
    }
    Ok(())
}

fn validate_string_default(
    name: &str,
    pattern: &Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    value: &Value,
) -> Result<(), SchemaError> {
    let Some(s) = value.as_str() else {
        return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a string default".into() });
    };
    if let Some(min) = min_length {
        if s.len() < min {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("length {} below minLength {min}", s.len()) });
        }
    }
    if let Some(max) = max_length {
        if s.len() > max {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("length {} above maxLength {max}", s.len()) });
        }
    }
    if let Some(pattern) = pattern {
        // Syntax already validated in check_field_constraints.
        let re = Regex::new(pattern).expect("pattern validated at schema-check time");
        if !re.is_match(s) {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("{s:?} does not match pattern {pattern:?}") });
        }
    }
    Ok(())
}

fn validate_blob_default(name: &str, min_length: Option<usize>, max_length: Option<usize>, value: &Value) -> Result<(), SchemaError> {
    let Some(b) = value.as_bytes() else {
        return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: "expected a bytes default".into() });
    };
    if let Some(min) = min_length {
        if b.len() < min {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("length {} below minLength {min}", b.len()) });
        }
    }
    if let Some(max) = max_length {
        if b.len() > max {
            return Err(SchemaError::InvalidDefault { field: name.to_string(), reason: format!("length {} above maxLength {max}", b.len()) });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Depth-first topological sort with `visiting`/`visited` marks; a back
/// edge (a dependency currently being visited) is a cycle.
fn topological_order(fields: &[(String, Field)], name_to_idx: &HashMap<String, usize>) -> Result<Vec<usize>, SchemaError> {
    let mut marks = vec![Mark::Unvisited; fields.len()];
    let mut order = Vec::with_capacity(fields.len());

    fn visit(
        i: usize,
        fields: &[(String, Field)],
        name_to_idx: &HashMap<String, usize>,
        marks: &mut [Mark],
        order: &mut Vec<usize>,
    ) -> Result<(), SchemaError> {
        match marks[i] {
            Mark::Visited => return Ok(()),
            Mark::Visiting => {
                return Err(SchemaError::CircularDependency { field: fields[i].0.clone() });
            }
            Mark::Unvisited => {}
        }
        marks[i] = Mark::Visiting;
        for dep in &fields[i].1.dependencies {
            let dep_idx = name_to_idx[dep];
            visit(dep_idx, fields, name_to_idx, marks, order)?;
        }
        marks[i] = Mark::Visited;
        order.push(i);
        Ok(())
    }

    for i in 0..fields.len() {
        visit(i, fields, name_to_idx, &mut marks, &mut order)?;
    }
    Ok(order)
}

fn static_bit_length(fields: &[(String, Field)], metadata: &Metadata) -> usize {
    let mut total = 0usize;
    if metadata.prefix.is_some() {
        total += 8;
    }
    for (_, field) in fields {
        if field.optional {
            total += 1;
        }
        // The list-count and fixed-width/includeSize contributions below are
        // only guaranteed on the wire when the field isn't gated off by a
        // dependency or absent-and-optional; a list field's `+16` is no
        // exception (an optional or dependency-gated list may write nothing
        // at all).
        if !field.dependencies.is_empty() {
            continue;
        }
        if field.optional {
            continue;
        }
        if field.list {
            total += 16;
            continue;
        }
        if let Some(bits) = field.kind.fixed_width_bits() {
            total += bits as usize;
        } else if field.kind.include_size().unwrap_or(true) {
            total += 16;
        }
    }
    total
}

/// Pure function from a frozen schema to its static bit-length floor; a
/// lower bound, not an exact size (spec §4.6).
pub fn static_bit_length_of(schema: &crate::compiled::Schema) -> usize {
    schema.static_bit_len()
}
