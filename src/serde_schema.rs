//! JSON-deserializable schema description.
//!
//! These types describe the *shape* of a schema so it can be shipped as
//! data (a JSON file, a config blob) instead of Rust source, then converted
//! into the core [`crate::schema::SchemaDecl`] and compiled the normal way.

use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldKind, Metadata};
use crate::schema::SchemaDecl;
use crate::value::Value;

/// Kind of field in the schema.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum FieldKindDef {
    Integer { bits: u32, #[serde(default)] signed: bool, #[serde(default)] min: Option<i64>, #[serde(default)] max: Option<i64> },
    Float16 { #[serde(default)] min: Option<f64>, #[serde(default)] max: Option<f64> },
    Float32 { #[serde(default)] min: Option<f64>, #[serde(default)] max: Option<f64> },
    Float64 { #[serde(default)] min: Option<f64>, #[serde(default)] max: Option<f64> },
    Boolean,
    String {
        #[serde(default, rename = "includeSize")]
        include_size: Option<bool>,
        #[serde(default)]
        pattern: Option<String>,
        #[serde(default, rename = "minLength")]
        min_length: Option<usize>,
        #[serde(default, rename = "maxLength")]
        max_length: Option<usize>,
    },
    Blob {
        #[serde(default, rename = "includeSize")]
        include_size: Option<bool>,
        #[serde(default, rename = "minLength")]
        min_length: Option<usize>,
        #[serde(default, rename = "maxLength")]
        max_length: Option<usize>,
    },
}

impl From<FieldKindDef> for FieldKind {
    fn from(def: FieldKindDef) -> Self {
        match def {
            FieldKindDef::Integer { bits, signed, min, max } => FieldKind::Integer { bits, signed, min, max },
            FieldKindDef::Float16 { min, max } => FieldKind::Float16 { min, max },
            FieldKindDef::Float32 { min, max } => FieldKind::Float32 { min, max },
            FieldKindDef::Float64 { min, max } => FieldKind::Float64 { min, max },
            FieldKindDef::Boolean => FieldKind::Boolean,
            FieldKindDef::String { include_size, pattern, min_length, max_length } => {
                FieldKind::String { include_size, pattern, min_length, max_length }
            }
            FieldKindDef::Blob { include_size, min_length, max_length } => FieldKind::Blob { include_size, min_length, max_length },
        }
    }
}

/// A primitive value or list of them, tagged by JSON `type` so a `Bytes`
/// array of small integers is never mistaken for a `List` of them.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueDef {
    Int { value: i64 },
    Float { value: f64 },
    Bool { value: bool },
    Str { value: String },
    Bytes { value: Vec<u8> },
    List { value: Vec<ValueDef> },
}

impl From<ValueDef> for Value {
    fn from(def: ValueDef) -> Self {
        match def {
            ValueDef::Int { value } => Value::Int(value),
            ValueDef::Float { value } => Value::Float(value),
            ValueDef::Bool { value } => Value::Bool(value),
            ValueDef::Str { value } => Value::Str(value),
            ValueDef::Bytes { value } => Value::Bytes(value),
            ValueDef::List { value } => Value::List(value.into_iter().map(Value::from).collect()),
        }
    }
}

/// Description of a single field, including the name it's keyed under.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKindDef,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub default: Option<ValueDef>,
}

impl From<FieldDef> for (String, Field) {
    fn from(def: FieldDef) -> Self {
        let mut field = Field::new(def.kind.into());
        field.list = def.list;
        field.optional = def.optional;
        field.dependencies = def.dependencies;
        field.default = def.default.map(Value::from);
        (def.name, field)
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct MetadataDef {
    #[serde(default)]
    pub prefix: Option<u8>,
    #[serde(default)]
    pub repeated: bool,
}

impl From<MetadataDef> for Metadata {
    fn from(def: MetadataDef) -> Self {
        Metadata { prefix: def.prefix, repeated: def.repeated }
    }
}

/// Top-level schema description: an ordered list of fields plus metadata.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDeclDef {
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub metadata: Option<MetadataDef>,
}

impl From<SchemaDeclDef> for SchemaDecl {
    fn from(def: SchemaDeclDef) -> Self {
        let mut decl = SchemaDecl::new();
        for field_def in def.fields {
            let (name, field) = field_def.into();
            decl = decl.field(name, field);
        }
        if let Some(metadata) = def.metadata {
            decl = decl.with_metadata(metadata.into());
        }
        decl
    }
}
