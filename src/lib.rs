//! # bitwire
//!
//! A library for schema-driven, bit-level binary serialization.
//!
//! Declare a schema as a named, ordered list of fields — integers of
//! arbitrary bit width, floats, booleans, strings, and blobs, with optional
//! modifiers for lists, optionality, inter-field dependencies, and defaults
//! — compile it once, then encode and decode values against it with a
//! specialized codec built for that schema.
//!
//! ## Example
//!
//! ```
//! use bitwire::field::{Field, FieldKind};
//! use bitwire::schema::SchemaDecl;
//! use bitwire::value::{Record, Value};
//!
//! let schema = SchemaDecl::new()
//!     .field("id", Field::new(FieldKind::Integer { bits: 12, signed: false, min: None, max: None }))
//!     .field("active", Field::new(FieldKind::Boolean))
//!     .compile()
//!     .unwrap();
//!
//! let mut value = Record::new();
//! value.insert("id".to_string(), Value::Int(0x123));
//! value.insert("active".to_string(), Value::Bool(true));
//!
//! let bytes = schema.encode(&value).unwrap();
//! assert_eq!(schema.decode(&bytes).unwrap(), value);
//! ```

pub mod bits;
pub mod compiled;
pub mod errors;
pub mod field;
pub mod schema;
pub mod value;

#[cfg(feature = "serde")]
pub mod serde_schema;

use std::collections::BTreeMap;

use errors::SchemaError;
use schema::SchemaDecl;

/// Compiles every declaration in `table`, keyed by schema name.
///
/// Each declaration is validated and frozen independently; a failure on one
/// schema does not affect the others, but the whole call fails if any one
/// of them does (the first error encountered is returned).
pub fn define_schemas(
    table: impl IntoIterator<Item = (String, SchemaDecl)>,
) -> Result<BTreeMap<String, compiled::Schema>, SchemaError> {
    table.into_iter().map(|(name, decl)| Ok((name, decl.compile()?))).collect()
}
