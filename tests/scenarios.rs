//! Black-box encode/decode scenarios against the public API, covering the
//! worked examples a schema author would reach for first.

use bitwire::errors::CodecError;
use bitwire::field::{Field, FieldKind, Metadata};
use bitwire::schema::SchemaDecl;
use bitwire::value::{Record, Value};

fn boolean() -> Field {
    Field::new(FieldKind::Boolean)
}

fn unsigned(bits: u32) -> Field {
    Field::new(FieldKind::Integer { bits, signed: false, min: None, max: None })
}

fn plain_string() -> Field {
    Field::new(FieldKind::String { include_size: None, pattern: None, min_length: None, max_length: None })
}

#[test]
fn seven_booleans_pack_into_a_single_byte() {
    let schema = SchemaDecl::new()
        .field("a", boolean())
        .field("b", boolean())
        .field("c", boolean())
        .field("d", boolean())
        .field("e", boolean())
        .field("f", boolean())
        .field("g", boolean())
        .compile()
        .unwrap();

    let value: Record = [
        ("a".to_string(), Value::Bool(true)),
        ("b".to_string(), Value::Bool(true)),
        ("c".to_string(), Value::Bool(false)),
        ("d".to_string(), Value::Bool(true)),
        ("e".to_string(), Value::Bool(false)),
        ("f".to_string(), Value::Bool(false)),
        ("g".to_string(), Value::Bool(true)),
    ]
    .into();

    let bytes = schema.encode(&value).unwrap();
    assert_eq!(bytes.len(), 1);
    assert_eq!(schema.decode(&bytes).unwrap(), value);
}

#[test]
fn dependent_field_absent_when_gate_is_false_present_when_true() {
    let schema = SchemaDecl::new()
        .field("has_nickname", boolean())
        .field("nickname", plain_string().depends_on("has_nickname"))
        .compile()
        .unwrap();

    let off: Record = [("has_nickname".to_string(), Value::Bool(false))].into();
    let bytes = schema.encode(&off).unwrap();
    let decoded = schema.decode(&bytes).unwrap();
    assert_eq!(decoded.get("has_nickname"), Some(&Value::Bool(false)));
    assert!(!decoded.contains_key("nickname"));

    let on: Record = [
        ("has_nickname".to_string(), Value::Bool(true)),
        ("nickname".to_string(), Value::Str("Nimbus".to_string())),
    ]
    .into();
    let bytes = schema.encode(&on).unwrap();
    assert_eq!(schema.decode(&bytes).unwrap(), on);
}

#[test]
fn optional_field_carries_its_own_presence_bit_independent_of_dependencies() {
    let schema = SchemaDecl::new()
        .field("gate", boolean())
        .field("note", plain_string().depends_on("gate").optional())
        .compile()
        .unwrap();

    // Gate true, but the caller still omits the optional value.
    let value: Record = [("gate".to_string(), Value::Bool(true))].into();
    let bytes = schema.encode(&value).unwrap();
    let decoded = schema.decode(&bytes).unwrap();
    assert!(!decoded.contains_key("note"));

    let value: Record = [("gate".to_string(), Value::Bool(true)), ("note".to_string(), Value::Str("ok".to_string()))].into();
    let bytes = schema.encode(&value).unwrap();
    assert_eq!(schema.decode(&bytes).unwrap(), value);
}

#[test]
fn list_of_integers_round_trips_with_its_count_prefix() {
    let schema = SchemaDecl::new().field("samples", unsigned(10).list()).compile().unwrap();
    let value: Record = [("samples".to_string(), Value::List(vec![Value::Int(0), Value::Int(1023), Value::Int(512)]))].into();
    let bytes = schema.encode(&value).unwrap();
    assert_eq!(schema.decode(&bytes).unwrap(), value);
}

#[test]
fn metadata_prefix_is_checked_on_decode() {
    let schema = SchemaDecl::new()
        .field("n", unsigned(8))
        .with_metadata(Metadata { prefix: Some(0x7e), repeated: false })
        .compile()
        .unwrap();
    let value: Record = [("n".to_string(), Value::Int(3))].into();
    let bytes = schema.encode(&value).unwrap();
    assert_eq!(bytes[0], 0x7e);

    let mut wrong_prefix = bytes.clone();
    wrong_prefix[0] = 0x00;
    assert!(matches!(schema.decode(&wrong_prefix), Err(CodecError::Malformed { .. })));
}

#[test]
fn blob_and_float_fields_round_trip() {
    let schema = SchemaDecl::new()
        .field("payload", Field::new(FieldKind::Blob { include_size: None, min_length: None, max_length: None }))
        .field("ratio", Field::new(FieldKind::Float32 { min: None, max: None }))
        .compile()
        .unwrap();
    let value: Record = [
        ("payload".to_string(), Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
        ("ratio".to_string(), Value::Float(0.5)),
    ]
    .into();
    let bytes = schema.encode(&value).unwrap();
    assert_eq!(schema.decode(&bytes).unwrap(), value);
}

#[test]
fn schema_with_pattern_rejects_non_matching_strings() {
    let schema = SchemaDecl::new()
        .field(
            "code",
            Field::new(FieldKind::String { include_size: None, pattern: Some("^[A-Z]{3}$".to_string()), min_length: None, max_length: None }),
        )
        .compile()
        .unwrap();

    let good: Record = [("code".to_string(), Value::Str("ABC".to_string()))].into();
    assert!(schema.encode(&good).is_ok());

    let bad: Record = [("code".to_string(), Value::Str("abcd".to_string()))].into();
    assert!(matches!(schema.encode(&bad), Err(CodecError::Malformed { .. })));
}

#[test]
fn defaults_fill_in_on_decode_when_a_dependency_gate_is_closed() {
    let schema = SchemaDecl::new()
        .field("enabled", boolean())
        .field("level", unsigned(8).depends_on("enabled").default(Value::Int(0)))
        .compile()
        .unwrap();

    let value: Record = [("enabled".to_string(), Value::Bool(false))].into();
    let bytes = schema.encode(&value).unwrap();
    let decoded = schema.decode(&bytes).unwrap();
    assert_eq!(decoded.get("level"), Some(&Value::Int(0)));
}
