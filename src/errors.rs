//! Error kinds raised by schema validation and by the compiled codec.

/// Raised by [`crate::schema::SchemaDecl::compile`] / [`crate::define_schemas`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// `Integer` field's `bits` is outside `[1, 53]`.
    InvalidIntegerBits { field: String, bits: u32 },
    /// A `default` value fell outside the field's own min/max/length/pattern.
    InvalidDefault { field: String, reason: String },
    /// `list: true` String/Blob field without `includeSize: true`.
    ListRequiresIncludeSize { field: String },
    /// `dependencies` names a field that doesn't exist in the schema.
    UnknownDependency { field: String, dependency: String },
    /// `dependencies` names a field that isn't `Boolean`.
    NonBooleanDependency { field: String, dependency: String },
    /// `dependencies` names a `Boolean` field declared with `list: true`;
    /// a list of booleans has no single truthy value to gate on.
    ListDependency { field: String, dependency: String },
    /// The dependency relation has a cycle; `field` is where the back edge
    /// was detected.
    CircularDependency { field: String },
    /// A `String` field's `pattern` is not a valid regular expression.
    InvalidPattern { field: String, pattern: String },
    /// `minLength`/`maxLength` or `min`/`max` where `min > max`.
    InvalidRange { field: String },
}

/// Raised by [`crate::compiled::Schema::encode`] / `encode_into` / `decode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Numeric value outside `[min, max]`, or outside the representable
    /// range of an integer's bit width, or a list/string/blob outside its
    /// declared length bounds.
    OutOfRange { field: String, reason: String },
    /// String `pattern` mismatch, UTF-8 decode failure, or a
    /// variable-length integer missing its terminator.
    Malformed { field: String, reason: String },
    /// Encoding into a fixed-capacity writer would exceed its capacity.
    Overflow { field: String },
    /// Decoding tried to read past the end of the input.
    Underflow { field: String },
    /// The value mapping is missing a field that is required (neither
    /// `optional` nor carrying a `default`) and was not gated off by any
    /// dependency.
    MissingField { field: String },
}
