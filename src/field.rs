//! Declaration of logical fields used to build a [`crate::schema::SchemaDecl`].

use crate::value::Value;

/// The primitive family of a field. Kind-specific constraints live on the
/// variant; the modifiers shared by every kind (`list`, `optional`,
/// `dependencies`, `default`) live on [`Field`].
#[derive(Debug, Clone)]
pub enum FieldKind {
    Integer {
        bits: u32,
        signed: bool,
        min: Option<i64>,
        max: Option<i64>,
    },
    Float16 {
        min: Option<f64>,
        max: Option<f64>,
    },
    Float32 {
        min: Option<f64>,
        max: Option<f64>,
    },
    Float64 {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    String {
        /// `None` until validation fills in the default of `true` (spec §4.3
        /// step 2, "Default defaults").
        include_size: Option<bool>,
        pattern: Option<String>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Blob {
        include_size: Option<bool>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
}

impl FieldKind {
    pub fn is_boolean(&self) -> bool {
        matches!(self, FieldKind::Boolean)
    }

    /// Natural bit width of one element of this kind when fixed-width
    /// (Boolean and Integer/Float*); `None` for variable-width kinds
    /// (String/Blob).
    pub fn fixed_width_bits(&self) -> Option<u32> {
        match self {
            FieldKind::Boolean => Some(1),
            FieldKind::Integer { bits, .. } => Some(*bits),
            FieldKind::Float16 { .. } => Some(16),
            FieldKind::Float32 { .. } => Some(32),
            FieldKind::Float64 { .. } => Some(64),
            FieldKind::String { .. } | FieldKind::Blob { .. } => None,
        }
    }

    pub fn include_size(&self) -> Option<bool> {
        match self {
            FieldKind::String { include_size, .. } | FieldKind::Blob { include_size, .. } => {
                *include_size
            }
            _ => None,
        }
    }
}

/// A single named field in a schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub kind: FieldKind,
    /// The field holds an ordered sequence of the kind's primitive values;
    /// its length is encoded as a `u16` prefix.
    pub list: bool,
    /// The value may be absent; presence is signaled by one bit on the wire.
    pub optional: bool,
    /// Names of other `Boolean` fields in the same schema. The field is
    /// present on the wire only if every named dependency decoded truthy.
    pub dependencies: Vec<String>,
    /// Substituted when the user's value is absent at encode time, and
    /// materialized on decode when the field was not written.
    pub default: Option<Value>,
}

impl Field {
    /// A plain, non-optional, non-list, no-default, no-dependency field of
    /// `kind`. Use the builder methods to add modifiers.
    pub fn new(kind: FieldKind) -> Self {
        Field {
            kind,
            list: false,
            optional: false,
            dependencies: Vec::new(),
            default: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// A field is considered required in the value mapping iff it has
    /// neither `optional: true` nor a `default`.
    pub fn is_required_in_mapping(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// Schema-level metadata (spec §3, "Schema (the aggregate entity)").
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// An 8-bit tag prepended to every encoded record, for multiplexed
    /// streams.
    pub prefix: Option<u8>,
    /// Informational flag; does not change the single-record wire format.
    pub repeated: bool,
}
