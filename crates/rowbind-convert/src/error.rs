/// A single problem found while analyzing a record shape.
///
/// Analysis never stops at the first problem: the shape analyzer walks
/// every field, collects one `ShapeError` per violation, and reports them
/// together. The registry produces the converter-related variants; the
/// analyzer in `rowbind-shape` produces the binding-related ones.
///
/// ```text
/// ┌──────────────────────┬──────────────────────────────────────────────┐
/// │ Variant              │ Cause                                        │
/// ├──────────────────────┼──────────────────────────────────────────────┤
/// │ NoFields             │ Record declares no field at all              │
/// │ MissingBinding       │ Field has neither index nor name             │
/// │ ConflictingBinding   │ Field has both index and name                │
/// │ InvalidIndex         │ Index tag is not a non-negative integer      │
/// │ UndefinedEncoding    │ Named encoding is neither user nor built-in  │
/// │ UnsupportedEncoding  │ Built-in encoding cannot produce field type  │
/// │ EncodingTypeMismatch │ User encoding returns a different type       │
/// │ UnsupportedType      │ No converter exists for the field type       │
/// │ UnsupportedElement   │ No converter exists for a sequence element   │
/// │ MixedBindings        │ Index-bound and name-bound fields together   │
/// └──────────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("The struct has no field")]
    NoFields,

    #[error("Please specify name or index to the struct field: {field}")]
    MissingBinding { field: &'static str },

    /// Same text as [`MissingBinding`](Self::MissingBinding); the variant
    /// keeps the two causes apart for callers that match on it.
    #[error("Please specify name or index to the struct field: {field}")]
    ConflictingBinding { field: &'static str },

    #[error("Failed to parse index of field {field}: {raw:?}")]
    InvalidIndex { field: &'static str, raw: String },

    #[error("Encoding {encoding:?} is not defined")]
    UndefinedEncoding { encoding: String },

    #[error("Encoding {encoding:?} does not support {type_name}")]
    UnsupportedEncoding {
        encoding: String,
        type_name: String,
    },

    /// A user-registered encoding produces a value of another type than
    /// the field it was attached to.
    #[error("The type of field {field:?} is {field_type}, but enc {encoding:?} returns {returns:?}")]
    EncodingTypeMismatch {
        field: &'static str,
        field_type: String,
        encoding: String,
        returns: String,
    },

    #[error("Unexpected field type for {field}: {type_name}")]
    UnsupportedType {
        field: &'static str,
        type_name: String,
    },

    #[error("Failed to create a converter for Vec<{type_name}>")]
    UnsupportedElement { type_name: String },

    #[error("Fields with name and fields with index are mixed")]
    MixedBindings,
}

/// The built-in `bool` converter rejected its input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parsing {input:?}: invalid syntax for bool")]
pub struct InvalidBool {
    pub input: String,
}
