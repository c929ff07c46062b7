//! Error types for type table construction and value access.

use thiserror::Error;

use crate::Ty;

/// Type table validation failure, reported by
/// [`TypeTableBuilder::build`](crate::TypeTableBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeTableError {
    /// A `Ty` handle that was never registered in this table.
    #[error("type {ty} is not registered in this table")]
    UnknownType { ty: Ty },

    /// A class declared a base that is not a class.
    #[error("type `{name}` cannot derive from `{base}`: base types must be classes")]
    InvalidBase { name: String, base: String },

    /// Following base types from a class returned to the class itself.
    #[error("inheritance cycle through `{name}`")]
    InheritanceCycle { name: String },

    /// A generic definition instantiated with the wrong number of arguments.
    #[error("generic definition `{name}` expects {expected} type arguments, got {found}")]
    GenericArity {
        name: String,
        expected: usize,
        found: usize,
    },

    /// `instantiate` was called with something other than a generic definition.
    #[error("type `{name}` is not a generic definition")]
    NotGenericDefinition { name: String },

    /// Arrays must have at least one dimension.
    #[error("array of `{elem}` must have rank >= 1")]
    ZeroRank { elem: String },

    /// Fields or a base were attached to a type that cannot carry them.
    #[error("type `{name}` cannot declare {what}")]
    NotComposite { name: String, what: &'static str },

    /// `Nullable<T>` was requested for a reference type.
    #[error("type `{name}` is not a value type and cannot be made nullable")]
    NotValueType { name: String },
}

/// Invalid access to a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Field index past the end of an object or struct.
    #[error("field index {index} out of range for {len} fields")]
    FieldOutOfRange { index: usize, len: usize },

    /// Element index past the end of an array.
    #[error("array index {index:?} out of range for lengths {lengths:?}")]
    IndexOutOfRange {
        index: Vec<usize>,
        lengths: Vec<usize>,
    },

    /// Element storage does not match the product of the dimension lengths.
    #[error("array with lengths {lengths:?} needs {expected} elements, got {found}")]
    ShapeMismatch {
        lengths: Vec<usize>,
        expected: usize,
        found: usize,
    },
}
