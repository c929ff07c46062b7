//! Copy and resolution errors.
//!
//! Type names are rendered through the registry's type table when the error
//! is raised, so messages stay readable after the table is gone.

use thiserror::Error;

use replica_types::{Ty, ValueError};

/// Error raised while resolving a copier or copying a value.
///
/// There is no partial-failure mode: a failing sub-copy aborts the whole
/// operation and the partially built graph is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// No strategy applies to the type.
    #[error("could not find a copier for type `{ty}`")]
    CopierNotFound { ty: String },

    /// Copiers are only built for closed types.
    #[error("type `{ty}` is an open generic definition; only closed instantiations can be copied")]
    OpenGenericDefinition { ty: String },

    #[error("type `{ty}` is a pointer type and cannot be copied")]
    PointerType { ty: String },

    #[error("type `{ty}` is a by-reference type and cannot be copied")]
    ByRefType { ty: String },

    /// The void strategy received something other than null.
    #[error("expected null while copying a field of unknown type, found {found}")]
    ExpectedNull { found: &'static str },

    /// Populate mode on a surrogate whose converter has no populator.
    #[error("converter `{converter}` for type `{ty}` does not support populating an existing value")]
    PopulateNotSupported { converter: String, ty: String },

    /// The resolved strategy cannot populate an existing destination.
    #[error("could not find a base copier for type `{ty}`")]
    BaseCopierNotFound { ty: String },

    /// A converter registered for one type reports a different source type.
    #[error("converter `{converter}` converts `{found}`, but was registered for `{expected}`")]
    ConverterMismatch {
        converter: String,
        expected: String,
        found: String,
    },

    /// A strategy received a value of the wrong shape or runtime type.
    #[error("expected a value of type `{expected}`, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A placeholder copier whose real construction failed.
    #[error("construction of the copier for `{ty}` failed: {reason}")]
    ConstructionFailed { ty: String, reason: String },

    /// A `Ty` handle that is not registered in the registry's table.
    #[error("type {ty} is not registered in the type table")]
    UnknownType { ty: Ty },

    /// Field or element access on a malformed value.
    #[error(transparent)]
    Value(#[from] ValueError),
}
