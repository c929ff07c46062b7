//! Type table and runtime values for the Replica deep copier.
//!
//! This crate has no copying logic. It defines:
//!
//! - [`Ty`]: a compact handle to a registered runtime type
//! - [`TypeTable`] / [`TypeTableBuilder`]: the immutable type registry with
//!   its precomputed hierarchy index
//! - [`Value`] and the heap shapes behind it ([`Object`], [`ArrayObject`],
//!   [`StructValue`], [`TupleValue`])

mod error;
mod flags;
mod table;
mod ty;
pub mod value;

pub use error::{TypeTableError, ValueError};
pub use flags::TypeFlags;
pub use table::{
    Field, GenericInstance, GenericShape, Primitive, StandardTypes, TypeInfo, TypeKind, TypeTable,
    TypeTableBuilder,
};
pub use ty::Ty;
pub use value::{ArrayObject, ArrayRef, ObjRef, Object, StructValue, TupleValue, Value};
