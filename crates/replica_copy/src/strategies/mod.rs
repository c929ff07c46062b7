//! Built-in copier strategies.
//!
//! | Strategy | Applies to |
//! |---|---|
//! | [`ObjectCopier`] | `OBJECT`, interfaces, abstract classes; "copy whatever is in this slot" |
//! | [`ShallowCopier`] | shallow-copyable types |
//! | [`VoidCopier`] | fields whose declared type is unknown |
//! | [`ArrayCopier`] | rank-1 arrays |
//! | [`MultiDimensionalArrayCopier`] | arrays of rank 2 and above |
//! | [`SurrogateCopier`] / [`ValueSurrogateCopier`] | types with a registered converter |
//! | [`FieldwiseCopier`] | classes, structs and tuples copied field by field |
//! | [`TypedCopier`] | typed call sites over any of the above |

mod array;
mod fieldwise;
mod multi_array;
mod object;
mod shallow;
mod surrogate;
mod typed;
mod void;

pub use array::ArrayCopier;
pub use fieldwise::{FieldwiseCopier, FieldwisePlugin};
pub use multi_array::MultiDimensionalArrayCopier;
pub use object::ObjectCopier;
pub use shallow::ShallowCopier;
pub use surrogate::{Converter, Populator, SurrogateCopier, ValueSurrogateCopier};
pub use typed::{CopyValue, TypedCopier};
pub use void::VoidCopier;

use replica_types::Value;

use crate::CopyError;

/// `TypeMismatch` for a strategy that received the wrong shape.
pub(crate) fn mismatch(expected: &str, found: &Value) -> CopyError {
    CopyError::TypeMismatch {
        expected: expected.to_owned(),
        found: found.kind_name().to_owned(),
    }
}
