use std::sync::Arc;

use replica_types::{ArrayObject, Ty, Value};

use super::mismatch;
use crate::{CopyContext, CopyError, DeepCopier};

/// Rank-1 array copier specialized to one element type.
///
/// The element copier is resolved when the array copier is built, so a
/// copy never goes back to the registry per element.
pub struct ArrayCopier {
    ty_name: String,
    elem_ty: Ty,
    elem: Arc<dyn DeepCopier>,
}

impl ArrayCopier {
    pub fn new(ty_name: impl Into<String>, elem_ty: Ty, elem: Arc<dyn DeepCopier>) -> Self {
        Self {
            ty_name: ty_name.into(),
            elem_ty,
            elem,
        }
    }

    pub fn elem_ty(&self) -> Ty {
        self.elem_ty
    }
}

impl DeepCopier for ArrayCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if let Some(copy) = ctx.try_get_copy(input) {
            return Ok(copy);
        }
        let Value::Array(source) = input else {
            return Err(mismatch(&self.ty_name, input));
        };
        if source.rank() != 1 {
            return Err(mismatch(&self.ty_name, input));
        }

        let elems = source.to_vec();
        if self.elem.is_shallow() {
            let copy = Value::Array(ArrayObject::vector(source.ty(), elems));
            ctx.record_copy(input, copy.clone());
            return Ok(copy);
        }

        let dest = ArrayObject::with_lengths(source.ty(), &[elems.len()]);
        ctx.record_copy(input, Value::Array(Arc::clone(&dest)));
        for (i, elem) in elems.iter().enumerate() {
            let copied = self.elem.deep_copy(elem, ctx)?;
            dest.set(i, copied)?;
        }
        Ok(Value::Array(dest))
    }

    fn strategy_name(&self) -> &'static str {
        "array"
    }
}
