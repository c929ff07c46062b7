use replica_types::{Ty, Value};

use crate::{CopyContext, CopyError, DeepCopier};

/// Terminal fallback: copies whatever is in a slot by its runtime type.
///
/// Resolved for `OBJECT`, interfaces and abstract classes, and used by other
/// strategies whenever the static type of a slot says nothing useful.
#[derive(Copy, Clone, Debug, Default)]
pub struct ObjectCopier;

impl ObjectCopier {
    /// Copy `input` by redispatching on its runtime type.
    ///
    /// Already-copied references come from the identity map; a bare
    /// `OBJECT` instance carries no state and is returned as-is.
    pub fn copy_any(input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if let Some(copy) = ctx.try_get_copy(input) {
            return Ok(copy);
        }
        let Some(ty) = input.runtime_type() else {
            return Ok(Value::Null);
        };
        if ty == Ty::OBJECT {
            return Ok(input.clone());
        }

        let registry = ctx.registry();
        let copier = registry.require(ty)?;
        // An instance of an interface or abstract type would dispatch back here.
        if registry.is_object_copier(&copier) {
            return Err(CopyError::CopierNotFound {
                ty: registry.type_name(ty),
            });
        }
        copier.deep_copy(input, ctx)
    }
}

impl DeepCopier for ObjectCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        Self::copy_any(input, ctx)
    }

    fn strategy_name(&self) -> &'static str {
        "object"
    }
}
