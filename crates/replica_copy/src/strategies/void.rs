use replica_types::Value;

use crate::{CopyContext, CopyError, DeepCopier};

/// Copier for slots whose declared type could not be resolved.
///
/// Such a slot can only ever hold null.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidCopier;

impl DeepCopier for VoidCopier {
    fn deep_copy(&self, input: &Value, _ctx: &mut CopyContext) -> Result<Value, CopyError> {
        match input {
            Value::Null => Ok(Value::Null),
            other => Err(CopyError::ExpectedNull {
                found: other.kind_name(),
            }),
        }
    }

    fn strategy_name(&self) -> &'static str {
        "void"
    }
}
