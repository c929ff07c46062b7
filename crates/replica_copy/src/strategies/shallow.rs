use replica_types::Value;

use crate::{CopyContext, CopyError, DeepCopier};

/// Returns its input unchanged.
///
/// Shared by every shallow-copyable type: immutable values and values with
/// no identity can be handed to the copy as they are.
#[derive(Copy, Clone, Debug, Default)]
pub struct ShallowCopier;

impl DeepCopier for ShallowCopier {
    #[inline]
    fn deep_copy(&self, input: &Value, _ctx: &mut CopyContext) -> Result<Value, CopyError> {
        Ok(input.clone())
    }

    fn is_shallow(&self) -> bool {
        true
    }

    fn strategy_name(&self) -> &'static str {
        "shallow"
    }
}
