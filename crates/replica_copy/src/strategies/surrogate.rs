use std::sync::Arc;

use replica_types::{Ty, Value};

use crate::{BaseCopier, CopyContext, CopyError, DeepCopier};

/// Bidirectional conversion between a type and its surrogate.
///
/// A converter lets a type that cannot be copied field by field be copied
/// through a stand-in that can: the original is converted to the surrogate,
/// the surrogate is deep-copied, and the copy is converted back.
pub trait Converter: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// The type this converter was written for.
    fn source_type(&self) -> Ty;

    fn surrogate_type(&self) -> Ty;

    fn to_surrogate(&self, value: &Value) -> Result<Value, CopyError>;

    fn from_surrogate(&self, surrogate: &Value) -> Result<Value, CopyError>;

    /// Populate support, if the converter can write into an existing value.
    fn populator(&self) -> Option<&dyn Populator> {
        None
    }
}

/// Writes a surrogate's state into an already-allocated value.
pub trait Populator: Send + Sync {
    fn populate(&self, surrogate: &Value, target: &Value) -> Result<(), CopyError>;
}

/// Surrogate round-trip for reference types.
pub struct SurrogateCopier {
    ty_name: String,
    converter: Arc<dyn Converter>,
    surrogate: Arc<dyn DeepCopier>,
}

impl SurrogateCopier {
    pub fn new(
        ty_name: impl Into<String>,
        converter: Arc<dyn Converter>,
        surrogate: Arc<dyn DeepCopier>,
    ) -> Self {
        Self {
            ty_name: ty_name.into(),
            converter,
            surrogate,
        }
    }

    fn copy_surrogate(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        let surrogate = self.converter.to_surrogate(input)?;
        self.surrogate.deep_copy(&surrogate, ctx)
    }
}

impl DeepCopier for SurrogateCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        if let Some(copy) = ctx.try_get_copy(input) {
            return Ok(copy);
        }
        let copied = self.copy_surrogate(input, ctx)?;
        let result = self.converter.from_surrogate(&copied)?;
        ctx.record_copy(input, result.clone());
        Ok(result)
    }

    fn into_base(self: Arc<Self>) -> Option<Arc<dyn BaseCopier>> {
        Some(self)
    }

    fn strategy_name(&self) -> &'static str {
        "surrogate"
    }
}

impl BaseCopier for SurrogateCopier {
    fn populate(
        &self,
        input: &Value,
        output: &Value,
        ctx: &mut CopyContext,
    ) -> Result<(), CopyError> {
        let Some(populator) = self.converter.populator() else {
            return Err(CopyError::PopulateNotSupported {
                converter: self.converter.name().to_owned(),
                ty: self.ty_name.clone(),
            });
        };
        let copied = self.copy_surrogate(input, ctx)?;
        populator.populate(&copied, output)
    }
}

/// Surrogate round-trip for value types; no identity bookkeeping.
pub struct ValueSurrogateCopier {
    converter: Arc<dyn Converter>,
    surrogate: Arc<dyn DeepCopier>,
}

impl ValueSurrogateCopier {
    pub fn new(converter: Arc<dyn Converter>, surrogate: Arc<dyn DeepCopier>) -> Self {
        Self {
            converter,
            surrogate,
        }
    }
}

impl DeepCopier for ValueSurrogateCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        let surrogate = self.converter.to_surrogate(input)?;
        let copied = self.surrogate.deep_copy(&surrogate, ctx)?;
        self.converter.from_surrogate(&copied)
    }

    fn strategy_name(&self) -> &'static str {
        "value surrogate"
    }
}
