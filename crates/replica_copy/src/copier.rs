//! Copier strategy traits.
//!
//! A strategy is resolved once per type and shared across threads; all
//! per-operation state lives in the [`CopyContext`] passed to each call.

use std::sync::Arc;

use replica_types::{Ty, TypeTable, Value};

use crate::{CopierRegistry, CopyContext, CopyError};

/// A resolved deep-copy strategy bound to one type.
pub trait DeepCopier: Send + Sync {
    /// Produce an independent copy of `input`.
    ///
    /// Strategies that allocate a reference-type destination must call
    /// [`CopyContext::record_copy`] before recursing into children, so
    /// cycles back to `input` resolve to the new destination.
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError>;

    /// Whether this strategy returns its input unchanged.
    fn is_shallow(&self) -> bool {
        false
    }

    /// Populate-mode view of this strategy, if it has one.
    fn into_base(self: Arc<Self>) -> Option<Arc<dyn BaseCopier>> {
        None
    }

    /// Short strategy name for logs and diagnostics.
    fn strategy_name(&self) -> &'static str;
}

/// Copies into an already-allocated destination instead of allocating one.
pub trait BaseCopier: Send + Sync {
    fn populate(&self, input: &Value, output: &Value, ctx: &mut CopyContext)
        -> Result<(), CopyError>;
}

/// A shared strategy matched by predicate rather than by exact type.
pub trait GeneralizedCopier: DeepCopier {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool;

    /// This strategy as a plain copier. Implementations return `self`.
    fn into_copier(self: Arc<Self>) -> Arc<dyn DeepCopier>;
}

/// A plugin that builds a dedicated strategy for each accepted type.
pub trait SpecializableCopier: Send + Sync {
    fn is_supported_type(&self, ty: Ty, table: &TypeTable) -> bool;

    /// Build the strategy for `ty`. Sub-copiers are looked up via `registry`.
    fn specialize(
        &self,
        ty: Ty,
        registry: &CopierRegistry,
    ) -> Result<Arc<dyn DeepCopier>, CopyError>;
}
