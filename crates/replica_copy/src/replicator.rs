//! Top-level entry point.

use std::sync::Arc;

use replica_types::Value;

use crate::strategies::CopyValue;
use crate::{CopierRegistry, CopyContextPool, CopyError};

/// Deep-copies values with a shared registry and a pool of contexts.
///
/// Each call borrows its own context, so one `Replicator` can serve any
/// number of threads.
pub struct Replicator {
    registry: Arc<CopierRegistry>,
    pool: CopyContextPool,
}

impl Replicator {
    pub fn new(registry: CopierRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<CopierRegistry>) -> Self {
        let pool = CopyContextPool::new(Arc::clone(&registry));
        Self { registry, pool }
    }

    pub fn registry(&self) -> &Arc<CopierRegistry> {
        &self.registry
    }

    /// The context pool, for callers driving several copies that must share
    /// one identity map.
    pub fn pool(&self) -> &CopyContextPool {
        &self.pool
    }

    /// Produce a fully independent copy of `value`.
    pub fn deep_copy(&self, value: &Value) -> Result<Value, CopyError> {
        let mut ctx = self.pool.acquire();
        ctx.deep_copy(value)
    }

    /// Typed variant of [`deep_copy`](Self::deep_copy).
    ///
    /// Goes through the registry's typed adapter for the value's runtime
    /// type, so shallow-copyable values skip conversion entirely.
    pub fn deep_copy_typed<T: CopyValue>(&self, value: T) -> Result<T, CopyError> {
        let Some(ty) = value.runtime_type() else {
            return Ok(value);
        };
        let copier = self.registry.require_typed::<T>(ty)?;
        let mut ctx = self.pool.acquire();
        copier.deep_copy(value, &mut ctx)
    }
}
