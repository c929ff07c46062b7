use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{CopierRegistry, CopyContext};

/// Recycles [`CopyContext`]s so their identity maps keep their allocation.
///
/// At most `pool_capacity` idle contexts are retained; surplus contexts are
/// dropped when returned.
pub struct CopyContextPool {
    registry: Arc<CopierRegistry>,
    idle: Mutex<Vec<CopyContext>>,
    capacity: usize,
}

impl CopyContextPool {
    pub fn new(registry: Arc<CopierRegistry>) -> Self {
        let capacity = registry.config().pool_capacity;
        Self {
            registry,
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Borrow a clean context. It is reset and returned on drop, on every
    /// exit path.
    pub fn acquire(&self) -> PooledContext<'_> {
        let context = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| CopyContext::new(Arc::clone(&self.registry)));
        PooledContext {
            pool: self,
            context,
        }
    }

    /// Number of contexts waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut context: CopyContext) {
        context.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(context);
        }
    }
}

/// A context on loan from a [`CopyContextPool`].
pub struct PooledContext<'pool> {
    pool: &'pool CopyContextPool,
    context: CopyContext,
}

impl Deref for PooledContext<'_> {
    type Target = CopyContext;

    fn deref(&self) -> &CopyContext {
        &self.context
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut CopyContext {
        &mut self.context
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        let replacement = CopyContext::detached(Arc::clone(&self.pool.registry));
        let context = std::mem::replace(&mut self.context, replacement);
        self.pool.release(context);
    }
}
