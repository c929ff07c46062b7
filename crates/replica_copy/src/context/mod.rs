//! Per-operation copy state.
//!
//! A [`CopyContext`] carries the identity map of one deep-copy operation:
//! original heap object to its copy. Strategies record a destination as soon
//! as it is allocated, before copying children, so any later reference to
//! the same original (including a cycle back to it) resolves to the same
//! copy.
//!
//! The map is keyed by the address of the original allocation and also
//! holds a handle to the original, so the address cannot be freed and reused
//! while the entry exists.

mod pool;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use replica_types::Value;

use crate::{CopierRegistry, CopyError};

pub use pool::{CopyContextPool, PooledContext};

/// Identity map and registry handle for one deep-copy operation.
///
/// Owned by exactly one operation at a time; never shared between threads
/// while in use.
pub struct CopyContext {
    registry: Arc<CopierRegistry>,
    /// Original address -> (original, copy).
    copies: FxHashMap<usize, (Value, Value)>,
}

impl CopyContext {
    pub fn new(registry: Arc<CopierRegistry>) -> Self {
        let capacity = registry.config().identity_map_capacity;
        let mut copies = FxHashMap::default();
        copies.reserve(capacity);
        Self { registry, copies }
    }

    /// Context with an unallocated identity map.
    pub(crate) fn detached(registry: Arc<CopierRegistry>) -> Self {
        Self {
            registry,
            copies: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<CopierRegistry> {
        &self.registry
    }

    /// Copy already made for `original` in this operation.
    ///
    /// Null is its own copy. Value types have no identity and always report
    /// `None`.
    pub fn try_get_copy(&self, original: &Value) -> Option<Value> {
        if original.is_null() {
            return Some(Value::Null);
        }
        let key = original.identity()?;
        self.copies.get(&key).map(|(_, copy)| copy.clone())
    }

    /// Record `copy` as the copy of `original`. No-op for value types.
    pub fn record_copy(&mut self, original: &Value, copy: Value) {
        if let Some(key) = original.identity() {
            self.copies.insert(key, (original.clone(), copy));
        }
    }

    /// Copy any value, dispatching on its runtime type.
    pub fn deep_copy(&mut self, value: &Value) -> Result<Value, CopyError> {
        let Some(ty) = value.runtime_type() else {
            return Ok(Value::Null);
        };
        let copier = self.registry.require(ty)?;
        copier.deep_copy(value, self)
    }

    /// Forget every recorded copy.
    pub fn reset(&mut self) {
        self.copies.clear();
    }

    /// Number of recorded copies.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}
