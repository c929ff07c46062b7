//! Under-construction placeholders for the copier cache.
//!
//! Before a copier is constructed, the registry parks a [`PendingSlot`] in
//! its cache under the target type. What a later request for that type gets
//! depends on who asks:
//!
//! - the constructing thread (a `Node` with a `Node` field) receives a
//!   [`DeferredCopier`] that forwards to the finished copier;
//! - another thread that is not itself constructing blocks until the slot
//!   settles and sees the same outcome as the builder;
//! - another thread in the middle of its own construction receives a
//!   [`DeferredCopier`], since waiting there could deadlock on a mutual
//!   dependency.
//!
//! # Ownership
//!
//! The slot holds only a weak reference to the finished copier. The cache
//! owns the copier; the copier may own deferred copiers pointing back at its
//! own slot. A strong reference here would form a cycle that outlives the
//! registry.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use replica_types::{Ty, Value};

use crate::{BaseCopier, CopyContext, CopyError, DeepCopier};

/// Copier cache entry.
pub(crate) enum CacheEntry {
    Ready(Arc<dyn DeepCopier>),
    Pending(Arc<PendingSlot>),
}

enum SlotState {
    Pending,
    Ready(Weak<dyn DeepCopier>),
    /// No strategy applies; nothing was built.
    NotFound,
    Failed(CopyError),
    /// Built, then discarded because a construction it depends on failed.
    Abandoned,
}

/// How a construction on another thread settled.
pub(crate) enum Settled {
    Ready(Arc<dyn DeepCopier>),
    NotFound,
    Failed(CopyError),
    /// The entry is gone; resolve again.
    Retry,
    /// The calling thread owns the slot and it is still pending.
    OwnConstruction,
}

/// A copier that is still being constructed.
pub struct PendingSlot {
    ty: Ty,
    ty_name: String,
    owner: ThreadId,
    state: Mutex<SlotState>,
    settled: Condvar,
}

impl PendingSlot {
    /// Claim construction of `ty` for the calling thread.
    pub fn new(ty: Ty, ty_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            ty,
            ty_name: ty_name.into(),
            owner: thread::current().id(),
            state: Mutex::new(SlotState::Pending),
            settled: Condvar::new(),
        })
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        self.ty
    }

    /// Whether the calling thread is the one constructing this copier.
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.owner == thread::current().id()
    }

    /// Publish the finished copier and wake waiters.
    pub fn fulfill(&self, copier: &Arc<dyn DeepCopier>) {
        self.settle(SlotState::Ready(Arc::downgrade(copier)));
    }

    /// Report that no strategy applies to the type.
    pub fn not_found(&self) {
        self.settle(SlotState::NotFound);
    }

    /// Report that construction failed with `err`.
    pub fn fail(&self, err: CopyError) {
        self.settle(SlotState::Failed(err));
    }

    /// Discard a built copier whose dependencies did not survive.
    pub fn abandon(&self) {
        self.settle(SlotState::Abandoned);
    }

    fn settle(&self, state: SlotState) {
        *self.state.lock() = state;
        self.settled.notify_all();
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Pending)
    }

    /// The finished copier, if construction already completed.
    pub fn peek(&self) -> Option<Arc<dyn DeepCopier>> {
        match &*self.state.lock() {
            SlotState::Ready(copier) => copier.upgrade(),
            _ => None,
        }
    }

    /// Block until construction settles. Never blocks the owning thread.
    pub(crate) fn outcome(&self) -> Settled {
        let mut state = self.state.lock();
        loop {
            let settled = match &*state {
                SlotState::Pending => None,
                SlotState::Ready(copier) => {
                    Some(copier.upgrade().map_or(Settled::Retry, Settled::Ready))
                }
                SlotState::NotFound => Some(Settled::NotFound),
                SlotState::Failed(err) => Some(Settled::Failed(err.clone())),
                SlotState::Abandoned => Some(Settled::Retry),
            };
            if let Some(settled) = settled {
                return settled;
            }
            if self.owner == thread::current().id() {
                return Settled::OwnConstruction;
            }
            self.settled.wait(&mut state);
        }
    }

    /// Block until construction settles and return the finished copier.
    ///
    /// The constructing thread cannot wait on its own slot; it gets
    /// `ConstructionFailed` instead of a deadlock.
    pub fn wait(&self) -> Result<Arc<dyn DeepCopier>, CopyError> {
        match self.outcome() {
            Settled::Ready(copier) => Ok(copier),
            Settled::NotFound => Err(self.failed("no copier applies to this type")),
            Settled::Failed(err) => Err(self.failed(err.to_string())),
            Settled::Retry => Err(self.failed("copier was discarded")),
            Settled::OwnConstruction => {
                Err(self.failed("copier was used during its own construction"))
            }
        }
    }

    fn failed(&self, reason: impl Into<String>) -> CopyError {
        CopyError::ConstructionFailed {
            ty: self.ty_name.clone(),
            reason: reason.into(),
        }
    }
}

/// Stand-in handed out while the real copier for a type is under
/// construction. Every call forwards to the finished copier.
pub struct DeferredCopier {
    slot: Arc<PendingSlot>,
}

impl DeferredCopier {
    pub fn new(slot: Arc<PendingSlot>) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &Arc<PendingSlot> {
        &self.slot
    }
}

impl DeepCopier for DeferredCopier {
    fn deep_copy(&self, input: &Value, ctx: &mut CopyContext) -> Result<Value, CopyError> {
        self.slot.wait()?.deep_copy(input, ctx)
    }

    fn is_shallow(&self) -> bool {
        self.slot.peek().is_some_and(|copier| copier.is_shallow())
    }

    fn into_base(self: Arc<Self>) -> Option<Arc<dyn BaseCopier>> {
        self.slot.peek()?.into_base()
    }

    fn strategy_name(&self) -> &'static str {
        "deferred"
    }
}
