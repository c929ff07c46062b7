//! Constructions in progress, tracked per thread.
//!
//! Building one copier can resolve others, so each thread keeps a stack of
//! frames, outermost first. A copier that captured the placeholder of an
//! enclosing frame is only correct if that enclosing construction succeeds,
//! so it is parked in that frame instead of being published. The frame
//! publishes its parked copiers when it succeeds and abandons them when it
//! fails.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::guard::PendingSlot;
use crate::DeepCopier;

/// A finished copier waiting on an enclosing construction.
pub(super) struct Parked {
    pub slot: Arc<PendingSlot>,
    pub copier: Arc<dyn DeepCopier>,
}

pub(super) struct Frame {
    pub slot: Arc<PendingSlot>,
    /// Lowest frame index whose placeholder this construction captured,
    /// directly or through a parked copier.
    pub depends_on: usize,
    pub parked: Vec<Parked>,
}

#[derive(Default)]
pub(super) struct Constructions {
    stacks: Mutex<FxHashMap<ThreadId, Vec<Frame>>>,
}

impl Constructions {
    /// Whether the calling thread is building a copier.
    pub fn is_constructing(&self) -> bool {
        self.stacks
            .lock()
            .get(&thread::current().id())
            .is_some_and(|stack| !stack.is_empty())
    }

    /// Open a frame for `slot`.
    pub fn enter(&self, slot: Arc<PendingSlot>) {
        let mut stacks = self.stacks.lock();
        let stack = stacks.entry(thread::current().id()).or_default();
        stack.push(Frame {
            slot,
            depends_on: usize::MAX,
            parked: Vec::new(),
        });
    }

    /// Close the innermost frame.
    pub fn leave(&self) -> Option<(usize, Frame)> {
        let id = thread::current().id();
        let mut stacks = self.stacks.lock();
        let stack = stacks.get_mut(&id)?;
        let frame = stack.pop()?;
        let index = stack.len();
        if stack.is_empty() {
            stacks.remove(&id);
        }
        Some((index, frame))
    }

    /// The innermost construction captured the placeholder in `slot`.
    ///
    /// The slot belongs to a frame on this thread, either as the frame's own
    /// placeholder or as one of its parked copiers.
    pub fn capture(&self, slot: &Arc<PendingSlot>) {
        let mut stacks = self.stacks.lock();
        let Some(stack) = stacks.get_mut(&thread::current().id()) else {
            return;
        };
        let owner = stack.iter().position(|frame| {
            Arc::ptr_eq(&frame.slot, slot)
                || frame.parked.iter().any(|p| Arc::ptr_eq(&p.slot, slot))
        });
        if let (Some(owner), Some(top)) = (owner, stack.last_mut()) {
            top.depends_on = top.depends_on.min(owner);
        }
    }

    /// Park `copiers` in frame `index` and make the innermost frame depend
    /// on it.
    pub fn park(&self, index: usize, copiers: Vec<Parked>) {
        let mut stacks = self.stacks.lock();
        let Some(stack) = stacks.get_mut(&thread::current().id()) else {
            return;
        };
        if let Some(frame) = stack.get_mut(index) {
            frame.parked.extend(copiers);
        }
        if let Some(top) = stack.last_mut() {
            top.depends_on = top.depends_on.min(index);
        }
    }
}
