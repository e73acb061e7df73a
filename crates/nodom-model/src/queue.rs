//! Dirty Queue
//!
//! FIFO of owners whose models changed since the last flush.
//! Deduplicated by owner; an owner that is currently rendering is guarded
//! and cannot enqueue itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::OwnerId;

/// Shared handle to the dirty queue
#[derive(Debug, Clone, Default)]
pub struct DirtyQueue {
    inner: Rc<RefCell<QueueState>>,
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<OwnerId>,
    guarded: Vec<OwnerId>,
}

impl DirtyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag an owner dirty. Returns false if it was already queued or guarded.
    pub fn mark(&self, owner: OwnerId) -> bool {
        let mut state = self.inner.borrow_mut();
        if state.guarded.contains(&owner) || state.queue.contains(&owner) {
            return false;
        }
        tracing::trace!("Owner {} marked dirty", owner);
        state.queue.push_back(owner);
        true
    }

    /// Take every queued owner in FIFO order
    pub fn drain(&self) -> Vec<OwnerId> {
        self.inner.borrow_mut().queue.drain(..).collect()
    }

    /// Drop an owner from the queue (destroyed modules)
    pub fn remove(&self, owner: OwnerId) {
        self.inner.borrow_mut().queue.retain(|o| *o != owner);
    }

    pub fn contains(&self, owner: OwnerId) -> bool {
        self.inner.borrow().queue.contains(&owner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().queue.is_empty()
    }

    /// Prevent an owner from enqueueing itself while it renders
    pub fn guard(&self, owner: OwnerId) {
        let mut state = self.inner.borrow_mut();
        if !state.guarded.contains(&owner) {
            state.guarded.push(owner);
        }
    }

    pub fn unguard(&self, owner: OwnerId) {
        self.inner.borrow_mut().guarded.retain(|o| *o != owner);
    }

    pub fn is_guarded(&self, owner: OwnerId) -> bool {
        self.inner.borrow().guarded.contains(&owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_and_dedup() {
        let queue = DirtyQueue::new();
        assert!(queue.mark(OwnerId(2)));
        assert!(queue.mark(OwnerId(1)));
        assert!(!queue.mark(OwnerId(2)));

        assert_eq!(queue.drain(), vec![OwnerId(2), OwnerId(1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_guarded_owner_is_skipped() {
        let queue = DirtyQueue::new();
        queue.guard(OwnerId(7));
        assert!(!queue.mark(OwnerId(7)));
        queue.unguard(OwnerId(7));
        assert!(queue.mark(OwnerId(7)));
    }

    #[test]
    fn test_clones_share_state() {
        let queue = DirtyQueue::new();
        let other = queue.clone();
        other.mark(OwnerId(3));
        assert!(queue.contains(OwnerId(3)));
        queue.remove(OwnerId(3));
        assert!(other.is_empty());
    }
}
