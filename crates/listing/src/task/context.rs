//! Owning-thread execution context for task completions.
//!
//! Worker threads never call back into owner code directly. When a worker
//! finishes it sends its `TaskId` through a crossbeam channel; the owning
//! thread drains that channel with `dispatch_pending` / `dispatch_timeout`
//! and runs the registered completion callback there.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use fnv::FnvHashMap;

use super::scope::TaskId;

type Delivery = Box<dyn FnOnce()>;

struct ContextInner {
    sender: Sender<TaskId>,
    receiver: Receiver<TaskId>,
    pending: RefCell<FnvHashMap<TaskId, Delivery>>,
}

/// Completion dispatcher bound to the thread that created it.
///
/// Cloning is cheap and every clone shares the same queue. The type is not
/// `Send`, so deliveries can only ever run on the owning thread.
#[derive(Clone)]
pub struct MainContext {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for MainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainContext")
            .field("pending", &self.pending_tasks())
            .field("queued", &self.inner.receiver.len())
            .finish()
    }
}

impl Default for MainContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MainContext {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            inner: Rc::new(ContextInner {
                sender,
                receiver,
                pending: RefCell::new(FnvHashMap::default()),
            }),
        }
    }

    pub(super) fn completion_sender(&self) -> Sender<TaskId> {
        self.inner.sender.clone()
    }

    pub(super) fn register(&self, id: TaskId, delivery: Delivery) {
        self.inner.pending.borrow_mut().insert(id, delivery);
    }

    /// Drops a not-yet-delivered completion. Returns whether one was pending.
    pub(super) fn unregister(&self, id: TaskId) -> bool {
        self.inner.pending.borrow_mut().remove(&id).is_some()
    }

    /// Completion messages received but not dispatched yet.
    #[cfg(test)]
    pub(super) fn queued_completions(&self) -> usize {
        self.inner.receiver.len()
    }

    /// Number of started tasks whose completion callback has not run yet.
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Runs every queued completion without blocking.
    ///
    /// Returns the number of callbacks that ran.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        while let Ok(id) = self.inner.receiver.try_recv() {
            if self.deliver(id) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Blocks until at least one completion callback runs or `timeout`
    /// elapses, then drains whatever else is queued.
    pub fn dispatch_timeout(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inner.receiver.recv_timeout(remaining) {
                Ok(id) => {
                    if self.deliver(id) {
                        return 1 + self.dispatch_pending();
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return 0,
            }
        }
    }

    fn deliver(&self, id: TaskId) -> bool {
        // The borrow ends before the callback runs; callbacks may start new tasks.
        let delivery = self.inner.pending.borrow_mut().remove(&id);
        match delivery {
            Some(delivery) => {
                delivery();
                true
            }
            None => {
                log::debug!("listing task completion dropped id={id} reason=disposed");
                false
            }
        }
    }
}
