//! Worker-side capability for a running task.
//!
//! The worker thread only ever touches the shared state block through a
//! `TaskScope`, and every access goes through the task's own lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

pub(super) type Work<T> = Box<dyn FnOnce(&TaskScope<T>) + Send + 'static>;

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(super) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State shared between the owning thread and the worker, guarded by the task lock.
#[derive(Debug)]
pub(super) struct TaskState<T> {
    pub(super) cancel_requested: bool,
    pub(super) cancelled: bool,
    pub(super) finished: bool,
    pub(super) disposed: bool,
    /// A completion callback is registered, so the worker reports finishing.
    pub(super) notify: bool,
    pub(super) result: Option<T>,
}

impl<T> Default for TaskState<T> {
    fn default() -> Self {
        Self {
            cancel_requested: false,
            cancelled: false,
            finished: false,
            disposed: false,
            notify: false,
            result: None,
        }
    }
}

pub(super) struct TaskShared<T> {
    pub(super) state: Mutex<TaskState<T>>,
    /// Unit of work, taken by the worker when it starts. Stays here if the
    /// spawn fails so the task can be started again.
    pub(super) work: Mutex<Option<Work<T>>>,
}

impl<T> TaskShared<T> {
    pub(super) fn new(work: Option<Work<T>>) -> Self {
        Self {
            state: Mutex::new(TaskState::default()),
            work: Mutex::new(work),
        }
    }
}

/// Handed to the unit of work running on the worker thread.
pub struct TaskScope<T> {
    id: TaskId,
    shared: Arc<TaskShared<T>>,
}

impl<T> TaskScope<T> {
    pub(super) fn new(id: TaskId, shared: Arc<TaskShared<T>>) -> Self {
        Self { id, shared }
    }

    /// Creates a scope that is not attached to any task and is never cancelled.
    ///
    /// Lets job functions run synchronously on the calling thread.
    pub fn standalone() -> Self {
        Self::new(TaskId::next(), Arc::new(TaskShared::new(None)))
    }

    /// Creates a standalone scope whose cancellation flag is already set.
    #[cfg(test)]
    pub(crate) fn cancelled_for_tests() -> Self {
        let scope = Self::standalone();
        scope.shared.state.lock().cancel_requested = true;
        scope
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Reads the cancellation flag under the task lock.
    pub fn is_cancel_requested(&self) -> bool {
        self.shared.state.lock().cancel_requested
    }

    /// Safe point.
    ///
    /// Returns `Some(())` while the task may continue and `None` once
    /// cancellation was requested, so workers can bail out with `?`.
    #[inline]
    pub fn checkpoint(&self) -> Option<()> {
        if self.is_cancel_requested() {
            None
        } else {
            Some(())
        }
    }

    /// Acquires the task lock. Dropping the guard releases it.
    ///
    /// The lock is not reentrant: while the guard is alive, use its own
    /// `is_cancel_requested` and `set_result` instead of the scope methods,
    /// which would deadlock.
    pub fn critical_section(&self) -> CriticalSection<'_, T> {
        CriticalSection {
            guard: self.shared.state.lock(),
        }
    }

    /// Stores the result, replacing any earlier value.
    pub fn set_result(&self, value: T) {
        *self.critical_section().result_mut() = Some(value);
    }

    /// Consumes a standalone scope and returns whatever result was stored.
    pub fn into_result(self) -> Option<T> {
        self.shared.state.lock().result.take()
    }
}

/// Scoped hold on the task lock.
pub struct CriticalSection<'a, T> {
    guard: MutexGuard<'a, TaskState<T>>,
}

impl<T> CriticalSection<'_, T> {
    pub fn is_cancel_requested(&self) -> bool {
        self.guard.cancel_requested
    }

    pub fn result(&self) -> Option<&T> {
        self.guard.result.as_ref()
    }

    pub fn result_mut(&mut self) -> &mut Option<T> {
        &mut self.guard.result
    }

    /// Stores the result, replacing any earlier value.
    pub fn set_result(&mut self, value: T) {
        self.guard.result = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_scope_is_never_cancelled() {
        let scope = TaskScope::<u32>::standalone();
        assert!(!scope.is_cancel_requested());
        assert!(scope.checkpoint().is_some());
    }

    #[test]
    fn cancelled_scope_stops_at_checkpoint() {
        let scope = TaskScope::<u32>::cancelled_for_tests();
        assert!(scope.checkpoint().is_none());
        assert!(scope.critical_section().is_cancel_requested());
    }

    #[test]
    fn critical_section_mutates_result_slot() {
        let scope = TaskScope::<Vec<u32>>::standalone();
        {
            let mut section = scope.critical_section();
            section.result_mut().get_or_insert_with(Vec::new).push(1);
        }
        scope.critical_section().result_mut().as_mut().unwrap().push(2);
        assert_eq!(scope.into_result(), Some(vec![1, 2]));
    }

    #[test]
    fn result_can_be_set_while_holding_the_lock() {
        let scope = TaskScope::<u32>::standalone();
        {
            let mut section = scope.critical_section();
            if !section.is_cancel_requested() {
                section.set_result(5);
            }
            assert_eq!(section.result(), Some(&5));
        }
        assert!(scope.checkpoint().is_some());
        assert_eq!(scope.into_result(), Some(5));
    }

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
    }
}
