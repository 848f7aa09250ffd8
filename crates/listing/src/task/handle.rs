//! Owner-side handle of a background task.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;

use super::context::MainContext;
use super::scope::{TaskId, TaskScope, TaskShared};
use crate::config::TaskOptions;
use crate::error::{invalid_task_state, ListingError, Result};

/// Outcome handed to the completion callback on the owning thread.
#[derive(Debug)]
pub struct Finished<T> {
    pub was_cancelled: bool,
    /// Always `None` for cancelled tasks; staged results are discarded.
    pub result: Option<T>,
}

/// Observable lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
    Finished { cancelled: bool },
    Disposed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Finished { cancelled: false } => "finished",
            Self::Finished { cancelled: true } => "cancelled",
            Self::Disposed => "disposed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Disposed,
}

type Callback<T> = Box<dyn FnOnce(Finished<T>)>;

/// A unit of work that runs on its own worker thread.
///
/// The handle is bound to the `MainContext` it was created with and cannot
/// leave the owning thread. Dropping it disposes the task.
pub struct Task<T: Send + 'static> {
    id: TaskId,
    context: MainContext,
    options: TaskOptions,
    shared: Arc<TaskShared<T>>,
    callback: Option<Callback<T>>,
    phase: Phase,
}

impl<T: Send + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<T: Send + 'static> Task<T> {
    /// Creates an idle task. Nothing runs until `start`.
    pub fn new<F>(context: &MainContext, work: F) -> Self
    where
        F: FnOnce(&TaskScope<T>) + Send + 'static,
    {
        Self::with_options(context, TaskOptions::default(), work)
    }

    pub fn with_options<F>(context: &MainContext, options: TaskOptions, work: F) -> Self
    where
        F: FnOnce(&TaskScope<T>) + Send + 'static,
    {
        Self {
            id: TaskId::next(),
            context: context.clone(),
            options,
            shared: Arc::new(TaskShared::new(Some(Box::new(work)))),
            callback: None,
            phase: Phase::Idle,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Registers the single completion callback. Only allowed before `start`.
    pub fn on_finished<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnOnce(Finished<T>) + 'static,
    {
        if self.phase != Phase::Idle {
            return Err(invalid_task_state(format!(
                "task {} is {}; completion callbacks must be registered before start",
                self.id,
                self.status().as_str()
            )));
        }
        if self.callback.is_some() {
            return Err(invalid_task_state(format!(
                "task {} already has a completion callback",
                self.id
            )));
        }
        self.callback = Some(Box::new(callback));
        Ok(())
    }

    /// Spawns the worker thread.
    ///
    /// On `ThreadSpawnFailure` the task stays idle and may be started again.
    pub fn start(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle => {}
            Phase::Started => {
                return Err(invalid_task_state(format!(
                    "task {} already started",
                    self.id
                )))
            }
            Phase::Disposed => {
                return Err(invalid_task_state(format!(
                    "task {} was disposed",
                    self.id
                )))
            }
        }

        let id = self.id;
        self.shared.state.lock().notify = self.callback.is_some();
        let shared = self.shared.clone();
        let completions = self.context.completion_sender();
        let mut builder = thread::Builder::new().name(format!("{}-{id}", self.options.thread_name));
        if let Some(stack_size) = self.options.stack_size {
            builder = builder.stack_size(stack_size);
        }

        builder
            .spawn(move || run_worker(id, shared, completions))
            .map_err(|error| {
                log::warn!("listing task spawn failed id={id} error={error}");
                ListingError::ThreadSpawnFailure(error)
            })?;

        if let Some(callback) = self.callback.take() {
            let shared = self.shared.clone();
            self.context.register(
                id,
                Box::new(move || {
                    let (was_cancelled, result) = {
                        let mut state = shared.state.lock();
                        (state.cancelled, state.result.take())
                    };
                    log::debug!("listing task delivered id={id} cancelled={was_cancelled}");
                    callback(Finished {
                        was_cancelled,
                        result: if was_cancelled { None } else { result },
                    });
                }),
            );
        }

        self.phase = Phase::Started;
        log::debug!("listing task started id={id}");
        Ok(())
    }

    /// Asks the worker to stop at its next safe point.
    ///
    /// Does not block. A no-op once the task has finished.
    pub fn request_cancel(&self) -> Result<()> {
        if self.phase == Phase::Disposed {
            return Err(invalid_task_state(format!(
                "cannot cancel disposed task {}",
                self.id
            )));
        }
        let mut state = self.shared.state.lock();
        if !state.finished {
            state.cancel_requested = true;
            log::debug!("listing task cancel requested id={}", self.id);
        }
        Ok(())
    }

    pub fn status(&self) -> TaskStatus {
        match self.phase {
            Phase::Idle => TaskStatus::Idle,
            Phase::Disposed => TaskStatus::Disposed,
            Phase::Started => {
                let state = self.shared.state.lock();
                if state.finished {
                    TaskStatus::Finished {
                        cancelled: state.cancelled,
                    }
                } else {
                    TaskStatus::Running
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status(), TaskStatus::Finished { .. })
    }

    /// Takes the result of a task that finished normally.
    ///
    /// Returns `None` while running, after cancellation, or when a
    /// completion callback already consumed it.
    pub fn take_result(&self) -> Option<T> {
        if self.phase != Phase::Started {
            return None;
        }
        let mut state = self.shared.state.lock();
        if state.finished && !state.cancelled {
            state.result.take()
        } else {
            None
        }
    }

    /// Releases the task.
    ///
    /// A running worker is asked to cancel; this waits only for an in-flight
    /// critical section to release. A completion that has not been delivered
    /// yet is dropped.
    pub fn dispose(&mut self) -> Result<()> {
        if self.phase == Phase::Disposed {
            return Err(invalid_task_state(format!(
                "task {} disposed twice",
                self.id
            )));
        }

        self.context.unregister(self.id);
        self.callback = None;
        {
            let mut state = self.shared.state.lock();
            if !state.finished {
                state.cancel_requested = true;
            }
            state.disposed = true;
        }
        self.phase = Phase::Disposed;
        log::debug!("listing task disposed id={}", self.id);
        Ok(())
    }
}

impl<T: Send + 'static> Drop for Task<T> {
    fn drop(&mut self) {
        if self.phase != Phase::Disposed {
            let _ = self.dispose();
        }
    }
}

fn run_worker<T>(id: TaskId, shared: Arc<TaskShared<T>>, completions: Sender<TaskId>) {
    let started = Instant::now();
    let work = shared.work.lock().take();
    let scope = TaskScope::new(id, shared.clone());

    let panicked = match work {
        Some(work) => match catch_unwind(AssertUnwindSafe(|| work(&scope))) {
            Ok(()) => false,
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "worker panicked".to_string()
                };
                log::error!("listing task panicked id={id} message={panic_msg}");
                true
            }
        },
        None => false,
    };

    let deliver = {
        let mut state = shared.state.lock();
        state.finished = true;
        state.cancelled = state.cancel_requested || panicked;
        if state.cancelled {
            state.result = None;
        }
        log::debug!(
            "listing task finished id={id} cancelled={} elapsed_ms={}",
            state.cancelled,
            started.elapsed().as_millis()
        );
        state.notify && !state.disposed
    };

    if deliver {
        let _ = completions.send(id);
    }
}
