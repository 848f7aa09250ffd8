//! Cancelable background tasks.
//!
//! One OS thread per task, no pooling:
//! - `Task` is the owner-side handle (create, start, cancel, dispose)
//! - `TaskScope` is what the worker sees (safe points, critical section, result slot)
//! - `MainContext` delivers the single "finished" notification on the owning thread
//!
//! Cancellation is cooperative. Workers call `TaskScope::checkpoint` before
//! each unit of externally observable work and return early once it yields
//! `None`.

mod context;
mod handle;
mod scope;

pub use context::MainContext;
pub use handle::{Finished, Task, TaskStatus};
pub use scope::{CriticalSection, TaskId, TaskScope};
