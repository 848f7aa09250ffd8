//! Sorted folder listings fed by cancelable background tasks.
//!
//! This crate provides:
//! - One-thread-per-task background jobs with cooperative cancellation and
//!   a single completion delivered on the owning thread
//! - An observable collection that mirrors a backing source in sorted order
//! - Directory and application sources, scans, and a folder browsing flow

pub mod apps;
pub mod browser;
pub mod config;
pub mod error;
pub mod model;
pub mod scan;
pub mod source;
pub mod task;
pub mod types;

// Re-export main types
pub use apps::{AppEntry, application_dirs, enumerate_applications, start_application_scan};
pub use browser::FolderBrowser;
pub use config::{ListingConfig, TaskOptions};
pub use error::{ListingError, Result};
pub use model::{
    CellValue, Column, ModelEvent, ModelObserver, ModelState, Permutation, RowHandle, SortConfig,
    SortDirection, SortKey, SortedCollection,
};
pub use scan::{scan_directory, start_directory_scan, ScanOptions};
pub use source::{DirectorySource, MemorySource, Source, SourceEvent, SourceNotifier};
pub use task::{Finished, MainContext, Task, TaskScope, TaskStatus};
pub use types::{Entry, FileEntry, FileType};

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
