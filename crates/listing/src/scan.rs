//! Background directory scan.
//!
//! Produces the records for a detached collection. Every entry is a safe
//! point, and staged records are appended under the critical section so the
//! owner never observes a half-written batch.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TaskOptions;
use crate::error::{ListingError, Result};
use crate::task::{Finished, MainContext, Task, TaskScope};
use crate::types::{is_hidden_name, FileEntry};

pub type ScanResult = Vec<Arc<FileEntry>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Levels below the root to descend into when `recursive` is set.
    /// `None` means unlimited.
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: None,
            include_hidden: true,
        }
    }
}

/// Lists `root` and stages the records into the scope's result.
///
/// Returns the number of records staged, or `None` if cancelled. Entries
/// are identified by their path relative to `root`.
pub fn scan_directory(
    root: &Path,
    options: &ScanOptions,
    scope: &TaskScope<ScanResult>,
) -> Option<usize> {
    let mut pending: VecDeque<(PathBuf, usize)> = VecDeque::new();
    pending.push_back((root.to_path_buf(), 0));
    scope
        .critical_section()
        .result_mut()
        .get_or_insert_with(Vec::new);

    let mut staged = 0usize;
    let mut skipped = 0usize;
    while let Some((dir, depth)) = pending.pop_front() {
        scope.checkpoint()?;

        let read_dir = match fs::read_dir(&dir) {
            Ok(iter) => iter,
            Err(error) => {
                log::warn!(
                    "listing scan cannot read directory path={} error={error}",
                    dir.display()
                );
                skipped += 1;
                continue;
            }
        };

        let mut batch = Vec::new();
        for child in read_dir {
            scope.checkpoint()?;

            let Ok(child) = child else {
                skipped += 1;
                continue;
            };
            let name = child.file_name().to_string_lossy().into_owned();
            if !options.include_hidden && is_hidden_name(&name) {
                continue;
            }
            let path = child.path();
            let Ok(metadata) = fs::symlink_metadata(&path) else {
                skipped += 1;
                continue;
            };

            if options.recursive
                && metadata.is_dir()
                && options.max_depth.map_or(true, |max| depth < max)
            {
                pending.push_back((path.clone(), depth + 1));
            }

            let identity = path
                .strip_prefix(root)
                .map(|relative| relative.to_string_lossy().into_owned())
                .unwrap_or(name);
            batch.push(Arc::new(FileEntry::from_metadata(&path, identity, &metadata)));
        }

        let mut section = scope.critical_section();
        if section.is_cancel_requested() {
            return None;
        }
        staged += batch.len();
        section
            .result_mut()
            .get_or_insert_with(Vec::new)
            .extend(batch);
    }

    log::debug!(
        "listing scan complete root={} staged={staged} skipped={skipped}",
        root.display()
    );
    Some(staged)
}

/// Starts a scan of `root` on a worker thread.
///
/// `on_done` runs on the thread that owns `context`.
pub fn start_directory_scan<F>(
    context: &MainContext,
    root: impl Into<PathBuf>,
    options: ScanOptions,
    task_options: TaskOptions,
    on_done: F,
) -> Result<Task<ScanResult>>
where
    F: FnOnce(Finished<ScanResult>) + 'static,
{
    let root = root.into();
    if !root.is_dir() {
        return Err(ListingError::InvalidInput(format!(
            "path is not a directory: {}",
            root.display()
        )));
    }

    let mut task = Task::with_options(context, task_options, move |scope: &TaskScope<ScanResult>| {
        let _ = scan_directory(&root, &options, scope);
    });
    task.on_finished(on_done)?;
    task.start()?;
    Ok(task)
}
