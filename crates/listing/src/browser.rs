//! Directory browsing flow.
//!
//! `open` scans a folder on a worker thread. The finished scan is installed
//! as a detached collection on the owning thread, unless it was cancelled
//! or superseded by a newer `open`.

use std::cell::{Ref, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use crate::config::{ListingConfig, TaskOptions};
use crate::error::Result;
use crate::model::{SortConfig, SortedCollection};
use crate::scan::{start_directory_scan, ScanOptions, ScanResult};
use crate::task::{Finished, MainContext, Task};
use crate::types::FileEntry;

#[cfg(test)]
mod tests;

struct BrowserState {
    path: Option<PathBuf>,
    loading_path: Option<PathBuf>,
    collection: Option<SortedCollection<FileEntry>>,
    task: Option<Task<ScanResult>>,
    sort: SortConfig,
    show_hidden: bool,
    scan_options: ScanOptions,
    task_options: TaskOptions,
}

pub struct FolderBrowser {
    context: MainContext,
    state: Rc<RefCell<BrowserState>>,
}

impl std::fmt::Debug for FolderBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FolderBrowser")
            .field("path", &state.path)
            .field("loading", &state.loading_path)
            .field("rows", &state.collection.as_ref().map(|c| c.len()))
            .finish()
    }
}

impl FolderBrowser {
    pub fn new(context: &MainContext, config: &ListingConfig) -> Self {
        Self {
            context: context.clone(),
            state: Rc::new(RefCell::new(BrowserState {
                path: None,
                loading_path: None,
                collection: None,
                task: None,
                sort: config.sort,
                show_hidden: config.show_hidden,
                scan_options: ScanOptions::default(),
                task_options: config.task.clone(),
            })),
        }
    }

    pub fn context(&self) -> &MainContext {
        &self.context
    }

    /// Starts loading `path`. Any scan still in flight is disposed and will
    /// never be delivered.
    pub fn open(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let mut state = self.state.borrow_mut();
        if let Some(mut previous) = state.task.take() {
            let _ = previous.dispose();
            log::debug!(
                "listing browser superseded scan path={}",
                state
                    .loading_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
        state.loading_path = None;

        let weak = Rc::downgrade(&self.state);
        let loaded_path = path.clone();
        let task = start_directory_scan(
            &self.context,
            path.clone(),
            state.scan_options.clone(),
            state.task_options.clone(),
            move |finished| install_scan(&weak, loaded_path, finished),
        )?;

        log::info!("listing browser opening path={}", path.display());
        state.loading_path = Some(path);
        state.task = Some(task);
        Ok(())
    }

    /// Asks the in-flight scan to stop. Returns whether one was running.
    pub fn cancel(&self) -> Result<bool> {
        let state = self.state.borrow();
        match &state.task {
            Some(task) => {
                task.request_cancel()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().task.is_some()
    }

    /// Folder shown by the current collection.
    pub fn path(&self) -> Option<PathBuf> {
        self.state.borrow().path.clone()
    }

    /// Folder being scanned, if any.
    pub fn loading_path(&self) -> Option<PathBuf> {
        self.state.borrow().loading_path.clone()
    }

    pub fn collection(&self) -> Option<Ref<'_, SortedCollection<FileEntry>>> {
        Ref::filter_map(self.state.borrow(), |state| state.collection.as_ref()).ok()
    }

    /// Runs `f` with mutable access to the current collection, e.g. to
    /// subscribe a view. Observers must not call back into the browser.
    pub fn with_collection_mut<T>(
        &self,
        f: impl FnOnce(&mut SortedCollection<FileEntry>) -> T,
    ) -> Option<T> {
        self.state.borrow_mut().collection.as_mut().map(f)
    }

    pub fn sort(&self) -> SortConfig {
        self.state.borrow().sort
    }

    /// Changes the order of the current collection and of later loads.
    pub fn set_sort(&self, sort: SortConfig) {
        let mut state = self.state.borrow_mut();
        state.sort = sort;
        if let Some(collection) = state.collection.as_mut() {
            collection.set_comparator(sort);
        }
    }

    pub fn set_show_hidden(&self, show_hidden: bool) {
        let mut state = self.state.borrow_mut();
        state.show_hidden = show_hidden;
        if let Some(collection) = state.collection.as_mut() {
            collection.set_show_hidden(show_hidden);
        }
    }

    /// Drops the current collection and any scan in flight.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.task = None;
        state.loading_path = None;
        state.collection = None;
        state.path = None;
    }
}

fn install_scan(state: &Weak<RefCell<BrowserState>>, path: PathBuf, finished: Finished<ScanResult>) {
    let Some(shared) = state.upgrade() else {
        return;
    };
    let mut state = shared.borrow_mut();
    state.task = None;
    state.loading_path = None;

    if finished.was_cancelled {
        log::info!("listing browser scan cancelled path={}", path.display());
        return;
    }

    let records = finished.result.unwrap_or_default();
    let collection = SortedCollection::from_records(records, state.sort, state.show_hidden);
    log::info!(
        "listing browser loaded path={} rows={}",
        path.display(),
        collection.len()
    );
    state.collection = Some(collection);
    state.path = Some(path);
}
