//! A single directory as a backing source.
//!
//! Watching is done elsewhere. Whatever watches the directory forwards its
//! notifications through a `SourceNotifier`, which stats the path and turns
//! it into a `SourceEvent`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::event::{Source, SourceEvent, SourceId, Subscribers};
use crate::error::{ListingError, Result};
use crate::types::{file_name_lossy, FileEntry, FileType};

pub struct DirectorySource {
    id: SourceId,
    root: PathBuf,
    name: String,
    subscribers: Arc<Subscribers<FileEntry>>,
    errors: AtomicUsize,
}

impl std::fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySource")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl DirectorySource {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|error| {
            ListingError::InvalidInput(format!(
                "unable to access directory {}: {error}",
                root.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(ListingError::InvalidInput(format!(
                "path is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            id: SourceId::next(),
            name: file_name_lossy(&root),
            root,
            subscribers: Arc::new(Subscribers::default()),
            errors: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries skipped by snapshots because they could not be read.
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Handle for the external watch code. Can be moved to another thread.
    pub fn notifier(&self) -> SourceNotifier {
        SourceNotifier {
            root: self.root.clone(),
            subscribers: self.subscribers.clone(),
        }
    }
}

impl Source<FileEntry> for DirectorySource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Vec<Arc<FileEntry>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(iter) => iter,
            Err(error) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "listing directory snapshot failed root={} error={error}",
                    self.root.display()
                );
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        let mut errors = 0usize;
        for child in read_dir {
            let child = match child {
                Ok(child) => child,
                Err(_) => {
                    errors += 1;
                    continue;
                }
            };
            let path = child.path();
            match fs::symlink_metadata(&path) {
                Ok(metadata) => {
                    let identity = child.file_name().to_string_lossy().to_string();
                    records.push(Arc::new(FileEntry::from_metadata(&path, identity, &metadata)));
                }
                Err(_) => errors += 1,
            }
        }

        if errors > 0 {
            self.errors.fetch_add(errors, Ordering::Relaxed);
        }
        log::debug!(
            "listing directory snapshot root={} entries={} errors={errors}",
            self.root.display(),
            records.len()
        );
        records
    }

    fn subscribe(&self) -> Receiver<SourceEvent<FileEntry>> {
        self.subscribers.subscribe()
    }
}

/// Forwards pre-formed change notifications for one directory.
#[derive(Clone)]
pub struct SourceNotifier {
    root: PathBuf,
    subscribers: Arc<Subscribers<FileEntry>>,
}

impl SourceNotifier {
    pub fn created(&self, path: &Path) -> Result<()> {
        if let Some(entry) = self.stat_child(path)? {
            self.subscribers
                .broadcast(SourceEvent::Created(Arc::new(entry)));
        }
        Ok(())
    }

    pub fn changed(&self, path: &Path) -> Result<()> {
        if let Some(entry) = self.stat_child(path)? {
            self.subscribers
                .broadcast(SourceEvent::Changed(Arc::new(entry)));
        }
        Ok(())
    }

    /// The path no longer exists, so the event carries identity only.
    pub fn deleted(&self, path: &Path) {
        if !self.is_child(path) {
            return;
        }
        let name = file_name_lossy(path);
        let entry = FileEntry {
            path: path.to_path_buf(),
            identity: name.clone(),
            name,
            file_type: FileType::Other,
            size: 0,
            modified_at: 0,
            permissions: None,
            owner: None,
            description: None,
        };
        self.subscribers
            .broadcast(SourceEvent::Deleted(Some(Arc::new(entry))));
    }

    /// The directory itself went away.
    pub fn destroyed(&self) {
        log::info!("listing directory destroyed root={}", self.root.display());
        self.subscribers.broadcast(SourceEvent::Deleted(None));
    }

    fn is_child(&self, path: &Path) -> bool {
        let in_scope = path.parent() == Some(self.root.as_path());
        if !in_scope {
            log::debug!(
                "listing notification ignored root={} path={}",
                self.root.display(),
                path.display()
            );
        }
        in_scope
    }

    fn stat_child(&self, path: &Path) -> Result<Option<FileEntry>> {
        if !self.is_child(path) {
            return Ok(None);
        }
        FileEntry::from_path(path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn snapshot_lists_direct_children() {
        let temp = TempDir::new().unwrap();
        File::create(temp.path().join("a.txt")).unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        File::create(temp.path().join("sub/nested.txt")).unwrap();

        let source = DirectorySource::open(temp.path()).unwrap();
        let mut names: Vec<_> = source
            .snapshot()
            .iter()
            .map(|entry| entry.identity.clone())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);
        assert_eq!(source.errors(), 0);
    }

    #[test]
    fn open_rejects_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain");
        File::create(&path).unwrap();
        assert!(matches!(
            DirectorySource::open(&path),
            Err(ListingError::InvalidInput(_))
        ));
    }

    #[test]
    fn notifier_forwards_child_events_only() {
        let temp = TempDir::new().unwrap();
        let source = DirectorySource::open(temp.path()).unwrap();
        let events = source.subscribe();
        let notifier = source.notifier();

        let path = temp.path().join("new.txt");
        File::create(&path).unwrap();
        notifier.created(&path).unwrap();
        notifier.changed(&path).unwrap();
        notifier.deleted(&path);
        notifier.deleted(Path::new("/elsewhere/file"));
        notifier.destroyed();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(received.len(), 4);
        assert!(matches!(&received[0], SourceEvent::Created(entry) if entry.identity == "new.txt"));
        assert!(matches!(&received[1], SourceEvent::Changed(_)));
        assert!(matches!(&received[2], SourceEvent::Deleted(Some(entry)) if entry.identity == "new.txt"));
        assert!(matches!(&received[3], SourceEvent::Deleted(None)));
    }

    #[test]
    fn created_for_missing_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let source = DirectorySource::open(temp.path()).unwrap();
        let result = source.notifier().created(&temp.path().join("gone"));
        assert!(matches!(result, Err(ListingError::Io(_))));
    }
}
