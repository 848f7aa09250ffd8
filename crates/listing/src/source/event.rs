//! Backing source interface.
//!
//! Sources push notifications through crossbeam channels instead of calling
//! into a collection. The collection is the sole consumer of its receiver
//! and applies the events on its own thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A notification from a backing source.
pub enum SourceEvent<R> {
    Created(Arc<R>),
    Changed(Arc<R>),
    /// `None` means the source itself was destroyed.
    Deleted(Option<Arc<R>>),
}

impl<R> Clone for SourceEvent<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Created(record) => Self::Created(record.clone()),
            Self::Changed(record) => Self::Changed(record.clone()),
            Self::Deleted(record) => Self::Deleted(record.clone()),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for SourceEvent<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(record) => f.debug_tuple("Created").field(record).finish(),
            Self::Changed(record) => f.debug_tuple("Changed").field(record).finish(),
            Self::Deleted(record) => f.debug_tuple("Deleted").field(record).finish(),
        }
    }
}

/// Authoritative store a collection mirrors.
pub trait Source<R>: Send + Sync {
    fn id(&self) -> SourceId;

    /// Display name of the source (e.g. the directory name).
    fn name(&self) -> &str;

    /// Current contents.
    fn snapshot(&self) -> Vec<Arc<R>>;

    /// New receiver for every event emitted from now on.
    fn subscribe(&self) -> Receiver<SourceEvent<R>>;
}

/// Fan-out of source events to every live subscriber.
pub struct Subscribers<R> {
    senders: Mutex<Vec<Sender<SourceEvent<R>>>>,
}

impl<R> Default for Subscribers<R> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<R> Subscribers<R> {
    pub fn subscribe(&self) -> Receiver<SourceEvent<R>> {
        let (sender, receiver) = unbounded();
        self.senders.lock().push(sender);
        receiver
    }

    /// Sends `event` to every subscriber, dropping the ones whose receiver is gone.
    ///
    /// Returns the number of subscribers reached.
    pub fn broadcast(&self, event: SourceEvent<R>) -> usize {
        let mut senders = self.senders.lock();
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        senders.len()
    }

    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
