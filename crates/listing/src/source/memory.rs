//! In-memory backing source.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::event::{Source, SourceEvent, SourceId, Subscribers};
use crate::types::Entry;

/// A source whose contents are pushed by the caller, e.g. an application
/// list refreshed from a background scan.
pub struct MemorySource<R> {
    id: SourceId,
    name: String,
    records: Mutex<Vec<Arc<R>>>,
    subscribers: Subscribers<R>,
}

impl<R: Entry> MemorySource<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_records(name, Vec::new())
    }

    pub fn with_records(name: impl Into<String>, records: Vec<Arc<R>>) -> Self {
        Self {
            id: SourceId::next(),
            name: name.into(),
            records: Mutex::new(records),
            subscribers: Subscribers::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds or replaces the record with the same identity and announces it.
    pub fn emit_created(&self, record: Arc<R>) {
        self.upsert(record.clone());
        self.subscribers.broadcast(SourceEvent::Created(record));
    }

    pub fn emit_changed(&self, record: Arc<R>) {
        self.upsert(record.clone());
        self.subscribers.broadcast(SourceEvent::Changed(record));
    }

    pub fn emit_deleted(&self, record: Arc<R>) {
        self.records
            .lock()
            .retain(|existing| existing.identity() != record.identity());
        self.subscribers
            .broadcast(SourceEvent::Deleted(Some(record)));
    }

    /// Empties the source and tells subscribers it is gone.
    pub fn emit_destroyed(&self) {
        self.records.lock().clear();
        self.subscribers.broadcast(SourceEvent::Deleted(None));
    }

    fn upsert(&self, record: Arc<R>) {
        let mut records = self.records.lock();
        match records
            .iter_mut()
            .find(|existing| existing.identity() == record.identity())
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }
}

impl<R: Entry> Source<R> for MemorySource<R> {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn snapshot(&self) -> Vec<Arc<R>> {
        self.records.lock().clone()
    }

    fn subscribe(&self) -> Receiver<SourceEvent<R>> {
        self.subscribers.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{file, shared};

    #[test]
    fn emit_updates_snapshot_and_subscribers() {
        let source = MemorySource::new("apps");
        let events = source.subscribe();

        source.emit_created(shared(file("a", 1)));
        source.emit_changed(shared(file("a", 2)));
        source.emit_created(shared(file("b", 3)));
        source.emit_deleted(shared(file("b", 0)));

        let snapshot = source.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].size, 2);
        assert_eq!(events.try_iter().count(), 4);
    }

    #[test]
    fn destroyed_clears_records() {
        let source = MemorySource::with_records("apps", vec![shared(file("a", 1))]);
        let events = source.subscribe();
        source.emit_destroyed();

        assert!(source.is_empty());
        assert!(matches!(events.try_recv(), Ok(SourceEvent::Deleted(None))));
    }
}
