//! Observable sorted collection.
//!
//! Confined to the thread that owns the bound views; no locking. The row
//! sequence is kept sorted under the current `SortConfig` across inserts
//! and removals. Attribute changes (`notify_changed`) do not move rows
//! until the next `resort`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use fnv::{FnvHashMap, FnvHashSet};

use super::column::{cell_value, CellValue, Column};
use super::compare::{compare_entries, SortConfig};
use super::event::{ModelEvent, ModelObserver, ObserverId, Permutation};
use super::handle::{fresh_stamp, next_stamp, RowHandle, RowKey};
use crate::error::{ListingError, Result};
use crate::source::{Source, SourceEvent, SourceId};
use crate::types::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unattached,
    /// Loading the source snapshot during `attach`.
    Populating,
    Live,
}

impl ModelState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unattached => "unattached",
            Self::Populating => "populating",
            Self::Live => "live",
        }
    }
}

struct Row<R> {
    key: RowKey,
    record: Arc<R>,
}

struct Attachment<R> {
    source: Arc<dyn Source<R>>,
    events: Receiver<SourceEvent<R>>,
}

type Observers<R> = Vec<(ObserverId, Box<dyn ModelObserver<R>>)>;

pub struct SortedCollection<R: Entry> {
    rows: Vec<Row<R>>,
    /// identity -> row key of every row in `rows`.
    identities: FnvHashMap<String, RowKey>,
    config: SortConfig,
    show_hidden: bool,
    stamp: u64,
    next_key: u64,
    state: ModelState,
    source: Option<Attachment<R>>,
    /// Hidden records of a detached collection, kept so they can be shown later.
    detached_hidden: Vec<Arc<R>>,
    observers: Observers<R>,
    next_observer: u64,
}

impl<R: Entry> fmt::Debug for SortedCollection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedCollection")
            .field("len", &self.rows.len())
            .field("state", &self.state)
            .field("config", &self.config)
            .field("show_hidden", &self.show_hidden)
            .field("source", &self.source_name())
            .finish()
    }
}

impl<R: Entry> SortedCollection<R> {
    /// Creates an empty, unattached collection.
    pub fn new(config: SortConfig) -> Self {
        Self {
            rows: Vec::new(),
            identities: FnvHashMap::default(),
            config,
            show_hidden: false,
            stamp: fresh_stamp(),
            next_key: 0,
            state: ModelState::Unattached,
            source: None,
            detached_hidden: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Builds a detached collection from records staged elsewhere.
    ///
    /// Duplicate identities keep the record that comes first in `records`.
    pub fn from_records(
        records: impl IntoIterator<Item = Arc<R>>,
        config: SortConfig,
        show_hidden: bool,
    ) -> Self {
        let mut collection = Self::new(config);
        collection.show_hidden = show_hidden;

        let mut seen = FnvHashSet::default();
        let mut accepted = Vec::new();
        for record in records {
            if !seen.insert(record.identity().to_string()) {
                continue;
            }
            if !show_hidden && record.is_hidden() {
                collection.detached_hidden.push(record);
            } else {
                accepted.push(record);
            }
        }
        accepted.sort_by(|a, b| compare_entries(a.as_ref(), b.as_ref(), &config));
        for record in accepted {
            collection.push_sorted(record);
        }
        collection.state = ModelState::Live;
        collection
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.source.as_ref().map(|attachment| attachment.source.id())
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source
            .as_ref()
            .map(|attachment| attachment.source.name())
    }

    /// Live but not bound to any source.
    pub fn is_detached(&self) -> bool {
        self.state == ModelState::Live && self.source.is_none()
    }

    /// Records in display order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<R>> + '_ {
        self.rows.iter().map(|row| &row.record)
    }

    pub fn get_at(&self, position: usize) -> Option<&Arc<R>> {
        self.rows.get(position).map(|row| &row.record)
    }

    pub fn subscribe<O>(&mut self, observer: O) -> ObserverId
    where
        O: ModelObserver<R> + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Binds the collection to `source` and loads its current snapshot.
    ///
    /// Attaching the source that is already attached does nothing. Any other
    /// content is released first, and every outstanding handle goes stale.
    pub fn attach(&mut self, source: Arc<dyn Source<R>>) {
        if self.source_id() == Some(source.id()) {
            return;
        }
        if self.source.is_some() || !self.rows.is_empty() || !self.detached_hidden.is_empty() {
            self.detach();
        } else {
            self.stamp = next_stamp(self.stamp);
        }

        self.state = ModelState::Populating;
        // Subscribe before the snapshot so nothing created in between is lost;
        // replayed creations are dropped by the identity check.
        let events = source.subscribe();
        let mut records: Vec<Arc<R>> = source
            .snapshot()
            .into_iter()
            .filter(|record| self.show_hidden || !record.is_hidden())
            .collect();
        records.sort_by(|a, b| compare_entries(a.as_ref(), b.as_ref(), &self.config));
        for record in records {
            if let Some(position) = self.push_sorted(record) {
                emit(
                    &mut self.observers,
                    &ModelEvent::RowInserted { position },
                    Some(&self.rows[position].record),
                );
            }
        }

        log::debug!(
            "listing collection attached source={} name={} rows={}",
            source.id(),
            source.name(),
            self.rows.len()
        );
        self.source = Some(Attachment { source, events });
        self.state = ModelState::Live;
    }

    /// Unbinds from the source and releases every record.
    pub fn detach(&mut self) {
        let removed = self.drain_rows();
        self.detached_hidden.clear();
        if let Some(attachment) = self.source.take() {
            log::debug!(
                "listing collection detached source={} removed={removed}",
                attachment.source.id()
            );
        }
        self.stamp = next_stamp(self.stamp);
        self.state = ModelState::Unattached;
    }

    /// Applies every queued source event in arrival order.
    ///
    /// Returns the number of events consumed.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let event = match &self.source {
                Some(attachment) => match attachment.events.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
                None => break,
            };
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: SourceEvent<R>) {
        match event {
            SourceEvent::Created(record) => {
                self.insert_on_create(record);
            }
            SourceEvent::Changed(record) => {
                self.notify_changed(record);
            }
            SourceEvent::Deleted(record) => {
                self.remove_on_delete(record.as_deref());
            }
        }
    }

    /// Inserts `record` at its sorted position.
    ///
    /// Returns the position, or `None` when the record is hidden-filtered or
    /// its identity is already present.
    pub fn insert_on_create(&mut self, record: Arc<R>) -> Option<usize> {
        if self.identities.contains_key(record.identity()) {
            return None;
        }
        if !self.show_hidden && record.is_hidden() {
            if self.source.is_none()
                && !self
                    .detached_hidden
                    .iter()
                    .any(|existing| existing.identity() == record.identity())
            {
                self.detached_hidden.push(record);
            }
            return None;
        }

        let position = self.rows.partition_point(|row| {
            compare_entries(row.record.as_ref(), record.as_ref(), &self.config) != Ordering::Greater
        });
        let key = self.alloc_key();
        self.identities.insert(record.identity().to_string(), key);
        self.rows.insert(position, Row { key, record });
        emit(
            &mut self.observers,
            &ModelEvent::RowInserted { position },
            Some(&self.rows[position].record),
        );
        Some(position)
    }

    /// Removes the record with the same identity, or everything when
    /// `record` is `None` (the source was destroyed).
    ///
    /// Returns the number of rows removed.
    pub fn remove_on_delete(&mut self, record: Option<&R>) -> usize {
        match record {
            Some(record) => {
                self.detached_hidden
                    .retain(|existing| existing.identity() != record.identity());
                usize::from(self.remove_identity(record.identity()).is_some())
            }
            None => {
                let removed = self.drain_rows();
                self.detached_hidden.clear();
                if let Some(attachment) = self.source.take() {
                    log::info!(
                        "listing source destroyed source={} name={} removed={removed}",
                        attachment.source.id(),
                        attachment.source.name()
                    );
                }
                self.stamp = next_stamp(self.stamp);
                self.state = ModelState::Unattached;
                removed
            }
        }
    }

    /// Replaces the stored record and reports the row as changed without
    /// moving it. Call `resort` if the change can affect the order.
    ///
    /// The hidden filter is re-applied: a row whose record became hidden is
    /// removed, and a filtered record that became visible is inserted.
    /// Returns the row position after the change, or `None` when the record
    /// is not shown.
    pub fn notify_changed(&mut self, record: Arc<R>) -> Option<usize> {
        let filtered = !self.show_hidden && record.is_hidden();
        let Some(&key) = self.identities.get(record.identity()) else {
            let retained = self
                .detached_hidden
                .iter()
                .position(|existing| existing.identity() == record.identity());
            if filtered {
                if let Some(index) = retained {
                    self.detached_hidden[index] = record;
                }
                return None;
            }
            // Detached collections only know the hidden records they retained.
            if self.source.is_none() && retained.is_none() {
                return None;
            }
            if let Some(index) = retained {
                self.detached_hidden.remove(index);
            }
            return self.insert_on_create(record);
        };

        if filtered {
            self.remove_identity(record.identity());
            if self.source.is_none() {
                self.detached_hidden.push(record);
            }
            return None;
        }

        let position = self.position_of_key(key)?;
        self.rows[position].record = record;
        emit(
            &mut self.observers,
            &ModelEvent::RowChanged { position },
            Some(&self.rows[position].record),
        );
        Some(position)
    }

    /// Switches to `config`, resorting when it differs from the current one.
    pub fn set_comparator(&mut self, config: SortConfig) -> bool {
        if config == self.config {
            return false;
        }
        self.config = config;
        self.resort();
        true
    }

    /// Stable full sort, reported as a single permutation.
    pub fn resort(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let config = self.config;
        let mut indexed: Vec<(usize, Row<R>)> = self.rows.drain(..).enumerate().collect();
        indexed.sort_by(|(_, a), (_, b)| compare_entries(a.record.as_ref(), b.record.as_ref(), &config));

        let mut old_to_new = vec![0; indexed.len()];
        for (new_position, (old_position, _)) in indexed.iter().enumerate() {
            old_to_new[*old_position] = new_position;
        }
        self.rows = indexed.into_iter().map(|(_, row)| row).collect();

        emit(
            &mut self.observers,
            &ModelEvent::RowsReordered(Permutation::new(old_to_new)),
            None,
        );
    }

    /// Changes the hidden-record policy and re-filters.
    ///
    /// Newly shown records come from the source snapshot, or from the hidden
    /// records retained by a detached collection.
    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        if self.show_hidden == show_hidden {
            return;
        }
        self.show_hidden = show_hidden;

        if show_hidden {
            let hidden: Vec<Arc<R>> = match &self.source {
                Some(attachment) => attachment
                    .source
                    .snapshot()
                    .into_iter()
                    .filter(|record| record.is_hidden())
                    .collect(),
                None => std::mem::take(&mut self.detached_hidden),
            };
            for record in hidden {
                self.insert_on_create(record);
            }
        } else {
            let hidden: Vec<String> = self
                .rows
                .iter()
                .filter(|row| row.record.is_hidden())
                .map(|row| row.record.identity().to_string())
                .collect();
            for identity in hidden {
                if let Some(record) = self.remove_identity(&identity) {
                    if self.source.is_none() {
                        self.detached_hidden.push(record);
                    }
                }
            }
        }
    }

    pub fn first(&self) -> Option<RowHandle> {
        self.rows.first().map(|row| self.handle(row.key))
    }

    pub fn nth(&self, position: usize) -> Option<RowHandle> {
        self.rows.get(position).map(|row| self.handle(row.key))
    }

    /// Handle of the row after `handle`, or `None` at the end.
    pub fn next(&self, handle: RowHandle) -> Result<Option<RowHandle>> {
        let position = self.position_of(handle)?;
        Ok(self.nth(position + 1))
    }

    pub fn position_of(&self, handle: RowHandle) -> Result<usize> {
        if handle.stamp != self.stamp {
            return Err(ListingError::StaleHandle);
        }
        self.position_of_key(handle.key)
            .ok_or(ListingError::StaleHandle)
    }

    pub fn get(&self, handle: RowHandle) -> Result<&Arc<R>> {
        let position = self.position_of(handle)?;
        Ok(&self.rows[position].record)
    }

    pub fn find(&self, identity: &str) -> Option<RowHandle> {
        self.identities.get(identity).map(|key| self.handle(*key))
    }

    pub fn find_record(&self, record: &R) -> Option<RowHandle> {
        self.find(record.identity())
    }

    pub fn value(&self, handle: RowHandle, column: Column) -> Result<CellValue<'_, R>> {
        Ok(cell_value(self.get(handle)?, column))
    }

    fn handle(&self, key: RowKey) -> RowHandle {
        RowHandle {
            stamp: self.stamp,
            key,
        }
    }

    fn alloc_key(&mut self) -> RowKey {
        let key = RowKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn position_of_key(&self, key: RowKey) -> Option<usize> {
        self.rows.iter().position(|row| row.key == key)
    }

    /// Appends a record known to sort after every existing row.
    fn push_sorted(&mut self, record: Arc<R>) -> Option<usize> {
        if self.identities.contains_key(record.identity()) {
            return None;
        }
        let key = self.alloc_key();
        self.identities.insert(record.identity().to_string(), key);
        self.rows.push(Row { key, record });
        Some(self.rows.len() - 1)
    }

    fn remove_identity(&mut self, identity: &str) -> Option<Arc<R>> {
        let key = self.identities.remove(identity)?;
        let position = self.position_of_key(key)?;
        let row = self.rows.remove(position);
        emit(
            &mut self.observers,
            &ModelEvent::RowDeleted { position },
            Some(&row.record),
        );
        Some(row.record)
    }

    /// Removes every row from the front, one deletion event each.
    fn drain_rows(&mut self) -> usize {
        let count = self.rows.len();
        for row in std::mem::take(&mut self.rows) {
            emit(
                &mut self.observers,
                &ModelEvent::RowDeleted { position: 0 },
                Some(&row.record),
            );
        }
        self.identities.clear();
        count
    }
}

fn emit<R>(observers: &mut Observers<R>, event: &ModelEvent, record: Option<&Arc<R>>) {
    for (_, observer) in observers.iter_mut() {
        observer.on_event(event, record.map(|record| record.as_ref()));
    }
}
