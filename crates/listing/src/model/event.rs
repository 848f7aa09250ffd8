//! Change notifications emitted to bound views.

/// Reordering produced by a resort: `old_to_new()[old] == new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    old_to_new: Vec<usize>,
}

impl Permutation {
    pub(crate) fn new(old_to_new: Vec<usize>) -> Self {
        Self { old_to_new }
    }

    pub fn len(&self) -> usize {
        self.old_to_new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old_to_new.is_empty()
    }

    pub fn old_to_new(&self) -> &[usize] {
        &self.old_to_new
    }

    /// Inverse mapping: `new_to_old()[new] == old`.
    pub fn new_to_old(&self) -> Vec<usize> {
        let mut inverse = vec![0; self.old_to_new.len()];
        for (old, &new) in self.old_to_new.iter().enumerate() {
            inverse[new] = old;
        }
        inverse
    }

    pub fn is_identity(&self) -> bool {
        self.old_to_new
            .iter()
            .enumerate()
            .all(|(old, &new)| old == new)
    }
}

/// Row-level change, delivered in generation order on the owning thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    RowInserted { position: usize },
    RowDeleted { position: usize },
    RowChanged { position: usize },
    RowsReordered(Permutation),
}

/// A view bound to a collection.
///
/// The record borrow is only valid for the duration of the callback; views
/// that need to keep a record clone it through `Column::Record`.
pub trait ModelObserver<R> {
    fn on_event(&mut self, event: &ModelEvent, record: Option<&R>);
}

impl<R, F> ModelObserver<R> for F
where
    F: FnMut(&ModelEvent, Option<&R>),
{
    fn on_event(&mut self, event: &ModelEvent, record: Option<&R>) {
        self(event, record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);
