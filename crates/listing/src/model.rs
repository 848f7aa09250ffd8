//! Sorted, observable mirror of a backing source.

mod collection;
mod column;
mod compare;
mod event;
mod handle;

#[cfg(test)]
pub(crate) mod testing;

pub use collection::{ModelState, SortedCollection};
pub use column::{CellValue, Column, ColumnType, IconSize};
pub use compare::{
    compare_entries, compare_names, natural_cmp, CaseSensitivity, SortConfig, SortDirection,
    SortKey,
};
pub use event::{ModelEvent, ModelObserver, ObserverId, Permutation};
pub use handle::RowHandle;
