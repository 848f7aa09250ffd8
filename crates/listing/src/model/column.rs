//! Fixed column set exposed to views.

use std::sync::Arc;

use crate::types::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    IconBig,
    IconSmall,
    Name,
    Size,
    Description,
    Permissions,
    Owner,
    Modified,
    /// The record itself, as a new shared reference.
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Icon,
    Text,
    Size,
    Timestamp,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconSize {
    Big,
    Small,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::IconBig,
        Column::IconSmall,
        Column::Name,
        Column::Size,
        Column::Description,
        Column::Permissions,
        Column::Owner,
        Column::Modified,
        Column::Record,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Self::IconBig | Self::IconSmall => ColumnType::Icon,
            Self::Name | Self::Description | Self::Permissions | Self::Owner => ColumnType::Text,
            Self::Size => ColumnType::Size,
            Self::Modified => ColumnType::Timestamp,
            Self::Record => ColumnType::Record,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IconBig => "icon-big",
            Self::IconSmall => "icon-small",
            Self::Name => "name",
            Self::Size => "size",
            Self::Description => "description",
            Self::Permissions => "permissions",
            Self::Owner => "owner",
            Self::Modified => "mtime",
            Self::Record => "record",
        }
    }
}

/// A single cell. Text borrows from the record.
#[derive(Debug)]
pub enum CellValue<'a, R> {
    Icon {
        size: IconSize,
        name: Option<&'a str>,
    },
    Text(Option<&'a str>),
    Size(u64),
    Timestamp(u64),
    Record(Arc<R>),
}

impl<R> CellValue<'_, R> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => *text,
            _ => None,
        }
    }
}

pub(crate) fn cell_value<R: Entry>(record: &Arc<R>, column: Column) -> CellValue<'_, R> {
    match column {
        Column::IconBig => CellValue::Icon {
            size: IconSize::Big,
            name: record.icon_name(),
        },
        Column::IconSmall => CellValue::Icon {
            size: IconSize::Small,
            name: record.icon_name(),
        },
        Column::Name => CellValue::Text(Some(record.display_name())),
        Column::Size => CellValue::Size(record.size()),
        Column::Description => CellValue::Text(record.description()),
        Column::Permissions => CellValue::Text(record.permissions()),
        Column::Owner => CellValue::Text(record.owner()),
        Column::Modified => CellValue::Timestamp(record.modified_at()),
        Column::Record => CellValue::Record(record.clone()),
    }
}
