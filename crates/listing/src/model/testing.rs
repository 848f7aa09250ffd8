//! Record fixtures shared by the model tests.

use std::sync::Arc;

use crate::types::{is_hidden_name, Entry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestEntry {
    pub(crate) identity: String,
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) modified_at: u64,
    pub(crate) dir: bool,
    pub(crate) special: bool,
    /// Forces the hidden flag regardless of the name.
    pub(crate) hidden: bool,
}

impl Entry for TestEntry {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn modified_at(&self) -> u64 {
        self.modified_at
    }

    fn is_dir(&self) -> bool {
        self.dir
    }

    fn is_hidden(&self) -> bool {
        self.hidden || is_hidden_name(&self.name)
    }

    fn is_special(&self) -> bool {
        self.special
    }
}

pub(crate) fn file(name: &str, size: u64) -> TestEntry {
    TestEntry {
        identity: name.to_string(),
        name: name.to_string(),
        size,
        modified_at: 0,
        dir: false,
        special: false,
        hidden: false,
    }
}

pub(crate) fn dir(name: &str) -> TestEntry {
    TestEntry {
        dir: true,
        ..file(name, 0)
    }
}

pub(crate) fn special(identity: &str, name: &str) -> TestEntry {
    TestEntry {
        identity: identity.to_string(),
        name: name.to_string(),
        special: true,
        ..file(identity, 0)
    }
}

pub(crate) fn shared(entry: TestEntry) -> Arc<TestEntry> {
    Arc::new(entry)
}
