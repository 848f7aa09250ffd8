//! Backing sources a collection can mirror.
//!
//! - `Source` is the interface (snapshot + event subscription)
//! - `DirectorySource` lists one directory and accepts forwarded watch notifications
//! - `MemorySource` holds records pushed by the caller

mod directory;
mod event;
mod memory;

pub use directory::{DirectorySource, SourceNotifier};
pub use event::{Source, SourceEvent, SourceId, Subscribers};
pub use memory::MemorySource;
