//! Record types held by a `SortedCollection`.
//!
//! The collection only sees records through the `Entry` accessor trait.
//! `FileEntry` is the filesystem implementation; application descriptors
//! live in `apps`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Names starting with this marker are hidden.
pub const HIDDEN_PREFIX: char = '.';

/// Accessor interface used for filtering, sorting and column extraction.
///
/// Everything besides the identity and the basic attributes is an opaque
/// presentation string resolved elsewhere (MIME description, owner name,
/// icon name). Those default to `None`.
pub trait Entry: Send + Sync + 'static {
    /// Stable identity key; unique within one collection.
    fn identity(&self) -> &str;

    fn display_name(&self) -> &str;

    fn size(&self) -> u64;

    /// Modification time in Unix seconds.
    fn modified_at(&self) -> u64;

    fn is_dir(&self) -> bool;

    fn is_hidden(&self) -> bool {
        is_hidden_name(self.display_name())
    }

    /// Special descriptor entries break name ties by identity instead of
    /// display name.
    fn is_special(&self) -> bool {
        false
    }

    fn description(&self) -> Option<&str> {
        None
    }

    fn permissions(&self) -> Option<&str> {
        None
    }

    fn owner(&self) -> Option<&str> {
        None
    }

    fn icon_name(&self) -> Option<&str> {
        None
    }
}

pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
    Symlink,
    Other,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }

    pub fn from_file_type(file_type: &fs::FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// A filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Identity key: the file name, or the root-relative path for recursive scans.
    pub identity: String,
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified_at: u64,
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
}

impl FileEntry {
    /// Stats `path` without following symlinks. The identity is the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let identity = file_name_lossy(path);
        Ok(Self::from_metadata(path, identity, &metadata))
    }

    pub fn from_metadata(path: &Path, identity: String, metadata: &fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        Self {
            path: path.to_path_buf(),
            identity,
            name: file_name_lossy(path),
            file_type: FileType::from_file_type(&file_type),
            size: if file_type.is_file() { metadata.len() } else { 0 },
            modified_at: modified_secs(metadata).unwrap_or(0),
            permissions: Some(permission_string(metadata)),
            owner: owner_of(metadata),
            description: None,
        }
    }

    /// Attaches an externally resolved description (e.g. a MIME type label).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entry for FileEntry {
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
        self.file_type == FileType::Directory
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

pub(crate) fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn modified_secs(metadata: &fs::Metadata) -> Option<u64> {
    metadata
        .modified()
        .ok()
        .and_then(|value| value.duration_since(UNIX_EPOCH).ok())
        .map(|value| value.as_secs())
}

/// `ls -l` style permission string, e.g. `drwxr-xr-x`.
#[cfg(unix)]
pub fn permission_string(metadata: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let kind = FileType::from_file_type(&metadata.file_type());
    let mut out = String::with_capacity(10);
    out.push(match kind {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::File => '-',
        FileType::Other => '?',
    });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
pub fn permission_string(metadata: &fs::Metadata) -> String {
    if metadata.permissions().readonly() {
        "r--".to_string()
    } else {
        "rw-".to_string()
    }
}

#[cfg(unix)]
fn owner_of(metadata: &fs::Metadata) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.uid().to_string())
}

#[cfg(not(unix))]
fn owner_of(_metadata: &fs::Metadata) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn hidden_names_start_with_dot() {
        assert!(is_hidden_name(".bashrc"));
        assert!(!is_hidden_name("bashrc"));
        assert!(!is_hidden_name(""));
    }

    #[test]
    fn file_entry_from_path_reads_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();

        let entry = FileEntry::from_path(&path).unwrap();
        assert_eq!(entry.identity(), "notes.txt");
        assert_eq!(entry.display_name(), "notes.txt");
        assert_eq!(entry.size(), 5);
        assert!(!entry.is_dir());
        assert!(!entry.is_hidden());
        assert!(entry.modified_at() > 0);
    }

    #[test]
    fn directories_report_zero_size() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".config");
        fs::create_dir(&dir).unwrap();

        let entry = FileEntry::from_path(&dir).unwrap();
        assert!(entry.is_dir());
        assert!(entry.is_hidden());
        assert_eq!(entry.size(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn permission_string_matches_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("script.sh");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o754)).unwrap();

        let metadata = fs::symlink_metadata(&path).unwrap();
        assert_eq!(permission_string(&metadata), "-rwxr-xr--");
    }

    #[test]
    fn missing_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = FileEntry::from_path(&temp.path().join("missing"));
        assert!(matches!(result, Err(crate::ListingError::Io(_))));
    }
}
