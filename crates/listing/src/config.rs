use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ListingError, Result};
use crate::model::SortConfig;

pub const DEFAULT_THREAD_NAME: &str = "listing-task";

/// Defaults applied to new collections and background tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub sort: SortConfig,
    pub show_hidden: bool,
    pub task: TaskOptions,
}

/// Worker thread settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    /// Prefix of the worker thread name; the task id is appended.
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl ListingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            ListingError::Config(format!(
                "failed to read listing config {}: {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|error| {
            ListingError::Config(format!(
                "failed to parse listing config {}: {error}",
                path.display()
            ))
        })
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("listing config missing, using defaults path={}", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ListingError::Config(format!(
                    "failed to create config directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
        let data = serde_json::to_string_pretty(self).map_err(|error| {
            ListingError::Config(format!("failed to serialize listing config: {error}"))
        })?;
        std::fs::write(path, data).map_err(|error| {
            ListingError::Config(format!(
                "failed to write listing config {}: {error}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseSensitivity, SortDirection, SortKey};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ListingConfig::load_or_default(&dir.path().join("listing.json")).unwrap();
        assert_eq!(config, ListingConfig::default());
        assert_eq!(config.task.thread_name, DEFAULT_THREAD_NAME);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("listing.json");
        let config = ListingConfig {
            sort: SortConfig {
                case_sensitivity: CaseSensitivity::Sensitive,
                hidden_first: true,
                ..SortConfig::by(SortKey::Modified, SortDirection::Desc)
            },
            show_hidden: true,
            task: TaskOptions {
                thread_name: "scanner".to_string(),
                stack_size: Some(256 * 1024),
            },
        };
        config.save(&path).unwrap();
        assert_eq!(ListingConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(&path, r#"{"sort": {"key": "size"}, "show_hidden": true}"#).unwrap();

        let config = ListingConfig::load(&path).unwrap();
        assert_eq!(config.sort.key, SortKey::Size);
        assert_eq!(config.sort.direction, SortDirection::Asc);
        assert!(config.sort.directory_grouping);
        assert!(config.show_hidden);
        assert_eq!(config.task, TaskOptions::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listing.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ListingConfig::load_or_default(&path),
            Err(ListingError::Config(_))
        ));
    }
}
