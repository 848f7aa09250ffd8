//! Installed application descriptors.
//!
//! Applications are found by walking the `applications` data directories for
//! `.desktop` files. The desktop-file id (path below the data directory with
//! separators replaced by `-`) is the identity, and the first directory that
//! provides an id wins.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TaskOptions;
use crate::error::Result;
use crate::task::{Finished, MainContext, Task, TaskScope};
use crate::types::{is_hidden_name, modified_secs, Entry};

pub const DESKTOP_EXTENSION: &str = "desktop";

pub type AppScanResult = Vec<Arc<AppEntry>>;

/// A launchable application described by a desktop file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub comment: Option<String>,
    pub icon: Option<String>,
    /// `NoDisplay=true` or `Hidden=true` in the desktop file.
    pub no_display: bool,
    pub modified_at: u64,
}

impl AppEntry {
    /// Reads the `[Desktop Entry]` group of `path`. The display name falls
    /// back to the file stem.
    pub fn from_desktop_file(id: String, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let metadata = fs::metadata(path)?;
        let fields = DesktopFields::parse(&contents);

        let name = fields.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone())
        });

        Ok(Self {
            id,
            name,
            path: path.to_path_buf(),
            comment: fields.comment,
            icon: fields.icon,
            no_display: fields.no_display,
            modified_at: modified_secs(&metadata).unwrap_or(0),
        })
    }
}

impl Entry for AppEntry {
    fn identity(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        0
    }

    fn modified_at(&self) -> u64 {
        self.modified_at
    }

    fn is_dir(&self) -> bool {
        false
    }

    fn is_hidden(&self) -> bool {
        self.no_display || is_hidden_name(&self.name)
    }

    fn is_special(&self) -> bool {
        true
    }

    fn description(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn icon_name(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

#[derive(Debug, Default)]
struct DesktopFields {
    name: Option<String>,
    comment: Option<String>,
    icon: Option<String>,
    no_display: bool,
}

impl DesktopFields {
    fn parse(contents: &str) -> Self {
        let mut fields = Self::default();
        let mut in_entry = false;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_entry = line == "[Desktop Entry]";
                continue;
            }
            if !in_entry {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            // Localized keys (Name[de]=...) are ignored.
            match key.trim() {
                "Name" => fields.name = Some(value.to_string()),
                "Comment" => fields.comment = Some(value.to_string()),
                "Icon" => fields.icon = Some(value.to_string()),
                "NoDisplay" | "Hidden" => fields.no_display |= value == "true",
                _ => {}
            }
        }
        fields
    }
}

/// Directories searched for desktop files, most specific first.
///
/// The user data directory comes first, then each entry of
/// `$XDG_DATA_DIRS`.
pub fn application_dirs() -> Vec<PathBuf> {
    let data_dirs = std::env::var("XDG_DATA_DIRS").ok();
    application_dirs_from(dirs::data_dir(), data_dirs.as_deref())
}

const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

fn application_dirs_from(data_home: Option<PathBuf>, data_dirs: Option<&str>) -> Vec<PathBuf> {
    let data_dirs = match data_dirs {
        Some(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_DATA_DIRS,
    };
    let mut dirs = Vec::new();
    let roots = data_home.into_iter().chain(
        data_dirs
            .split(':')
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from),
    );
    for root in roots {
        let path = root.join("applications");
        if !dirs.contains(&path) {
            dirs.push(path);
        }
    }
    dirs
}

/// Collects the applications under `dirs` into the scope's result.
///
/// Returns the number of applications staged, or `None` if cancelled.
/// Unreadable directories and malformed desktop files are skipped.
pub fn enumerate_applications(dirs: &[PathBuf], scope: &TaskScope<AppScanResult>) -> Option<usize> {
    scope
        .critical_section()
        .result_mut()
        .get_or_insert_with(Vec::new);

    let mut seen = HashSet::new();
    let mut staged = 0usize;
    for root in dirs {
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let Ok(read_dir) = fs::read_dir(&dir) else {
                log::debug!("listing apps skipping unreadable dir={}", dir.display());
                continue;
            };
            for child in read_dir.flatten() {
                scope.checkpoint()?;

                let path = child.path();
                let Ok(file_type) = child.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|ext| ext.to_str()) != Some(DESKTOP_EXTENSION) {
                    continue;
                }
                let Some(id) = desktop_id(root, &path) else {
                    continue;
                };
                if seen.contains(&id) {
                    continue;
                }

                match AppEntry::from_desktop_file(id.clone(), &path) {
                    Ok(app) => {
                        seen.insert(id);
                        let mut section = scope.critical_section();
                        if section.is_cancel_requested() {
                            return None;
                        }
                        section
                            .result_mut()
                            .get_or_insert_with(Vec::new)
                            .push(Arc::new(app));
                        staged += 1;
                    }
                    Err(error) => {
                        log::warn!(
                            "listing apps failed to read desktop file path={} error={error}",
                            path.display()
                        );
                    }
                }
            }
        }
    }

    log::debug!("listing apps enumerated count={staged} dirs={}", dirs.len());
    Some(staged)
}

/// `applications/kde/konsole.desktop` -> `kde-konsole.desktop`
fn desktop_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("-"))
}

/// Enumerates applications on a worker thread.
pub fn start_application_scan<F>(
    context: &MainContext,
    dirs: Vec<PathBuf>,
    task_options: TaskOptions,
    on_done: F,
) -> Result<Task<AppScanResult>>
where
    F: FnOnce(Finished<AppScanResult>) + 'static,
{
    let mut task = Task::with_options(context, task_options, move |scope: &TaskScope<AppScanResult>| {
        let _ = enumerate_applications(&dirs, scope);
    });
    task.on_finished(on_done)?;
    task.start()?;
    Ok(task)
}
