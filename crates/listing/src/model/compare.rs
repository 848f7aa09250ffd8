//! Multi-key comparator for collection rows.
//!
//! Order of precedence:
//! 1. directory grouping (directories first when ascending, last when descending)
//! 2. hidden partition (`hidden_first`), independent of direction
//! 3. the configured sort key
//! 4. display name, natural or plain, case-sensitive or not
//! 5. identity for special descriptor entries
//!
//! Identity is always the final tie-break, so the order is total and a
//! re-sort under the same configuration never moves anything.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{ListingError, Result};
use crate::types::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Modified,
    Description,
    Permissions,
    Owner,
}

impl SortKey {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "modified" | "mtime" => Ok(Self::Modified),
            "description" => Ok(Self::Description),
            "permissions" => Ok(Self::Permissions),
            "owner" => Ok(Self::Owner),
            other => Err(ListingError::InvalidInput(format!(
                "unsupported sort key: {other} (expected one of: name, size, modified, description, permissions, owner)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Description => "description",
            Self::Permissions => "permissions",
            Self::Owner => "owner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(ListingError::InvalidInput(format!(
                "unsupported sort direction: {other} (expected one of: asc, desc)"
            ))),
        }
    }

    #[inline]
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    Sensitive,
    #[default]
    Insensitive,
}

impl CaseSensitivity {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "sensitive" => Ok(Self::Sensitive),
            "insensitive" => Ok(Self::Insensitive),
            other => Err(ListingError::InvalidInput(format!(
                "unsupported case sensitivity: {other} (expected one of: sensitive, insensitive)"
            ))),
        }
    }
}

/// Comparator configuration of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
    pub directory_grouping: bool,
    pub natural_order: bool,
    pub case_sensitivity: CaseSensitivity,
    pub hidden_first: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Asc,
            directory_grouping: true,
            natural_order: true,
            case_sensitivity: CaseSensitivity::Insensitive,
            hidden_first: false,
        }
    }
}

impl SortConfig {
    pub fn by(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key,
            direction,
            ..Self::default()
        }
    }
}

/// Compares two records under `config`.
pub fn compare_entries<R: Entry + ?Sized>(a: &R, b: &R, config: &SortConfig) -> Ordering {
    if config.directory_grouping && a.is_dir() != b.is_dir() {
        let dirs_first = if a.is_dir() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        return config.direction.apply(dirs_first);
    }

    if a.is_hidden() != b.is_hidden() {
        let hidden_first = if a.is_hidden() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        return if config.hidden_first {
            hidden_first
        } else {
            hidden_first.reverse()
        };
    }

    let ordering = match config.key {
        SortKey::Name => Ordering::Equal,
        SortKey::Size => a.size().cmp(&b.size()),
        SortKey::Modified => a.modified_at().cmp(&b.modified_at()),
        SortKey::Description => {
            caseless_cmp(a.description().unwrap_or(""), b.description().unwrap_or(""))
        }
        SortKey::Owner => caseless_cmp(a.owner().unwrap_or(""), b.owner().unwrap_or("")),
        SortKey::Permissions => a
            .permissions()
            .unwrap_or("")
            .cmp(b.permissions().unwrap_or("")),
    }
    .then_with(|| compare_names(a.display_name(), b.display_name(), config))
    .then_with(|| {
        if a.is_special() || b.is_special() {
            a.identity().cmp(b.identity())
        } else {
            Ordering::Equal
        }
    });

    config
        .direction
        .apply(ordering)
        .then_with(|| a.identity().cmp(b.identity()))
}

/// Display-name comparison honoring `natural_order` and `case_sensitivity`.
pub fn compare_names(a: &str, b: &str, config: &SortConfig) -> Ordering {
    let (a, b) = match config.case_sensitivity {
        CaseSensitivity::Sensitive => (Cow::Borrowed(a), Cow::Borrowed(b)),
        CaseSensitivity::Insensitive => (fold_case(a), fold_case(b)),
    };
    if config.natural_order {
        natural_cmp(&a, &b)
    } else {
        a.cmp(&b)
    }
}

fn caseless_cmp(a: &str, b: &str) -> Ordering {
    fold_case(a).cmp(&fold_case(b))
}

fn fold_case(value: &str) -> Cow<'_, str> {
    if value.chars().any(char::is_uppercase) {
        Cow::Owned(value.to_lowercase())
    } else {
        Cow::Borrowed(value)
    }
}

/// Natural ordering: runs of ASCII digits compare by numeric value.
///
/// Equal values with different leading zeros put the shorter run first.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let (a_end, a_digits) = digit_run(ab, i);
            let (b_end, b_digits) = digit_run(bb, j);

            let ordering = a_digits
                .len()
                .cmp(&b_digits.len())
                .then_with(|| a_digits.cmp(b_digits))
                .then_with(|| (a_end - i).cmp(&(b_end - j)));
            if ordering != Ordering::Equal {
                return ordering;
            }

            i = a_end;
            j = b_end;
            continue;
        }

        if ab[i] != bb[j] {
            return ab[i].cmp(&bb[j]);
        }
        i += 1;
        j += 1;
    }

    (ab.len() - i).cmp(&(bb.len() - j))
}

/// Returns the end of the digit run starting at `start` and its digits
/// without leading zeros.
fn digit_run(bytes: &[u8], start: usize) -> (usize, &[u8]) {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut trimmed = start;
    while trimmed < end && bytes[trimmed] == b'0' {
        trimmed += 1;
    }
    (end, &bytes[trimmed..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{dir, file, special, TestEntry};

    fn sorted(mut entries: Vec<TestEntry>, config: &SortConfig) -> Vec<String> {
        entries.sort_by(|a, b| compare_entries(a, b, config));
        entries.into_iter().map(|entry| entry.identity).collect()
    }

    #[test]
    fn natural_sort_orders_digit_runs() {
        let mut names = vec!["file10.txt", "file2.txt", "file1.txt", "file02.txt"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["file1.txt", "file2.txt", "file02.txt", "file10.txt"]);
    }

    #[test]
    fn natural_cmp_handles_prefixes() {
        assert_eq!(natural_cmp("abc", "abcd"), Ordering::Less);
        assert_eq!(natural_cmp("a9", "a10"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
    }

    #[test]
    fn plain_order_compares_digits_lexically() {
        let config = SortConfig {
            natural_order: false,
            ..SortConfig::default()
        };
        let order = sorted(vec![file("file10", 0), file("file2", 0)], &config);
        assert_eq!(order, vec!["file10", "file2"]);
    }

    #[test]
    fn size_sort_puts_hidden_last_regardless_of_size() {
        let config = SortConfig::by(SortKey::Size, SortDirection::Asc);
        let order = sorted(
            vec![file("b.txt", 10), file("A.TXT", 5), file(".hidden", 1)],
            &config,
        );
        assert_eq!(order, vec!["A.TXT", "b.txt", ".hidden"]);
    }

    #[test]
    fn hidden_first_moves_hidden_to_front() {
        let config = SortConfig {
            hidden_first: true,
            ..SortConfig::default()
        };
        let order = sorted(vec![file("b", 0), file(".a", 0), file("a", 0)], &config);
        assert_eq!(order, vec![".a", "a", "b"]);
    }

    #[test]
    fn directory_grouping_follows_direction() {
        let entries = || vec![file("a.txt", 1), dir("zeta"), file("b.txt", 2), dir("alpha")];

        let asc = sorted(entries(), &SortConfig::default());
        assert_eq!(asc, vec!["alpha", "zeta", "a.txt", "b.txt"]);

        let desc = sorted(entries(), &SortConfig::by(SortKey::Name, SortDirection::Desc));
        assert_eq!(desc, vec!["b.txt", "a.txt", "zeta", "alpha"]);

        let mixed = SortConfig {
            directory_grouping: false,
            ..SortConfig::default()
        };
        assert_eq!(sorted(entries(), &mixed), vec!["a.txt", "alpha", "b.txt", "zeta"]);
    }

    #[test]
    fn case_sensitivity_changes_name_order() {
        let insensitive = sorted(vec![file("b", 0), file("A", 0), file("a2", 0)], &SortConfig::default());
        assert_eq!(insensitive, vec!["A", "a2", "b"]);

        let sensitive = SortConfig {
            case_sensitivity: CaseSensitivity::Sensitive,
            ..SortConfig::default()
        };
        let order = sorted(vec![file("b", 0), file("a", 0), file("B", 0)], &sensitive);
        assert_eq!(order, vec!["B", "a", "b"]);
    }

    #[test]
    fn special_entries_break_ties_by_identity() {
        let config = SortConfig::default();
        let order = sorted(
            vec![
                special("zz-editor.desktop", "Editor"),
                special("aa-editor.desktop", "Editor"),
            ],
            &config,
        );
        assert_eq!(order, vec!["aa-editor.desktop", "zz-editor.desktop"]);

        let desc = SortConfig::by(SortKey::Name, SortDirection::Desc);
        let order = sorted(
            vec![
                special("aa-editor.desktop", "Editor"),
                special("zz-editor.desktop", "Editor"),
            ],
            &desc,
        );
        assert_eq!(order, vec!["zz-editor.desktop", "aa-editor.desktop"]);
    }

    #[test]
    fn modified_sort_descending() {
        let mut newer = file("new", 0);
        newer.modified_at = 200;
        let mut older = file("old", 0);
        older.modified_at = 100;
        let order = sorted(
            vec![older, newer],
            &SortConfig::by(SortKey::Modified, SortDirection::Desc),
        );
        assert_eq!(order, vec!["new", "old"]);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(SortKey::parse("size").unwrap(), SortKey::Size);
        assert_eq!(SortDirection::parse("descending").unwrap(), SortDirection::Desc);
        match SortKey::parse("color") {
            Err(ListingError::InvalidInput(message)) => {
                assert!(message.contains("unsupported sort key"), "unexpected message: {message}");
            }
            other => panic!("expected invalid input, got: {other:?}"),
        }
        assert!(CaseSensitivity::parse("loud").is_err());
    }
}
