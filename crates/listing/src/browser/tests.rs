use super::*;
use crate::error::ListingError;
use crate::model::{ModelEvent, SortDirection, SortKey};
use crate::types::Entry;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

fn folder() -> TempDir {
    let temp = TempDir::new().unwrap();
    let mut big = File::create(temp.path().join("big.bin")).unwrap();
    big.write_all(&[0u8; 4096]).unwrap();
    File::create(temp.path().join("alpha.txt")).unwrap();
    File::create(temp.path().join(".profile")).unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();
    temp
}

fn names(browser: &FolderBrowser) -> Vec<String> {
    browser
        .collection()
        .map(|collection| {
            collection
                .records()
                .map(|record| record.display_name().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn open_installs_sorted_collection() {
    crate::init_test_logging();
    let temp = folder();
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());

    browser.open(temp.path()).unwrap();
    assert!(browser.is_loading());
    assert_eq!(browser.loading_path().as_deref(), Some(temp.path()));
    assert!(browser.collection().is_none());

    assert_eq!(context.dispatch_timeout(WAIT), 1);
    assert!(!browser.is_loading());
    assert_eq!(browser.path().as_deref(), Some(temp.path()));
    assert_eq!(names(&browser), vec!["src", "alpha.txt", "big.bin"]);
    assert!(browser.collection().unwrap().is_detached());
}

#[test]
fn open_rejects_missing_folder() {
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    let result = browser.open("/definitely/not/here");
    assert!(matches!(result, Err(ListingError::InvalidInput(_))));
    assert!(!browser.is_loading());
}

#[test]
fn reopening_supersedes_previous_scan() {
    crate::init_test_logging();
    let first = folder();
    let second = TempDir::new().unwrap();
    File::create(second.path().join("only.txt")).unwrap();

    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    browser.open(first.path()).unwrap();
    browser.open(second.path()).unwrap();
    assert_eq!(context.pending_tasks(), 1);

    assert_eq!(context.dispatch_timeout(WAIT), 1);
    assert_eq!(context.dispatch_timeout(Duration::from_millis(50)), 0);
    assert_eq!(browser.path().as_deref(), Some(second.path()));
    assert_eq!(names(&browser), vec!["only.txt"]);
}

#[test]
fn sort_and_hidden_settings_apply_to_loaded_collection() {
    let temp = folder();
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    browser.open(temp.path()).unwrap();
    context.dispatch_timeout(WAIT);

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    browser
        .with_collection_mut(|collection| {
            collection.subscribe(move |event: &ModelEvent, _: Option<&FileEntry>| {
                sink.borrow_mut().push(event.clone());
            })
        })
        .unwrap();

    browser.set_sort(SortConfig::by(SortKey::Size, SortDirection::Desc));
    assert_eq!(names(&browser), vec!["big.bin", "alpha.txt", "src"]);
    assert!(matches!(events.borrow()[0], ModelEvent::RowsReordered(_)));

    browser.set_show_hidden(true);
    assert_eq!(names(&browser), vec!["big.bin", "alpha.txt", ".profile", "src"]);
    assert_eq!(browser.sort().key, SortKey::Size);
}

#[test]
fn settings_carry_over_to_next_load() {
    let temp = folder();
    let context = MainContext::new();
    let config = ListingConfig {
        show_hidden: true,
        ..ListingConfig::default()
    };
    let browser = FolderBrowser::new(&context, &config);
    browser.open(temp.path()).unwrap();
    context.dispatch_timeout(WAIT);
    assert_eq!(names(&browser), vec!["src", "alpha.txt", "big.bin", ".profile"]);
}

#[test]
fn cancel_without_scan_reports_idle() {
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    assert!(!browser.cancel().unwrap());
}

#[test]
fn cancel_ends_loading_either_way() {
    let temp = folder();
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    browser.open(temp.path()).unwrap();
    assert!(browser.cancel().unwrap());

    assert_eq!(context.dispatch_timeout(WAIT), 1);
    assert!(!browser.is_loading());
    // The scan may finish before the request lands; then it is installed.
    let installed = browser.collection().map(|collection| collection.len());
    if let Some(len) = installed {
        assert_eq!(len, 3);
    }
}

#[test]
fn close_drops_everything() {
    let temp = folder();
    let context = MainContext::new();
    let browser = FolderBrowser::new(&context, &ListingConfig::default());
    browser.open(temp.path()).unwrap();
    browser.close();

    assert!(!browser.is_loading());
    assert_eq!(context.pending_tasks(), 0);
    assert_eq!(context.dispatch_timeout(Duration::from_millis(100)), 0);
    assert!(browser.collection().is_none());
}
