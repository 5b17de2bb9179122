// Tests for the local filesystem walk

use super::support::{t0, write_file};
use bucketdiff::inventory::{collect_local, collect_local_until, ExcludePatterns, ReportingZone};
use bucketdiff::CollectionError;
use chrono::Duration;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

#[test]
fn test_logical_paths_replace_root_with_prefix() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"hello", t0());
    write_file(&dir.path().join("sub/deeper/b.bin"), b"0123456789", t0());

    let mut records = collect_local(dir.path(), "photos", &ExcludePatterns::new(), ReportingZone::default()).unwrap();
    records.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

    let paths: Vec<_> = records.iter().map(|r| r.logical_path.as_str()).collect();
    assert_eq!(paths, vec!["photos/a.txt", "photos/sub/deeper/b.bin"]);
    assert_eq!(records[0].size_bytes, 5);
    assert_eq!(records[1].size_bytes, 10);
}

#[test]
fn test_trailing_slash_on_root_is_ignored() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"x", t0());

    let root = format!("{}/", dir.path().display());
    let records = collect_local(Path::new(&root), "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logical_path, "b/a.txt");
}

#[test]
fn test_modification_time_is_localized() {
    let dir = tempdir().unwrap();
    let modified = t0() + Duration::seconds(30);
    write_file(&dir.path().join("a.txt"), b"x", modified);

    let records = collect_local(dir.path(), "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records[0].modified_at, modified);
    assert_eq!(records[0].modified_at.offset().local_minus_utc(), 9 * 3600);

    let utc = ReportingZone::from_minutes(0).unwrap();
    let records = collect_local(dir.path(), "b", &ExcludePatterns::new(), utc).unwrap();
    assert_eq!(records[0].modified_at.offset().local_minus_utc(), 0);
}

#[test]
fn test_directories_are_not_records_and_hidden_files_are() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("empty/dir")).unwrap();
    write_file(&dir.path().join(".hidden"), b"secret", t0());

    let records = collect_local(dir.path(), "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logical_path, "b/.hidden");
}

#[test]
fn test_empty_files_are_kept_locally() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("zero"), b"", t0());

    let records = collect_local(dir.path(), "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size_bytes, 0);
}

#[test]
fn test_excluded_files_are_skipped() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("keep.jpg"), b"x", t0());
    write_file(&dir.path().join(".git/config"), b"x", t0());
    write_file(&dir.path().join("album/.DS_Store"), b"x", t0());
    let excludes = ExcludePatterns::from_patterns(&[".git", ".DS_Store"]).unwrap();

    let records = collect_local(dir.path(), "b", &excludes, ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logical_path, "b/keep.jpg");
}

#[test]
fn test_missing_root_is_collection_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("not-there");

    let err = collect_local(&missing, "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap_err();

    assert!(matches!(err, CollectionError::RootNotFound { .. }));
}

#[test]
fn test_root_that_is_a_file_is_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    write_file(&file, b"x", t0());

    let err = collect_local(&file, "b", &ExcludePatterns::new(), ReportingZone::default()).unwrap_err();

    assert!(matches!(err, CollectionError::Walk { .. }));
}

#[cfg(unix)]
#[test]
fn test_symlinked_file_is_recorded_with_target_metadata() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    let outside = dir.path().join("outside.txt");
    write_file(&root.join("a.txt"), b"x", t0());
    write_file(&outside, b"linked body", t0() + Duration::seconds(42));
    symlink("../outside.txt", root.join("linked.txt")).unwrap();

    let mut records = collect_local(&root, "p", &ExcludePatterns::new(), ReportingZone::default()).unwrap();
    records.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

    let paths: Vec<_> = records.iter().map(|r| r.logical_path.as_str()).collect();
    assert_eq!(paths, vec!["p/a.txt", "p/linked.txt"]);
    assert_eq!(records[1].size_bytes, 11);
    assert_eq!(records[1].modified_at, t0() + Duration::seconds(42));
}

#[cfg(unix)]
#[test]
fn test_directory_symlinks_are_not_descended() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    write_file(&root.join("a.txt"), b"x", t0());
    write_file(&dir.path().join("elsewhere/b.txt"), b"x", t0());
    symlink(dir.path().join("elsewhere"), root.join("shortcut")).unwrap();

    let records = collect_local(&root, "p", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logical_path, "p/a.txt");
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_skipped() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"x", t0());
    symlink(dir.path().join("missing.txt"), dir.path().join("broken.txt")).unwrap();

    let records = collect_local(dir.path(), "p", &ExcludePatterns::new(), ReportingZone::default()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logical_path, "p/a.txt");
}

#[test]
fn test_walk_stops_once_cancelled() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"x", t0());
    let cancel = AtomicBool::new(true);

    let err = collect_local_until(dir.path(), "p", &ExcludePatterns::new(), ReportingZone::default(), &cancel)
        .unwrap_err();

    assert!(matches!(err, CollectionError::Cancelled { .. }));
}
