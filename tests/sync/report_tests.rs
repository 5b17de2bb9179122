// Tests for text and JSON report rendering

use bucketdiff::report::{render, render_json, render_text, ReportFormat};
use bucketdiff::{CollectionError, FileRecord, MappingOutcome, MappingReport, Reconciliation, SyncError};
use chrono::{DateTime, FixedOffset, TimeZone};
use std::path::PathBuf;

fn noon() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .unwrap()
}

fn ok_outcome() -> MappingOutcome {
    let report = MappingReport {
        name: "photos".to_string(),
        bucket: "photos".to_string(),
        local_root: PathBuf::from("/data/photos"),
        remote_files: 2,
        local_files: 3,
        reconciliation: Reconciliation {
            to_upload: vec![
                FileRecord::new(10, noon(), "photos/a.jpg"),
                FileRecord::new(5, noon(), "photos/b.jpg"),
            ],
            to_delete: vec![FileRecord::new(7, noon(), "photos/old.jpg")],
        },
    };
    MappingOutcome {
        name: "photos".to_string(),
        result: Ok(report),
    }
}

fn failed_outcome() -> MappingOutcome {
    MappingOutcome {
        name: "locked".to_string(),
        result: Err(SyncError::Collection(CollectionError::Listing {
            bucket: "locked".to_string(),
            start_after: String::new(),
            message: "access denied".to_string(),
        })),
    }
}

#[test]
fn test_text_layout() {
    let text = render_text(&[ok_outcome()], false);
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines[0], "## photos");
    assert_eq!(lines[1], "to be uploaded:");
    assert_eq!(lines[2], "\tphotos/a.jpg  10 bytes  2024-05-01T12:00:00+09:00");
    assert_eq!(lines[3], "\tphotos/b.jpg  5 bytes  2024-05-01T12:00:00+09:00");
    assert_eq!(lines[4], "to be deleted :");
    assert_eq!(lines[5], "\tphotos/old.jpg  7 bytes  2024-05-01T12:00:00+09:00");
    assert!(lines[6].starts_with("2 to upload (15 B), 1 to delete; 2 remote / 3 local files"));
    assert_eq!(lines.len(), 7);
}

#[test]
fn test_text_reports_failures_inline() {
    let text = render_text(&[failed_outcome(), ok_outcome()], false);

    assert!(text.starts_with("## locked\nerror: Failed to list bucket 'locked'"));
    assert!(text.contains("access denied"));
    assert!(text.contains("## photos\nto be uploaded:"));
}

#[test]
fn test_unstyled_text_has_no_escape_codes() {
    let text = render_text(&[ok_outcome(), failed_outcome()], false);
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn test_json_statuses() {
    let json = render_json(&[ok_outcome(), failed_outcome()]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let items = value.as_array().unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["status"], "ok");
    assert_eq!(items[0]["name"], "photos");
    assert_eq!(items[0]["remote_files"], 2);
    assert_eq!(items[0]["to_upload"][0]["logical_path"], "photos/a.jpg");
    assert_eq!(items[0]["to_upload"][0]["modified_at"], "2024-05-01T12:00:00+09:00");
    assert_eq!(items[0]["to_delete"][0]["size_bytes"], 7);

    assert_eq!(items[1]["status"], "error");
    assert_eq!(items[1]["name"], "locked");
    assert!(items[1]["error"].as_str().unwrap().contains("access denied"));
}

#[test]
fn test_render_json_ends_with_newline() {
    let out = render(&[ok_outcome()], ReportFormat::Json, false).unwrap();
    assert!(out.ends_with("]\n"));
}
