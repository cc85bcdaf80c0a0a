// tests/config_settings.rs

use std::str::FromStr;
use std::time::Duration;

use tempfile::tempdir;

use cvsync::config::{load_and_validate, load_from_path, validate_settings, Settings};
use cvsync::errors::CvSyncError;
use cvsync::types::{BatchKind, BatchStatus};
use cvsync_test_utils::builders::write_file;
use cvsync_test_utils::init_tracing;

#[test]
fn defaults_match_the_documented_values() {
    init_tracing();

    let settings = Settings::default();
    assert_eq!(settings.allowed_extensions, vec![".pdf", ".docx"]);
    assert_eq!(settings.max_parallel, 5);
    assert_eq!(settings.min_call_interval_ms, 300);
    assert_eq!(settings.max_retries, 5);
    assert_eq!(settings.error_message_limit, 500);
    assert_eq!(settings.min_call_interval(), Duration::from_millis(300));
    assert!(validate_settings(&settings).is_ok());
}

#[test]
fn partial_files_fall_back_to_defaults() {
    init_tracing();

    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "Cvsync.toml", b"max_parallel = 2\n");

    let settings = load_and_validate(&path).unwrap();
    assert_eq!(settings.max_parallel, 2);
    assert_eq!(settings.max_retries, 5);
    assert_eq!(settings.allowed_extensions, vec![".pdf", ".docx"]);
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();

    let dir = tempdir().unwrap();
    let err = load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, CvSyncError::IoError(_)));
}

#[test]
fn malformed_toml_is_reported() {
    init_tracing();

    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "Cvsync.toml", b"max_parallel = [nope\n");
    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, CvSyncError::TomlError(_)));
}

#[test]
fn zero_limits_are_rejected() {
    init_tracing();

    let zero_width = Settings {
        max_parallel: 0,
        ..Settings::default()
    };
    assert!(matches!(
        validate_settings(&zero_width).unwrap_err(),
        CvSyncError::ConfigError(_)
    ));

    let zero_retries = Settings {
        max_retries: 0,
        ..Settings::default()
    };
    assert!(matches!(
        validate_settings(&zero_retries).unwrap_err(),
        CvSyncError::ConfigError(_)
    ));
}

#[test]
fn malformed_extensions_are_rejected() {
    init_tracing();

    for bad in [vec![], vec!["pdf".to_string()], vec![".".to_string()]] {
        let settings = Settings {
            allowed_extensions: bad,
            ..Settings::default()
        };
        assert!(matches!(
            validate_settings(&settings).unwrap_err(),
            CvSyncError::ConfigError(_)
        ));
    }
}

#[test]
fn batch_kinds_parse_case_insensitively() {
    init_tracing();

    assert_eq!(BatchKind::from_str("parse").unwrap(), BatchKind::Parse);
    assert_eq!(BatchKind::from_str(" Match ").unwrap(), BatchKind::Match);
    assert!(BatchKind::from_str("reindex").is_err());
}

#[test]
fn batch_kinds_map_to_statuses_and_messages() {
    init_tracing();

    assert_eq!(BatchKind::Parse.running_status(), BatchStatus::Processing);
    assert_eq!(BatchKind::Match.running_status(), BatchStatus::Matching);
    assert_eq!(BatchKind::Parse.start_message(4), "Processing 4 CVs");
    assert_eq!(BatchKind::Match.step_message(1, 4), "Matched 1/4");
    assert_eq!(BatchKind::Parse.done_message(), "All CVs processed");
}
