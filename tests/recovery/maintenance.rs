//! `verify`, `reset` and `backup`

use crate::common::StateFixture;
use credsweep::ledger::LedgerAnomaly;
use credsweep::recovery::backup::MANIFEST_FILE;
use credsweep::recovery::{backup, reset, verify, RecoveryError};
use credsweep::state::{write_position, RunState};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::io::Cursor;

#[test]
fn test_verify_repairs_duplicates_and_keeps_malformed() {
    let fx = StateFixture::new();
    fx.write_ledger("10.0.0.1\n10.0.0.2\n10.0.0.1\n999.1.1.1\n10.0.0.2\n");

    let report = verify(&fx.paths).unwrap();
    assert_eq!(report.duplicates_removed, 2);
    let malformed: Vec<&LedgerAnomaly> = report.malformed().collect();
    assert_eq!(malformed.len(), 1);
    assert!(matches!(
        malformed[0],
        LedgerAnomaly::Malformed { line: 4, .. }
    ));
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.1", "10.0.0.2", "999.1.1.1"]);

    // Second pass finds no duplicates
    let again = verify(&fx.paths).unwrap();
    assert_eq!(again.duplicates_removed, 0);
}

#[test]
fn test_verify_requires_ledger() {
    let fx = StateFixture::new();
    assert!(matches!(
        verify(&fx.paths),
        Err(RecoveryError::MissingLedger { .. })
    ));
}

#[test]
fn test_reset_needs_exact_confirmation() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:a\n");
    fx.write_ledger("10.0.0.1\n");
    RunState::new(&targets, "pw").save(&fx.paths).unwrap();
    write_position(&fx.paths, "10.0.0.1").unwrap();

    for answer in ["y\n", "YES please\n", "\n"] {
        let mut out = Vec::new();
        assert!(!reset(&fx.paths, &mut Cursor::new(answer), &mut out).unwrap());
        assert!(fx.paths.ledger().exists());
    }

    let mut out = Vec::new();
    assert!(reset(&fx.paths, &mut Cursor::new("yes\n"), &mut out).unwrap());
    assert!(String::from_utf8(out).unwrap().contains("Type 'yes'"));
    assert!(!fx.paths.ledger().exists());
    assert!(!fx.paths.run_state().exists());
    assert!(!fx.paths.position().exists());
    // The target list itself is not state
    assert!(targets.exists());
}

#[test]
fn test_backup_manifest_matches_copies() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:a\n10.0.0.2:b\n");
    fx.write_ledger("10.0.0.1\n");
    RunState::new(&targets, "pw").save(&fx.paths).unwrap();

    let report = backup(&fx.paths, Some(targets.as_path()), Local::now()).unwrap();
    assert_eq!(report.files.len(), 3);

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(report.dir.join(MANIFEST_FILE)).unwrap(),
    )
    .unwrap();
    let files = manifest["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);

    for entry in files {
        let name = entry["name"].as_str().unwrap();
        let copied = std::fs::read(report.dir.join(name)).unwrap();
        let expected = format!("{:x}", Sha256::digest(&copied));
        assert_eq!(entry["sha256"].as_str().unwrap(), expected);
        assert_eq!(entry["size"].as_u64().unwrap(), copied.len() as u64);
    }

    // Backups never overwrite each other
    let second = backup(&fx.paths, Some(targets.as_path()), Local::now()).unwrap();
    assert_ne!(second.dir, report.dir);
}

#[test]
fn test_backup_with_nothing_to_copy() {
    let fx = StateFixture::new();
    assert!(matches!(
        backup(&fx.paths, None, Local::now()),
        Err(RecoveryError::NothingToBackup { .. })
    ));
}
