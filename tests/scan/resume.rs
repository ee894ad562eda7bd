//! Resuming from the stored run descriptor and an existing ledger

use crate::common::StateFixture;
use credsweep::app::commands::{scan, CommandError, Launch};
use credsweep::scanner::ScanOutcome;
use credsweep::state::RunState;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn test_completed_targets_are_never_retested() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice\n10.0.0.2:bob\n10.0.0.3:carol\n");
    fx.write_ledger("10.0.0.1\n");
    let tester = fx.tester_script(&["bob"], "");
    let settings = fx.settings(&tester);

    let first = scan(
        &fx.paths,
        &settings,
        Launch::Fresh {
            target_file: targets,
            secret: "pw".to_string(),
        },
        false,
    )
    .await
    .unwrap();
    assert_eq!(first.summary.targets_skipped, 1);
    assert_eq!(fx.calls(), vec!["10.0.0.2 bob", "10.0.0.3 carol"]);

    // A second pass over a finished list does nothing
    let second = scan(&fx.paths, &settings, Launch::Resume { secret: None }, false)
        .await
        .unwrap();
    assert_eq!(second.outcome, ScanOutcome::Complete);
    assert_eq!(second.invocations, 0);
    assert_eq!(second.summary.targets_skipped, 3);
    assert_eq!(fx.calls().len(), 2);
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
}

#[tokio::test]
#[serial]
async fn test_resume_uses_stored_target_file_and_secret() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice\n10.0.0.2:bob\n");
    fx.write_ledger("10.0.0.1\n");
    RunState::new(&targets, "Stored1").save(&fx.paths).unwrap();
    let tester = fx.tester_script(&["bob"], "");

    let report = scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Resume { secret: None },
        false,
    )
    .await
    .unwrap();

    assert_eq!(fx.calls(), vec!["10.0.0.2 bob"]);
    let transcript = std::fs::read_to_string(&fx.artifacts("scan_")[0]).unwrap();
    assert!(transcript.contains("[+] bob:Stored1"));
    assert_eq!(report.summary.success_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_resume_secret_overrides_stored() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.2:bob\n");
    RunState::new(&targets, "Stored1").save(&fx.paths).unwrap();
    let tester = fx.tester_script(&["bob"], "");

    scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Resume {
            secret: Some("Override2".to_string()),
        },
        false,
    )
    .await
    .unwrap();

    let transcript = std::fs::read_to_string(&fx.artifacts("scan_")[0]).unwrap();
    assert!(transcript.contains("[+] bob:Override2"));
    assert!(!transcript.contains("Stored1"));
}

#[tokio::test]
#[serial]
async fn test_resume_clears_marker_left_by_interrupt() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice\n");
    RunState::new(&targets, "pw").save(&fx.paths).unwrap();
    std::fs::write(fx.paths.pause_sentinel(), b"").unwrap();
    let tester = fx.tester_script(&[], "");

    // Without the cleanup this would wait on the marker forever
    let report = tokio::time::timeout(
        Duration::from_secs(30),
        scan(
            &fx.paths,
            &fx.settings(&tester),
            Launch::Resume { secret: None },
            false,
        ),
    )
    .await
    .expect("resume should not block on a stale marker")
    .unwrap();

    assert_eq!(report.outcome, ScanOutcome::Complete);
    assert!(!fx.paths.pause_sentinel().exists());
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.1"]);
}

#[tokio::test]
#[serial]
async fn test_resume_without_prior_run() {
    let fx = StateFixture::new();
    let tester = fx.tester_script(&[], "");

    let err = scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Resume { secret: None },
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CommandError::NothingToResume { .. }));
}
