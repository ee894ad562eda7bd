//! Fresh runs from target file to ledger, transcript and success report

use crate::common::StateFixture;
use credsweep::app::commands::{scan, Launch};
use credsweep::scanner::ScanOutcome;
use credsweep::state::RunState;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_run_processes_every_target_in_order() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice,bob\n10.0.0.2:carol\nweb01.lab:alice\n");
    let tester = fx.tester_script(&["alice"], "");

    let report = scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Fresh {
            target_file: targets,
            secret: "Winter2024".to_string(),
        },
        false,
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, ScanOutcome::Complete);
    assert_eq!(report.invocations, 3);
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.1", "10.0.0.2", "web01.lab"]);
    assert_eq!(
        fx.calls(),
        vec!["10.0.0.1 alice,bob", "10.0.0.2 carol", "web01.lab alice"]
    );

    let successes: Vec<String> = report
        .summary
        .successes
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(successes, vec!["10.0.0.1:alice", "web01.lab:alice"]);
    assert_eq!(report.summary.credentials_attempted, 4);
    assert_eq!(report.summary.targets_attempted, 3);
    assert_eq!(report.summary.failed_batches, 0);

    // Artefacts: success file, transcript, run descriptor; no leftover markers
    let success_files = fx.artifacts("successes_");
    assert_eq!(success_files.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&success_files[0]).unwrap(),
        "10.0.0.1:alice\nweb01.lab:alice\n"
    );
    let logs = fx.artifacts("scan_");
    assert_eq!(logs.len(), 1);
    let transcript = std::fs::read_to_string(&logs[0]).unwrap();
    assert!(transcript.contains("[+] alice:Winter2024"));
    assert!(transcript.contains("Scan complete"));

    let stored = RunState::load(&fx.paths).unwrap().unwrap();
    assert_eq!(stored.secret, "Winter2024");
    assert!(!fx.paths.pause_sentinel().exists());
    assert!(!fx.paths.position().exists());
}

#[tokio::test]
#[serial]
async fn test_credentials_are_batched() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.9:u1,u2,u3,u4,u5,u6,u7\n");
    let tester = fx.tester_script(&["u7"], "");
    let mut settings = fx.settings(&tester);
    settings.scan.batch_size = 3;

    let report = scan(
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

    assert_eq!(
        fx.calls(),
        vec!["10.0.0.9 u1,u2,u3", "10.0.0.9 u4,u5,u6", "10.0.0.9 u7"]
    );
    assert_eq!(report.summary.credentials_attempted, 7);
    assert_eq!(report.summary.success_count(), 1);
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.9"]);
}

#[tokio::test]
#[serial]
async fn test_failed_tester_still_completes_target() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice\n10.0.0.2:bob\n");
    let tester = fx.tester_script(&[], "exit 3");

    let report = scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Fresh {
            target_file: targets,
            secret: "pw".to_string(),
        },
        false,
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, ScanOutcome::Complete);
    assert_eq!(report.summary.failed_batches, 2);
    assert_eq!(report.summary.success_count(), 0);
    assert_eq!(fx.ledger_lines(), vec!["10.0.0.1", "10.0.0.2"]);
    assert!(fx.artifacts("successes_").is_empty());

    let transcript = std::fs::read_to_string(&fx.artifacts("scan_")[0]).unwrap();
    assert!(transcript.contains("FAILED"));
}

#[tokio::test]
#[serial]
async fn test_malformed_target_file_stops_before_any_work() {
    let fx = StateFixture::new();
    let targets = fx.write_targets("10.0.0.1:alice\n10.0.0.1:bob\n");
    let tester = fx.tester_script(&["alice"], "");

    let result = scan(
        &fx.paths,
        &fx.settings(&tester),
        Launch::Fresh {
            target_file: targets,
            secret: "pw".to_string(),
        },
        false,
    )
    .await;

    assert!(result.is_err());
    assert!(fx.calls().is_empty());
    assert!(!fx.paths.ledger().exists());
    assert!(!fx.paths.run_state().exists());
}
