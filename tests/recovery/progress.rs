//! `status` and `remaining` against ledgers written by hand and by ingest

use crate::common::StateFixture;
use credsweep::ingest::ingest_file;
use credsweep::recovery::{remaining, resolve_target_file, status, RecoveryError};
use credsweep::state::{write_position, RunState};
use credsweep::targets::TargetList;

#[test]
fn test_status_reflects_ledger_and_markers() {
    let fx = StateFixture::new();
    let targets_file = fx.write_targets("10.0.0.1:a\n10.0.0.2:b\n10.0.0.3:c\n10.0.0.4:d\n");
    fx.write_ledger("10.0.0.1\n10.0.0.3\n");
    write_position(&fx.paths, "10.0.0.2").unwrap();
    std::fs::write(fx.paths.pause_sentinel(), b"").unwrap();

    let targets = TargetList::load(&targets_file).unwrap();
    let report = status(&fx.paths, &targets).unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.completed, 2);
    assert_eq!(report.pending, vec!["10.0.0.2", "10.0.0.4"]);
    assert_eq!(report.percent_complete(), 50.0);
    assert!(report.paused);
    assert_eq!(report.position.as_deref(), Some("10.0.0.2"));

    let rendered = report.render(false);
    assert!(rendered.contains("paused (marker present)"));
    assert!(rendered.contains("10.0.0.4"));
}

#[test]
fn test_target_file_falls_back_to_run_state() {
    let fx = StateFixture::new();
    assert!(matches!(
        resolve_target_file(&fx.paths, None),
        Err(RecoveryError::NoTargetList { .. })
    ));

    let targets_file = fx.write_targets("10.0.0.1:a\n");
    RunState::new(&targets_file, "pw").save(&fx.paths).unwrap();
    assert_eq!(resolve_target_file(&fx.paths, None).unwrap(), targets_file);
}

#[test]
fn test_remaining_after_ingest() {
    let fx = StateFixture::new();
    let csv = fx.root().join("export.csv");
    std::fs::write(
        &csv,
        "IP,DNS,Results\n\
         10.0.0.20,b,\"root\nsvc_backup\"\n\
         10.0.0.3,a,\"Username\\nadmin\"\n\
         10.0.0.20,b,\"root\noracle\"\n",
    )
    .unwrap();

    let targets_file = fx.root().join("targets.txt");
    let mut out = std::fs::File::create(&targets_file).unwrap();
    let summary = ingest_file(&csv, &mut out).unwrap();
    drop(out);
    assert_eq!(summary.targets, 2);
    assert_eq!(summary.accounts, 4);

    let targets = TargetList::load(&targets_file).unwrap();
    let ids: Vec<&str> = targets.ids().collect();
    assert_eq!(ids, vec!["10.0.0.3", "10.0.0.20"]);

    fx.write_ledger("10.0.0.3\n");
    let output = fx.root().join("left.txt");
    assert_eq!(remaining(&fx.paths, &targets, &output).unwrap(), 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "10.0.0.20:root,svc_backup,oracle\n"
    );
}
