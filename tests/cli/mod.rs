//! CLI and configuration tests
//!
//! Configuration files on disk combined with parsed command lines.

use clap::Parser;
use credsweep::app::cli::{Args, Command, ConfigError, Settings};
use std::path::PathBuf;
use std::time::Duration;

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("credsweep.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_config_file_then_cli_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
        log-level = "warn"

        [scan]
        batch-size = 4
        batch-delay-secs = 3
        state-dir = "/srv/sweep"

        [health]
        interface = "tun9"
        check-interval-secs = 60

        [tester]
        command = ["hydra", "-L", "{users_file}", "-p", "{secret}", "ssh://{target}"]
        success-pattern = "login:"
        "#,
    );

    let args = Args::try_parse_from([
        "credsweep",
        "-c",
        config.to_str().unwrap(),
        "run",
        "targets.txt",
        "pw",
        "--batch-delay",
        "0",
        "--threads",
        "2",
    ])
    .unwrap();
    assert!(matches!(args.command, Command::Run { .. }));

    let mut settings = Settings::load(args.config_file.as_deref()).await.unwrap();
    settings.apply_overrides(&args);
    settings.validate().unwrap();

    assert_eq!(settings.scan.batch_size, 4);
    assert_eq!(settings.scan.batch_delay, Duration::ZERO);
    assert_eq!(settings.state_dir, PathBuf::from("/srv/sweep"));
    assert_eq!(settings.health.interface, "tun9");
    assert_eq!(settings.health.check_interval, Duration::from_secs(60));
    assert!(settings.health.enabled);
    assert_eq!(settings.tester_command[0], "hydra");
    assert_eq!(settings.success_pattern, "login:");
    assert_eq!(settings.threads, 2);
    assert_eq!(settings.log_level.as_deref(), Some("warn"));
}

#[tokio::test]
async fn test_invalid_config_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[scan]\nbatch-size = 0\n");

    let settings = Settings::load(Some(config.as_path())).await.unwrap();
    match settings.validate() {
        Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "batch-size"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = Settings::load(Some(missing.as_path())).await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_offline_commands_parse() {
    for argv in [
        vec!["credsweep", "status"],
        vec!["credsweep", "status", "--targets", "t.txt"],
        vec!["credsweep", "remaining", "-O", "left.txt"],
        vec!["credsweep", "verify"],
        vec!["credsweep", "reset"],
        vec!["credsweep", "backup"],
        vec!["credsweep", "ingest", "export.csv", "targets.txt"],
    ] {
        let args = Args::try_parse_from(&argv).unwrap();
        assert!(args.command.scan_overrides().is_none(), "{:?}", argv);
    }
}
