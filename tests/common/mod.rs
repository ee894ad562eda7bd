//! Common test utilities and helpers
//!
//! Isolated state directories, target files and shell-script testers that
//! stand in for the real credential tool.

#![allow(dead_code)]

use credsweep::app::cli::Settings;
use credsweep::state::StatePaths;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// A temporary state directory plus helpers for the files in it
pub struct StateFixture {
    pub dir: TempDir,
    pub paths: StatePaths,
}

impl StateFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = StatePaths::new(dir.path());
        Self { dir, paths }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a normalized target file and return its path
    pub fn write_targets(&self, contents: &str) -> PathBuf {
        let path = self.root().join("targets.txt");
        std::fs::write(&path, contents).expect("write targets");
        path
    }

    pub fn write_ledger(&self, contents: &str) {
        std::fs::write(self.paths.ledger(), contents).expect("write ledger");
    }

    pub fn ledger_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.paths.ledger())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Files in the state directory whose name starts with `prefix`
    pub fn artifacts(&self, prefix: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(self.root())
            .expect("read state dir")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(prefix))
            })
            .collect();
        found.sort();
        found
    }

    /// Lines appended by a recording tester script
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.calls_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_file(&self) -> PathBuf {
        self.root().join("calls.log")
    }

    /// Executable tester script that logs `target users` to the calls file,
    /// reports `[+]` for each user in `accept`, and then runs `tail`
    #[cfg(unix)]
    pub fn tester_script(&self, accept: &[&str], tail: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let accepted = accept.join(" ");
        let script = format!(
            r#"#!/bin/sh
target="$1"
users="$2"
secret="$3"
echo "$target $users" >> "{calls}"
for u in $(echo "$users" | tr ',' ' '); do
  hit=0
  for a in __none__ {accepted}; do
    [ "$u" = "$a" ] && hit=1
  done
  if [ "$hit" = 1 ]; then
    echo "SSH  $target  22  [+] $u:$secret"
  else
    echo "SSH  $target  22  [-] $u:$secret"
  fi
done
{tail}
"#,
            calls = self.calls_file().display(),
            accepted = accepted,
            tail = tail,
        );
        let path = self.root().join("fake-tester.sh");
        std::fs::write(&path, script).expect("write tester script");
        let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    /// Settings pointing at this fixture: no health checks, no batch delay
    pub fn settings(&self, tester: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.state_dir = self.root().to_path_buf();
        settings.health.enabled = false;
        settings.scan.batch_delay = Duration::ZERO;
        settings.scan.attempt_timeout = Duration::from_secs(2);
        settings.pause_poll = Duration::from_millis(50);
        settings.tester_command = vec![
            tester.display().to_string(),
            "{target}".to_string(),
            "{users}".to_string(),
            "{secret}".to_string(),
        ];
        settings
    }
}
