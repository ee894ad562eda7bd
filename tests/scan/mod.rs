//! Scan integration tests
//!
//! These drive `commands::scan` with a shell-script tester, so they only run
//! on unix. They are serialized because starting a scan installs process-wide
//! signal handlers.

#[cfg(unix)]
mod full_run;
#[cfg(unix)]
mod resume;
