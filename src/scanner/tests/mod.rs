//! Test modules for the scan engine
//!
//! Scheduler suites run against in-memory fakes: a recording tester, a
//! scripted health check and the memory ledger.

pub mod helpers;
