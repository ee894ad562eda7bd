pub mod app;
pub mod core;
pub mod health;
pub mod ingest;
pub mod ledger;
pub mod pause;
pub mod recovery;
pub mod report;
pub mod scanner;
pub mod state;
pub mod targets;

include!(concat!(env!("OUT_DIR"), "/version.rs"));
