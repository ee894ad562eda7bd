//! Recovery tooling over real state directories

mod maintenance;
mod progress;
