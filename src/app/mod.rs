//! Application module

pub mod cli;
pub mod commands;
pub mod spinner;
pub mod startup;
