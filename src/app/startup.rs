//! Application startup: arguments, configuration, logging, then dispatch

use super::cli::{Args, Settings};
use super::commands::execute;
use crate::core::error_handling::{fatal_message, log_error_with_context};
use crate::core::logging::{effective_level, init_logging};
use crate::core::styles::palette_to_clap;
use clap::{CommandFactory, FromArgMatches};
use std::io::IsTerminal;

/// Run the application; returns the process exit code
pub fn startup() -> i32 {
    let args = parse_args();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return 1;
        }
    };
    runtime.block_on(run(args))
}

/// Parse the command line; usage errors exit with status 2, help with 0
fn parse_args() -> Args {
    let help_color = !std::env::args().any(|a| a == "--no-color") && std::io::stdout().is_terminal();
    let matches = Args::command()
        .styles(palette_to_clap(help_color))
        .get_matches();
    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

async fn run(args: Args) -> i32 {
    let mut settings = match Settings::load(args.config_file.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", fatal_message(&e, "Loading configuration"));
            return 1;
        }
    };
    settings.apply_overrides(&args);
    let color = settings.use_color();

    let verbosity = (args.verbose.min(5) as i8) - (args.quiet.min(5) as i8);
    let level = effective_level(settings.log_level.as_deref().unwrap_or("info"), verbosity);
    let log_file = settings
        .log_file
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    if let Err(e) = init_logging(
        Some(level),
        settings.log_format.as_deref(),
        log_file.as_deref(),
        color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return 1;
    }

    log::debug!(
        "credsweep {} ({}, built {}) starting '{}'",
        env!("CARGO_PKG_VERSION"),
        crate::GIT_HASH,
        crate::BUILD_TIME,
        args.command.name()
    );
    log::trace!("Settings: {:#?}", settings);

    match execute(&args.command, &settings, color).await {
        Ok(()) => 0,
        Err(e) => {
            let context = format!("Running '{}'", args.command.name());
            log_error_with_context(&e, &context);
            // File-only logging would otherwise leave the terminal silent
            if log_file.is_some() {
                eprintln!("Error: {}", fatal_message(&e, &context));
            }
            1
        }
    }
}
