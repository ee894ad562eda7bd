//! Subcommand handlers
//!
//! `run` and `resume` assemble the engine from settings and drive the
//! scheduler; the rest are thin wrappers over the recovery and ingest
//! components that render their results to a writer.

use super::cli::{Command, ConfigError, Settings};
use super::spinner::run_spinner;
use crate::core::error_handling::ContextualError;
use crate::core::styles::StyleRole;
use crate::health::HealthGate;
use crate::ingest::{ingest_file, IngestError};
use crate::ledger::{FileLedger, LedgerError};
use crate::pause::{install_signal_handlers, PauseController, PauseToken};
use crate::recovery::{self, RecoveryError, REMAINING_FILE};
use crate::report::{render_summary, write_success_report, Aggregator, ReportError, RunLog};
use crate::scanner::{
    CommandTester, ScanError, ScanOutcome, ScanReport, ScanState, Scheduler, TesterError,
};
use crate::state::{RunState, StateError, StatePaths};
use crate::targets::{TargetError, TargetList};
use chrono::Local;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Targets(#[from] TargetError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Tester(#[from] TesterError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("No scan to resume in {dir}; start one with 'credsweep run'")]
    NothingToResume { dir: String },

    #[error("{context}: {source}")]
    Output {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    fn output(context: &str, source: std::io::Error) -> Self {
        CommandError::Output {
            context: context.to_string(),
            source,
        }
    }
}

impl ContextualError for CommandError {
    fn is_user_actionable(&self) -> bool {
        match self {
            CommandError::Config(e) => e.is_user_actionable(),
            CommandError::Targets(e) => e.is_user_actionable(),
            CommandError::State(e) => e.is_user_actionable(),
            CommandError::Ledger(e) => e.is_user_actionable(),
            CommandError::Tester(e) => e.is_user_actionable(),
            CommandError::Scan(e) => e.is_user_actionable(),
            CommandError::Report(e) => e.is_user_actionable(),
            CommandError::Recovery(e) => e.is_user_actionable(),
            CommandError::Ingest(e) => e.is_user_actionable(),
            CommandError::NothingToResume { .. } => true,
            CommandError::Output { .. } => false,
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// How a scan is started
#[derive(Debug, Clone, PartialEq)]
pub enum Launch {
    /// Record a new run descriptor, then scan
    Fresh { target_file: PathBuf, secret: String },
    /// Continue from the stored descriptor; a given secret replaces the stored one
    Resume { secret: Option<String> },
}

/// Dispatch one parsed subcommand
pub async fn execute(command: &Command, settings: &Settings, color: bool) -> CommandResult<()> {
    let paths = StatePaths::new(&settings.state_dir);
    log::debug!(
        "Executing '{}' with state directory {}",
        command.name(),
        paths.root().display()
    );

    match command {
        Command::Run {
            target_source,
            secret,
            ..
        } => {
            let launch = Launch::Fresh {
                target_file: target_source.clone(),
                secret: secret.clone(),
            };
            scan(&paths, settings, launch, color).await.map(|_| ())
        }
        Command::Resume { secret, .. } => {
            let launch = Launch::Resume {
                secret: secret.clone(),
            };
            scan(&paths, settings, launch, color).await.map(|_| ())
        }
        Command::Status { targets } => {
            status(&paths, targets.targets.as_deref(), &mut std::io::stdout(), color)
        }
        Command::Remaining { targets, output } => remaining(
            &paths,
            targets.targets.as_deref(),
            output.as_deref(),
            &mut std::io::stdout(),
        )
        .map(|_| ()),
        Command::Verify => verify(&paths, &mut std::io::stdout(), color),
        Command::Reset => reset(
            &paths,
            &mut std::io::stdin().lock(),
            &mut std::io::stdout(),
        )
        .map(|_| ()),
        Command::Backup { targets } => {
            backup(&paths, targets.targets.as_deref(), &mut std::io::stdout()).map(|_| ())
        }
        Command::Ingest { csv, output } => ingest(csv, output.as_deref()),
    }
}

/// Build the engine and process every pending target
pub async fn scan(
    paths: &StatePaths,
    settings: &Settings,
    launch: Launch,
    color: bool,
) -> CommandResult<ScanReport> {
    settings.validate()?;
    paths.ensure_root()?;

    let run_state = match launch {
        Launch::Fresh {
            target_file,
            secret,
        } => {
            let target_file = std::fs::canonicalize(&target_file).unwrap_or(target_file);
            RunState::new(target_file, secret)
        }
        Launch::Resume { secret } => {
            let mut stored =
                RunState::load(paths)?.ok_or_else(|| CommandError::NothingToResume {
                    dir: paths.root().display().to_string(),
                })?;
            if let Some(secret) = secret {
                stored.secret = secret;
            }
            stored
        }
    };

    let targets = TargetList::load(&run_state.target_file)?;
    log::info!(
        "Loaded {} targets ({} credentials) from {}",
        targets.len(),
        targets.credential_count(),
        run_state.target_file.display()
    );

    let tester = CommandTester::new(
        settings.tester_command.clone(),
        &settings.success_pattern,
        settings.threads,
        paths.root(),
    )?;
    let program = tester.check_available()?;
    log::debug!("Using tester {}", program.display());

    run_state.save(paths)?;
    let ledger = FileLedger::open_in(paths)?;

    let token = PauseToken::new();
    let pause = PauseController::new(paths.pause_sentinel(), settings.pause_poll, token.clone());
    if pause.clear_sentinel()? {
        log::info!("Removed pause marker left by an earlier interrupt");
    }
    install_signal_handlers(&token);

    let run_log = RunLog::create(paths.unique_artifact("scan", "log", Local::now()))?;
    if let Some(path) = run_log.path() {
        log::info!("Run log: {}", path.display());
    }
    let aggregator = Aggregator::new(run_log).with_console(color);

    let health = if settings.health.enabled {
        log::info!(
            "Monitoring interface {} (probe {})",
            settings.health.interface,
            settings.health.probe_address
        );
        HealthGate::network(&settings.health)
    } else {
        log::warn!("Network health checks disabled");
        HealthGate::disabled()
    };

    let (state_tx, state_rx) = watch::channel(ScanState::Idle);
    let spinner = tokio::spawn(run_spinner(state_rx, color));

    let mut scheduler = Scheduler::new(settings.scan.clone(), ledger, tester, run_state.secret)
        .with_health(health)
        .with_pause(pause)
        .with_state_paths(paths.clone())
        .with_aggregator(aggregator)
        .with_state_watch(state_tx);
    let result = scheduler.run(&targets).await;
    drop(scheduler);
    let _ = spinner.await;
    let report = result?;

    println!(
        "{}",
        render_summary(&report.summary, report.outcome.label(), color)
    );
    if let Some(path) = write_success_report(&report.summary, paths, Local::now())? {
        println!(
            "Successful credentials written to {}",
            StyleRole::Literal.paint(&path.display().to_string(), color)
        );
    }

    if let ScanOutcome::Interrupted { at_target } = &report.outcome {
        if let Some(id) = at_target {
            println!(
                "Stopped before completing {}",
                StyleRole::Target.paint(id, color)
            );
        }
        println!(
            "Resume with: {}",
            StyleRole::Literal.paint(
                &format!("credsweep --state-dir {} resume", paths.root().display()),
                color
            )
        );
    }
    Ok(report)
}

fn load_targets(paths: &StatePaths, explicit: Option<&Path>) -> CommandResult<TargetList> {
    let target_file = recovery::resolve_target_file(paths, explicit)?;
    Ok(TargetList::load(&target_file)?)
}

pub fn status<W: Write>(
    paths: &StatePaths,
    targets: Option<&Path>,
    out: &mut W,
    color: bool,
) -> CommandResult<()> {
    let targets = load_targets(paths, targets)?;
    let report = recovery::status(paths, &targets)?;
    write!(out, "{}", report.render(color)).map_err(|e| CommandError::output("Writing status", e))
}

pub fn remaining<W: Write>(
    paths: &StatePaths,
    targets: Option<&Path>,
    output: Option<&Path>,
    out: &mut W,
) -> CommandResult<usize> {
    let targets = load_targets(paths, targets)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.root().join(REMAINING_FILE));
    let count = recovery::remaining(paths, &targets, &output)?;
    writeln!(
        out,
        "{} of {} targets remaining, written to {}",
        count,
        targets.len(),
        output.display()
    )
    .map_err(|e| CommandError::output("Writing remaining", e))?;
    Ok(count)
}

pub fn verify<W: Write>(paths: &StatePaths, out: &mut W, color: bool) -> CommandResult<()> {
    let report = recovery::verify(paths)?;
    let err = |e| CommandError::output("Writing verify report", e);

    if report.is_clean() {
        writeln!(out, "{}", StyleRole::Success.paint("Ledger OK", color)).map_err(err)?;
        return Ok(());
    }
    for anomaly in &report.anomalies {
        writeln!(out, "  {}", StyleRole::Failure.paint(&anomaly.to_string(), color))
            .map_err(err)?;
    }
    if report.duplicates_removed > 0 {
        writeln!(
            out,
            "Removed {} duplicate entries",
            report.duplicates_removed
        )
        .map_err(err)?;
    }
    let malformed = report.malformed().count();
    if malformed > 0 {
        writeln!(
            out,
            "{} malformed entries left in place; edit {} to fix them",
            malformed,
            paths.ledger().display()
        )
        .map_err(err)?;
    }
    Ok(())
}

pub fn reset<R: BufRead, W: Write>(
    paths: &StatePaths,
    input: &mut R,
    out: &mut W,
) -> CommandResult<bool> {
    Ok(recovery::reset(paths, input, out)?)
}

pub fn backup<W: Write>(
    paths: &StatePaths,
    targets: Option<&Path>,
    out: &mut W,
) -> CommandResult<PathBuf> {
    // The target list is optional here; a missing run descriptor is not an error
    let target_file = match recovery::resolve_target_file(paths, targets) {
        Ok(path) => Some(path),
        Err(RecoveryError::NoTargetList { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let report = recovery::backup(paths, target_file.as_deref(), Local::now())?;
    writeln!(
        out,
        "Backed up {} files to {}",
        report.files.len(),
        report.dir.display()
    )
    .map_err(|e| CommandError::output("Writing backup report", e))?;
    Ok(report.dir)
}

pub fn ingest(csv: &Path, output: Option<&Path>) -> CommandResult<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .map_err(|e| CommandError::output(&format!("Creating {}", path.display()), e))?;
            let summary = ingest_file(csv, &mut file)?;
            println!(
                "Wrote {} targets ({} accounts from {} rows) to {}",
                summary.targets,
                summary.accounts,
                summary.rows,
                path.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            ingest_file(csv, &mut lock)?;
        }
    }
    Ok(())
}
