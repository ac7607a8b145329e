//! muxrun CLI entry point

use anyhow::Result;
use clap::{ArgAction, Parser};
use muxrun::{
    CancellationToken, CommandSpec, Config, EventHub, EventKind, MuxError, Outcome, RunEvent,
    Scheduler, TerminalSurface,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Run several processes side by side with labelled, timestamped output
#[derive(Debug, Parser)]
#[command(name = "muxrun", version, about)]
struct Cli {
    /// Process file (defaults to ./muxrun.yml, then the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Extra process to run, as LABEL=COMMAND (repeatable)
    #[arg(short = 'p', long = "process", value_name = "LABEL=COMMAND")]
    processes: Vec<String>,

    /// Width of the label column (1-25)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    prefix_column_size: Option<i64>,

    /// Keep the session open after every process has ended or failed
    #[arg(long)]
    keep_running: bool,

    /// Cancel every process after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Never colour the output
    #[arg(long)]
    no_color: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None if cli.processes.is_empty() => Config::auto_load()?,
        None => Config::default(),
    };

    for arg in &cli.processes {
        config.processes.push(CommandSpec::parse_arg(arg)?);
    }
    if let Some(width) = cli.prefix_column_size {
        config.options.prefix_column_size = Some(width);
    }
    if cli.keep_running {
        config.options.keep_running_after_processes_resolve = true;
    }
    if config.processes.is_empty() {
        return Err(MuxError::NoProcesses.into());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("muxrun v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let descriptors = config
        .processes
        .into_iter()
        .map(CommandSpec::into_descriptor)
        .collect();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted, stopping processes");
                cancel.cancel();
            }
        });
    }
    if let Some(secs) = cli.timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::info!("Timeout of {}s reached, stopping processes", secs);
            cancel.cancel();
        });
    }

    let events = EventHub::new();
    let failures = Arc::new(AtomicUsize::new(0));
    let failure_count = failures.clone();
    let _disposer = events.on(EventKind::ProcessSettled, move |event| {
        if let RunEvent::ProcessSettled { error: Some(_), .. } = event {
            failure_count.fetch_add(1, Ordering::Relaxed);
        }
    });

    let surface = TerminalSurface::stdout();
    let surface = if cli.no_color {
        surface.styled(false)
    } else {
        surface
    };
    let handle = Scheduler::new(surface)
        .with_options(config.options)
        .with_events(events)
        .run(descriptors, cancel.clone());

    let finished = tokio::select! {
        result = handle.wait() => Some(result),
        _ = cancel.cancelled() => None,
    };

    if let Some(Err(err)) = &finished {
        log::info!("{} failed, stopping remaining processes", err.label());
        cancel.cancel();
    }

    // Everything has been asked to stop; a second interrupt skips the wait.
    let outcome = if matches!(finished, Some(Ok(()))) {
        handle.outcome()
    } else {
        tokio::select! {
            outcome = handle.settled() => outcome,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted again, exiting without waiting");
                return Ok(ExitCode::from(130));
            }
        }
    };

    log::info!(
        "Run {}: {} process failures",
        outcome.name(),
        failures.load(Ordering::Relaxed)
    );

    match outcome {
        Outcome::Rejected(err) => {
            eprintln!("{}", err);
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}
