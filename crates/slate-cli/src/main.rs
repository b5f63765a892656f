mod sim;

use std::path::{Path, PathBuf};

use slate_core::models::RunSummary;
use slate_core::services::{config_loader, RunOrchestrator, RunStateStore};

use crate::sim::{SimulatedMotion, SimulatedVision};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let _guard = if debug {
        Some(setup_debug_logging())
    } else {
        None
    };

    match args.first().map(String::as_str) {
        Some("run") => cmd_run(&args).await,
        Some("resume") => cmd_resume(&args).await,
        Some("status") => cmd_status(&args).await,
        Some("runs") => cmd_runs(&args).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// Configure file-based tracing to `.slate-debug.log` in CWD.
/// Returns the guard that must be held alive for the duration of the program.
fn setup_debug_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", ".slate-debug.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .init();

    guard
}

fn print_usage() {
    println!(
        "usage:\n  \
         slate run    [--layout <file>] [--params <file>] [--plate <id>]... [--state-dir <dir>] [--debug]\n  \
         slate resume <run-id> [--layout <file>] [--params <file>] [--state-dir <dir>] [--debug]\n  \
         slate status <run-id> [--state-dir <dir>]\n  \
         slate runs   [--state-dir <dir>]"
    );
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn flag_values(args: &[String], name: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            if let Some(value) = iter.next() {
                values.push(value.clone());
            }
        }
    }
    values
}

fn state_dir(args: &[String]) -> PathBuf {
    flag_value(args, "--state-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".slate/runs"))
}

/// Build an orchestrator over the simulated collaborators. Also returns
/// the layout's plate ids so `run` can default to all of them.
fn build_orchestrator(
    args: &[String],
) -> color_eyre::Result<(RunOrchestrator<SimulatedVision, SimulatedMotion>, Vec<String>)> {
    let layout_path = flag_value(args, "--layout").unwrap_or_else(|| "baseplate.yaml".into());
    let params_path = flag_value(args, "--params").unwrap_or_else(|| "slate-params.yaml".into());

    let layout = config_loader::load_layout(Path::new(&layout_path))?;
    let params = config_loader::load_params(Path::new(&params_path))?;
    let all_plates: Vec<String> = layout.plates.iter().map(|p| p.id.clone()).collect();

    let vision = SimulatedVision::new(&layout, 12);
    let driver = SimulatedMotion::new(25);
    let orchestrator = RunOrchestrator::new(layout, params, vision, driver, &state_dir(args))?;
    Ok((orchestrator, all_plates))
}

/// Forward Ctrl-C to the orchestrator's stop handle. The run aborts only
/// after the in-flight motion command finishes.
fn install_stop_signal(orchestrator: &RunOrchestrator<SimulatedVision, SimulatedMotion>) {
    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("stop requested; waiting for the in-flight command to finish");
            stop.request_stop();
        }
    });
}

async fn cmd_run(args: &[String]) -> color_eyre::Result<()> {
    let (mut orchestrator, all_plates) = build_orchestrator(args)?;
    install_stop_signal(&orchestrator);

    let mut plate_ids = flag_values(args, "--plate");
    if plate_ids.is_empty() {
        plate_ids = all_plates;
    }
    let summary = orchestrator.start_run(&plate_ids).await?;
    print_summary(&summary);
    Ok(())
}

async fn cmd_resume(args: &[String]) -> color_eyre::Result<()> {
    let Some(run_id) = args.get(1).filter(|a| !a.starts_with("--")) else {
        print_usage();
        return Ok(());
    };

    let (mut orchestrator, _) = build_orchestrator(args)?;
    install_stop_signal(&orchestrator);

    let summary = orchestrator.resume_run(run_id).await?;
    print_summary(&summary);
    Ok(())
}

async fn cmd_status(args: &[String]) -> color_eyre::Result<()> {
    let Some(run_id) = args.get(1).filter(|a| !a.starts_with("--")) else {
        print_usage();
        return Ok(());
    };

    let store = RunStateStore::new(&state_dir(args));
    let summary = store.load(run_id).await?.summary();
    print_summary(&summary);
    Ok(())
}

async fn cmd_runs(args: &[String]) -> color_eyre::Result<()> {
    let store = RunStateStore::new(&state_dir(args));
    for run_id in store.list().await? {
        println!("{run_id}");
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let c = &summary.counters;
    println!("run:        {}", summary.run_id);
    println!("phase:      {:?}", summary.phase);
    println!(
        "tasks:      {} total / {} succeeded / {} failed / {} skipped / {} pending",
        c.total, c.succeeded, c.failed, c.skipped, c.pending
    );
    if summary.unadmitted > 0 {
        println!("unadmitted: {} (baseplate exhausted)", summary.unadmitted);
    }
}
