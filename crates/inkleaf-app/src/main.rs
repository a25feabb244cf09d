//! Main application entry point (native).
//!
//! `inkleaf <script.json> [--config <file>] [--out <dir>]`

use inkleaf_app::{AppConfig, AppError, AppResult, Session};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug)]
struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> AppResult<Args> {
    let usage = || AppError::Usage("inkleaf <script.json> [--config <file>] [--out <dir>]".to_string());
    let mut script = None;
    let mut config = None;
    let mut out = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            "--out" => out = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            _ if script.is_none() && !arg.starts_with("--") => script = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    Ok(Args {
        script: script.ok_or_else(usage)?,
        config,
        out,
    })
}

fn run() -> AppResult<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(out) = args.out {
        config.output_dir = out;
    }

    let script = std::fs::read_to_string(&args.script)?;
    let mut session = Session::new(&config)?;
    session.run_script(&script)?;
    let report = session.finish()?;

    log::info!(
        "session finished: {} commands, {} snapshots",
        report.commands,
        report.snapshots.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting Inkleaf");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("inkleaf: {e}");
            ExitCode::FAILURE
        }
    }
}
