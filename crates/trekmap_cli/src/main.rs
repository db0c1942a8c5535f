//! Command-line map scanner.
//!
//! # Responsibility
//! - Run one registry scan over the given roots and print what was found.
//! - Keep output line-oriented so it can be piped into other tools.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use trekmap_core::{default_log_level, init_logging, MapRegistry, ScanConfig, ScanOutcome};

#[derive(Parser)]
#[command(name = "trekmap")]
#[command(about = "Scan directories for calibrated maps and list them")]
#[command(version)]
struct Cli {
    /// Scan configuration (JSON). Positional roots replace its roots.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directories to scan.
    roots: Vec<PathBuf>,
}

fn run(cli: Cli) -> Result<bool, String> {
    if let Some(log_dir) = &cli.log_dir {
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", log_dir.display()))?;
        init_logging(default_log_level(), log_dir)?;
    }

    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => ScanConfig::default(),
    };
    if !cli.roots.is_empty() {
        config.roots = cli.roots;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let registry =
        MapRegistry::new(config, runtime.handle().clone()).map_err(|err| err.to_string())?;

    let report = runtime
        .block_on(registry.trigger_scan())
        .map_err(|err| format!("scan task failed: {err}"))?;
    if let ScanOutcome::Installed { maps, skipped } = report.outcome {
        log::info!("event=cli_scan module=cli status=ok maps={maps} skipped={skipped}");
    }

    let maps = registry.maps();
    for map in maps.iter() {
        println!(
            "{}\t{}\t{}",
            map.calibration_status().as_str(),
            map.name(),
            map.root_path().display()
        );
    }
    Ok(!maps.is_empty())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("no maps found");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
