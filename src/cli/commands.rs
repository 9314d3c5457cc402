//! Command implementations for the CLI
//!
//! All functions return `CliResult<T>` for proper error handling.
//! The top-level `run()` function in mod.rs handles errors and exits.

use std::io;
use std::path::{Path, PathBuf};

use super::{CliError, CliResult, ExitCode, ReportFormat, ScanArgs};
use crate::config::{DEFAULT_CONFIG_FILE, DEFAULT_SPECS_PATTERN, ScanConfig};
use crate::engine::{Engine, RunReport};
use crate::strategies::{ConsoleReporter, JsonBuildStrategy, JsonLinesReporter};

/// Build the scan configuration from an optional config file and flag overrides.
///
/// `--config` must exist when given. Without it, `guit.json` in the working directory is
/// used when present. Flags win over file values.
pub fn load_config(args: &ScanArgs) -> CliResult<ScanConfig> {
    let file = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut config = match file {
        Some(path) => {
            tracing::debug!(config = %path.display(), "loading config file");
            ScanConfig::from_json_file(&path).map_err(|e| CliError::failure(format!("error: {e}")))?
        }
        None => ScanConfig::new(DEFAULT_SPECS_PATTERN),
    };

    if let Some(specs) = &args.specs {
        config.specs = specs.clone();
    }
    if let Some(helpers) = &args.helpers {
        config.helpers = Some(helpers.clone());
    }
    if let Some(root) = &args.root {
        config.root = Some(root.clone());
    }

    config
        .validate()
        .map_err(|e| CliError::failure(format!("error: {e}")))?;
    Ok(config)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("error: failed to start async runtime: {e}")))
}

/// Run one spec file, or all discovered spec files, and report the traversal.
///
/// Exits with failure when any file could not be built.
pub fn run_tests(file: Option<&Path>, args: &ScanArgs, format: ReportFormat, color: bool) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    // Resolve against the working directory, not the config root.
    let file = file
        .map(std::path::absolute)
        .transpose()
        .map_err(|e| CliError::failure(format!("error: {e}")))?;

    let mut engine = Engine::default().with_config(config);
    engine.builder(JsonBuildStrategy);
    match format {
        ReportFormat::Console => engine.reporter(ConsoleReporter::stderr(color)),
        ReportFormat::Jsonl => engine.reporter(JsonLinesReporter::new(io::stdout())),
    };

    let report = runtime()?
        .block_on(async {
            match &file {
                Some(path) => engine.test(path).await,
                None => engine.test_all().await,
            }
        })
        .map_err(CliError::diagnostic)?;

    print_failures(&report);
    Ok(if report.build_failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_failures(report: &RunReport) {
    for failure in &report.build_failures {
        eprintln!("error: {failure}");
    }
    for failure in &report.report_failures {
        eprintln!(
            "warning: reporter `{}` failed on {}: {}",
            failure.reporter, failure.event, failure.error
        );
    }
}

/// Print the discovered helper and spec files, one per line.
pub fn list_files(args: &ScanArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let mut engine = Engine::default();
    let scanned = runtime()?
        .block_on(async { engine.scan(config).await.cloned() })
        .map_err(CliError::diagnostic)?;

    for helper in &scanned.helpers {
        println!("helper {}", helper.display());
    }
    for spec in &scanned.specs {
        println!("spec   {}", spec.display());
    }
    Ok(ExitCode::SUCCESS)
}
