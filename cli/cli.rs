mod cli_args;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log;
use std::path::PathBuf;
use std::process;

use cli_args::Cli;
use ctxcat_core::{AppError, Config, ExtensionSet, ProjectConfig, ScanRequest, run_scan};

/// Scan finished but some files could not be included.
const EXIT_ITEM_ERRORS: i32 = 3;

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);
    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(&cli_args) {
        Ok(code) => {
            log::info!("Application finished with code {}.", code);
            code
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::ScanRoot { .. }) => 2,
                Some(AppError::Walk(_)) => 2,
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::FileRead { .. }) => 1,
                Some(AppError::FileWrite { .. }) => 1,
                Some(AppError::Glob(_)) => 1,
                Some(AppError::InvalidArgument(_)) => 1,
                Some(_) => 1,
                None => 1,
            };

            if !quiet {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: &Cli) -> Result<i32> {
    let cwd = Config::determine_cwd().context("Failed to determine current directory")?;
    let config = Config::load(cli.config.config.as_deref(), cli.config.no_config)
        .context("Failed to load configuration")?;
    let project = ProjectConfig::load(&cwd).context("Failed to load project settings")?;

    let config = merge_config_with_cli_overrides(config, cli);
    let root = Config::determine_scan_root(cli.dir.as_deref(), &cwd);
    let request = build_scan_request(&config, project.as_ref(), root, cwd, cli);
    log::debug!("Scan request: {:?}", request);

    let report = run_scan(&request).context("Failed to prepare scan")?;

    // The stream is written even when the walk failed so manual files reach the user.
    output::write_stream(&report.output, cli.output.output.as_deref(), cli.quiet)?;
    if let Some(path) = &cli.output.report {
        output::write_report(&report.result, path, cli.quiet)?;
    }
    if !cli.quiet {
        output::print_summary(&report.result, cli.output.show_excluded);
    }
    log::debug!("Excluded directories: {}", report.excluded_dirs.len());

    if let Some(fatal) = report.fatal {
        return Err(anyhow::Error::new(fatal).context("Scan aborted"));
    }
    if report.result.has_errors() {
        log::warn!("{} files could not be included", report.result.errors.len());
        return Ok(EXIT_ITEM_ERRORS);
    }
    Ok(0)
}

fn merge_config_with_cli_overrides(mut config: Config, cli: &Cli) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if cli.filters.no_gitignore {
        config.general.use_gitignore = false;
    }
    if cli.filters.gitignore {
        config.general.use_gitignore = true;
    }
    config
        .filters
        .exclude_basenames
        .extend(cli.filters.exclude_name.iter().cloned());
    if let Some(header) = &cli.output.header {
        config.output.header = header.clone();
    }
    if let Some(marker) = &cli.output.marker {
        config.output.marker = marker.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// CLI extensions beat the project file, which beats the global config.
/// CLI `--exclude` globs follow the project's.
fn build_scan_request(
    config: &Config,
    project: Option<&ProjectConfig>,
    root: PathBuf,
    cwd: PathBuf,
    cli: &Cli,
) -> ScanRequest {
    let mut request = config.scan_request(project, root, cwd);
    if !cli.filters.extensions.is_empty() {
        request.extensions = ExtensionSet::new(&cli.filters.extensions);
    }
    request
        .cwd_patterns
        .extend(cli.filters.exclude.iter().cloned());
    request.manual_paths = cli.files.clone();
    // Listing excluded files needs the walk to see them.
    request.prune_excluded_dirs = !cli.output.show_excluded && cli.output.report.is_none();
    request
}
