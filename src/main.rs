use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::{Cli, Commands};
use treesync::config::{AppConfig, ConfigManager};
use treesync::models::{Direction, TransferEvent, TransferReport};
use treesync::store::RemoteStore;
use treesync::tree::{local_size, TreeWalker};
use treesync::RemoteEntry;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new()?,
    };
    let config = config_manager.load_config()?;

    init_logging(&config, cli.verbose)?;
    debug!("Loaded config from {:?}", config_manager.get_config_path());
    for warning in &config.warnings {
        warn!("{}", warning);
        eprintln!("Warning: {}", warning);
    }

    run(cli, &config)
}

fn init_logging(config: &AppConfig, verbose: bool) -> Result<()> {
    let log_dir = Path::new(&config.log_dir);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // One log file per run
    let log_file = log_dir.join(format!(
        "treesync_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&log_file).context("Failed to create log file")?;

    let level = if verbose { "debug" } else { config.log_level.as_str() };
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("treesync={}", level).parse()?),
        )
        .with_ansi(false)
        .with_writer(file)
        .init();
    Ok(())
}

fn run(cli: Cli, config: &AppConfig) -> Result<ExitCode> {
    if let Commands::Remotes = cli.command {
        for remote in &config.remotes {
            let marker = if remote.name == config.default_remote { "*" } else { " " };
            match remote.build_store() {
                Ok(store) => println!("{} {:<12} {}", marker, remote.name, store.describe()),
                Err(e) => println!("{} {:<12} invalid: {}", marker, remote.name, e),
            }
        }
        return Ok(ExitCode::SUCCESS);
    }
    if let Commands::LocalSize { path } = &cli.command {
        let size = local_size(path).with_context(|| format!("Failed to measure {:?}", path))?;
        println!("{}", size);
        return Ok(ExitCode::SUCCESS);
    }

    let profile = config.remote(cli.remote.as_deref())?;
    let store = profile.build_store()?;
    debug!("Using remote '{}' ({})", profile.name, store.describe());

    let walker = TreeWalker::with_listener(store, |event: &TransferEvent| {
        let arrow = match event.direction {
            Direction::Upload => "->",
            Direction::Download => "<-",
        };
        println!(
            "{} {} {} ({} bytes)",
            event.local_path.display(),
            arrow,
            event.remote_path,
            event.bytes
        );
    });

    match cli.command {
        Commands::Download { remote, local } => {
            let report = walker
                .download_tree(&remote, &local)
                .with_context(|| format!("Failed to download {}", remote))?;
            Ok(summarize(&report))
        }
        Commands::Get { remote, local } => {
            walker
                .download_file(&remote, &local)
                .with_context(|| format!("Failed to download {}", remote))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upload {
            local,
            parent,
            no_overwrite,
        } => {
            if local.is_dir() {
                let report = walker
                    .upload_tree(&local, !no_overwrite, &parent)
                    .with_context(|| format!("Failed to upload {:?}", local))?;
                Ok(summarize(&report))
            } else {
                walker
                    .upload_file(&local, !no_overwrite, &parent)
                    .with_context(|| format!("Failed to upload {:?}", local))?;
                Ok(ExitCode::SUCCESS)
            }
        }
        Commands::List { remote, json } => {
            let entries = walker
                .list_tree(&remote)
                .with_context(|| format!("Failed to list {}", remote))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    match entry {
                        RemoteEntry::Directory { path, .. } => println!("{}/", path),
                        RemoteEntry::File { path, size, .. } => println!("{}\t{}", path, size),
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Size { remote } => {
            let size = walker
                .tree_size(&remote)
                .with_context(|| format!("Failed to measure {}", remote))?;
            println!("{}", size);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Modified { remote } => {
            let modified = walker
                .last_modified(&remote)
                .with_context(|| format!("Failed to read modification time of {}", remote))?;
            match modified {
                Some(modified) => println!("{}", modified.to_rfc3339()),
                None => println!("-"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Mkdir { remote } => {
            walker
                .create_folder(&remote)
                .with_context(|| format!("Failed to create {}", remote))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remotes | Commands::LocalSize { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn summarize(report: &TransferReport) -> ExitCode {
    println!(
        "{} transferred ({} bytes), {} skipped, {} failed",
        report.transferred.len(),
        report.bytes,
        report.skipped.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("Error: {}: {}", failure.path, failure.error);
    }
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
