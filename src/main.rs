use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info};

use seqstim::cli::{Args, Command};
use seqstim::config;
use seqstim::entities::MarkerTable;
use seqstim::entities::sequence::validate_seq_file;
use seqstim::runner;

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;

    info!("seqstim v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        config::config_file(config::CONFIG_FILE, &path_config).display()
    );

    match &args.command {
        Command::Run(run_args) => {
            let summary = runner::run_feedback(run_args, &path_config)?;
            info!(
                "Finished: {} ticks, {} blocks completed",
                summary.ticks, summary.blocks_completed
            );
        }
        Command::Validate { files, markers } => {
            let table = match markers {
                Some(path) => MarkerTable::load(path)
                    .with_context(|| format!("Failed to load marker table {}", path.display()))?,
                None => MarkerTable::new(),
            };

            let mut errors = 0;
            for file in files {
                match validate_seq_file(file, &table) {
                    Ok(issues) => {
                        for issue in &issues {
                            println!("{}", issue);
                        }
                        errors += issues.iter().filter(|i| i.is_error()).count();
                        if issues.is_empty() {
                            println!("{} OK", file.display());
                        }
                    }
                    Err(e) => {
                        error!("{}", e);
                        println!("{} ERROR: {}", file.display(), e);
                        errors += 1;
                    }
                }
            }

            if errors > 0 {
                anyhow::bail!("{} error(s) in {} sequence file(s)", errors, files.len());
            }
        }
    }

    Ok(())
}

/// Initialize env_logger from verbosity and `--log`
fn init_logging(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("seqstim.log", path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}
