//! # fsbridge CLI
//!
//! Probes and differential filesystem tests driven through the fsbridge
//! open/fcntl shim.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fsbridge_config::logging::init_logging;
use fsbridge_config::{log_cli_error, log_cli_info, Config};
use tracing::field::display;

mod behavior;
mod probe;
mod report;

/// fsbridge - fixed-arity open/fcntl bridge and filesystem behaviour tools
#[derive(Parser)]
#[command(name = "fsbridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every bridge entry point against a scratch directory
    Probe {
        /// Directory to probe in (defaults to behavior.test_root, then the temp dir)
        #[arg(value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// Apply random command sequences to a file in two directories and compare
    Compare {
        #[arg(value_name = "DIR1")]
        left: PathBuf,

        #[arg(value_name = "DIR2")]
        right: PathBuf,

        /// Maximum file size a sequence may produce, in MiB
        #[arg(long, env = "FSBRIDGE_MAX_FILE_SIZE_MB")]
        max_file_size_mb: Option<usize>,

        /// Number of random sequences to run
        #[arg(short = 'n', long)]
        tests: Option<u64>,
    },

    /// Replay captured regression sequences against two directories
    Regressions {
        #[arg(value_name = "DIR1")]
        left: PathBuf,

        #[arg(value_name = "DIR2")]
        right: PathBuf,
    },

    /// Tabulate conformance-suite JSON results, one file per filesystem
    Report {
        #[arg(value_name = "RESULTS_DIR")]
        results: PathBuf,

        #[arg(long, value_enum, default_value_t)]
        format: report::Format,

        /// Exit non-zero when any test failed on any filesystem
        #[arg(long)]
        strict: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file locations
    Path,
}

fn main() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: ignoring unreadable config: {e}");
        Config::default()
    });
    init_logging(config.logging.level.raised(cli.verbose));

    match run(cli.command, &config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log_cli_error!("Command failed", error = display(format!("{e:#}")));
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found failures.
fn run(command: Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Probe { directory } => {
            let root = directory
                .or_else(|| config.behavior.test_root.clone())
                .unwrap_or_else(std::env::temp_dir);
            let report = probe::run(&root)?;
            Ok(report.ok())
        }
        Commands::Compare {
            left,
            right,
            max_file_size_mb,
            tests,
        } => {
            let mb = max_file_size_mb.unwrap_or(config.behavior.max_file_size_mb);
            let tests = tests.unwrap_or(config.behavior.quickcheck_tests);
            behavior::set_max_file_size_mb(mb)?;

            let passed = behavior::compare(&left, &right, tests)?;
            log_cli_info!("Compare finished", passed = passed);
            eprintln!("\n{passed} sequences agreed. Success!");
            Ok(true)
        }
        Commands::Regressions { left, right } => {
            let replayed = behavior::replay_regressions(&left, &right)?;
            eprintln!("\n{replayed} regressions replayed. Success!");
            Ok(true)
        }
        Commands::Report {
            results,
            format,
            strict,
        } => {
            let report = report::Report::load(&results)?;
            print!("{}", report.render(format));
            Ok(!(strict && report.has_failures()))
        }
        Commands::Config { command } => {
            match command {
                ConfigCommands::Show => {
                    let toml = toml_string(config)?;
                    print!("{toml}");
                }
                ConfigCommands::Path => {
                    match Config::global_config_path() {
                        Some(path) => println!("Global:  {}", path.display()),
                        None => println!("Global:  (no home directory)"),
                    }
                    println!("Project: {}", Path::new(".fsbridge/config.toml").display());
                }
            }
            Ok(true)
        }
    }
}

fn toml_string(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("failed to serialize config")
}
