//! Command-line interface for npkg.
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::constants::DEFAULT_LOG_LINES;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let level = match lowercase.as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for npkg.
#[derive(Parser)]
#[command(name = "npkg", version, author)]
#[command(about = "Resolve, run and supervise packaged services", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Supervisor host (overrides `HOST`).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Supervisor port (overrides `PORT`).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Print supervisor requests instead of sending them.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Fail when a config value references an unknown `%{token}`.
    #[arg(long, global = true)]
    pub strict: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Selects a supervised job.
#[derive(Args, Debug, Clone)]
pub struct JobTarget {
    /// Package reference (relative path or installed name).
    pub package: String,

    /// Treat the argument as a raw job key, as printed by `list`.
    #[arg(long)]
    pub key: bool,
}

/// Available commands for npkg.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a package in the foreground with this terminal attached.
    Run {
        /// Package reference (relative path or installed name).
        package: String,
    },

    /// Submit a package to the supervisor.
    Start {
        /// Package reference (relative path or installed name).
        package: String,

        /// Stream the job's output back here; ^C detaches without stopping it.
        #[arg(long)]
        attach: bool,
    },

    /// Stop a supervised job.
    Stop(JobTarget),

    /// Stream the output of a supervised job.
    Attach(JobTarget),

    /// List every job known to the supervisor.
    #[command(visible_alias = "ls")]
    List,

    /// Show the full state of one job.
    #[command(visible_alias = "st", alias = "stat")]
    Status(JobTarget),

    /// Print the tail of a job's log file.
    Logs {
        /// Package reference (relative path or installed name).
        package: String,

        /// Number of lines to show.
        #[arg(short = 'n', long, default_value_t = DEFAULT_LOG_LINES)]
        lines: usize,
    },

    /// List installed packages and what they can do.
    Show {
        /// Only print packages that have a start script.
        #[arg(long, conflicts_with = "bin")]
        start: bool,

        /// Only print packages that expose a binary.
        #[arg(long)]
        bin: bool,
    },

    /// Read and edit defaults files.
    #[command(visible_alias = "cfg", alias = "c")]
    Config {
        /// Package whose defaults to edit (system defaults when omitted).
        #[arg(short, long, global = true)]
        name: Option<String>,

        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Install a package globally and prepare its defaults file.
    #[command(visible_alias = "i")]
    Install {
        /// Package spec understood by the package manager.
        package: String,
    },
}

/// `npkg config` actions.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print a config value.
    #[command(alias = "g")]
    Get { key: String },

    /// Set a config value (`KEY VAL` or `KEY=VAL`).
    #[command(alias = "s")]
    Set { key: String, value: Option<String> },

    /// Remove a config value.
    #[command(alias = "remove")]
    Rm { key: String },

    /// List all config keys.
    #[command(visible_alias = "ls", alias = "l")]
    List,

    /// List all key=value pairs.
    #[command(alias = "c")]
    Cat,

    /// Print the interpolated environment for a package.
    #[command(alias = "generate")]
    Gen { package: String },
}

impl ConfigCommand {
    /// Splits `set KEY=VAL` into key and value when no separate value was given.
    pub fn key_value(key: &str, value: Option<&str>) -> (String, String) {
        match value {
            Some(value) => (key.to_string(), value.to_string()),
            None => match key.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (key.to_string(), String::new()),
            },
        }
    }
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
