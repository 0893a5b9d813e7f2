// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `frametasks`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "frametasks",
    version,
    about = "Drive a frame-based task-graph scheduler with a declarative job workload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Frametasks.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Frametasks.toml")]
    pub config: String,

    /// Number of frames to simulate.
    #[arg(long, value_name = "N", default_value_t = 60)]
    pub frames: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FRAMETASKS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the job graph, but don't start the scheduler.
    #[arg(long)]
    pub dry_run: bool,

    /// Write a Graphviz snapshot of the last submitted frame to this file.
    #[arg(long, value_name = "PATH")]
    pub dot: Option<PathBuf>,

    /// Print the final scheduler statistics as JSON on stdout.
    #[arg(long)]
    pub stats_json: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
