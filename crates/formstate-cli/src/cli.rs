//! CLI argument definitions for the formstate host.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "formstate",
    version,
    about = "Inspect form configurations and the partial updates they produce",
    long_about = "Load a JSON form configuration and JSON documents, drive the form state \
                  the way an editing UI would, and report dirty state, validation errors \
                  and the partial-update payload a save would send."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a document against a form configuration.
    Check(CheckArgs),

    /// Apply an edited document over an original and print the payload.
    Diff(DiffArgs),

    /// Apply a sequence of edits with auto-save enabled and print every
    /// payload the coordinator sends.
    Replay(ReplayArgs),
}

#[derive(Args)]
pub struct ConfigArg {
    /// Form configuration (JSON).
    #[arg(long = "config", short = 'c', value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Document to validate (JSON object).
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Document as loaded from the server.
    #[arg(value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Edited document, applied as a user edit over the original.
    #[arg(value_name = "EDITED")]
    pub edited: PathBuf,

    /// Print only the payload JSON.
    #[arg(long = "payload-only")]
    pub payload_only: bool,
}

#[derive(Args)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Document as loaded from the server.
    #[arg(value_name = "ORIGINAL")]
    pub original: PathBuf,

    /// Partial edits, applied in order.
    #[arg(value_name = "EDIT", required = true)]
    pub edits: Vec<PathBuf>,

    /// Apply every edit before the executor runs, so saves coalesce.
    #[arg(long = "burst")]
    pub burst: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
