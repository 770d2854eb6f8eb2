//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    BatchCommand, FramesToTimeCommand, ListCommand, ReplayCommand, RunCommand, SerialCommand, SweepCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Capture analysis settings once, replay them over a whole batch
#[derive(Debug, Parser, Clone)]
#[command(name = "sara")]
#[command(version)]
#[command(about = "Capture-and-replay orchestration for batch recording analysis", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the YAML tool configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Batch worker: analyze the job_id-th recording under the data root (-1 lists them)
    Batch(BatchCommand),

    /// Replay one settings file over every recording in this process
    Serial(SerialCommand),

    /// Analyze one recording interactively and capture its settings
    Run(RunCommand),

    /// Replay a settings file against one recording
    Replay(ReplayCommand),

    /// Generate a settings file for every combination of swept parameters
    Sweep(SweepCommand),

    /// Rewrite the frame column of an exported signal as time
    FramesToTime(FramesToTimeCommand),

    /// List recordings in job order
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
