//! Command-line interface for scoutqueue.
//!
//! This module provides the CLI structure for the `scoutq` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    selected_kinds, ConfigCommand, KindArg, QueueCommand, RetryCommand, StatusCommand,
    SubmitCommand, TeamsCommand,
};

/// scoutq - Deliver scouting records, queueing them while offline
///
/// Submits completed match and pit scouting records to the collector and
/// keeps anything that could not be delivered in a local queue for retry.
#[derive(Debug, Parser)]
#[command(name = "scoutq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a completed record, queueing it if delivery fails
    Submit(SubmitCommand),

    /// Resend every queued record
    Retry(RetryCommand),

    /// Inspect or edit the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// List or search the teams at the configured event
    Teams(TeamsCommand),

    /// Show queue and storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
