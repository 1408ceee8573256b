//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::RecordKind;

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// JSON file holding one completed record
    pub file: PathBuf,

    /// Skip the delivery attempt and queue the record directly
    #[arg(long)]
    pub offline: bool,
}

/// Retry command arguments.
#[derive(Debug, Args)]
pub struct RetryCommand {
    /// Only retry this queue
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,
}

/// Offline queue commands.
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List queued records in retry order
    List {
        /// Only list this queue
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Drop one queued record
    Discard {
        /// Queue to remove from
        #[arg(short, long, value_enum, default_value = "match")]
        kind: KindArg,

        /// Position in the queue, as shown by `queue list`
        index: usize,
    },

    /// Drop every queued record
    Clear {
        /// Only clear this queue
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Teams command arguments.
#[derive(Debug, Args)]
pub struct TeamsCommand {
    /// Filter by team number or name
    pub query: Option<String>,

    /// Fetch a fresh roster even if one is cached
    #[arg(short, long)]
    pub refresh: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Record kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Match scouting records
    Match,
    /// Pit scouting records
    Pit,
}

impl From<KindArg> for RecordKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Match => Self::Match,
            KindArg::Pit => Self::Pit,
        }
    }
}

/// Expand an optional kind filter into the kinds it covers.
#[must_use]
pub fn selected_kinds(kind: Option<KindArg>) -> Vec<RecordKind> {
    match kind {
        Some(kind) => vec![kind.into()],
        None => vec![RecordKind::Match, RecordKind::Pit],
    }
}
