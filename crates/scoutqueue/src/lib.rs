//! `scoutqueue` - Offline-first submission queue for competition scouting
//!
//! This library turns completed scouting forms into records, delivers them to
//! a remote collector, and keeps whatever could not be delivered in a local,
//! de-duplicated queue for later retry.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dedupe;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod manager;
pub mod queue;
pub mod record;
pub mod roster;
pub mod session;
pub mod storage;

pub use config::Config;
pub use dedupe::DuplicateDetector;
pub use delivery::{DeliveryChannel, DeliveryError, HttpChannel};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use manager::{QueueManager, RetryOutcome, RetryReport, SubmitOutcome};
pub use queue::SubmissionQueue;
pub use record::{BuildContext, MatchEntry, PitEntry, Record, RecordKind};
pub use roster::{RosterClient, TeamInfo};
pub use session::{FormEntry, FormSession};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StoreStats};
