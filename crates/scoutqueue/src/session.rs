//! Form sessions.
//!
//! A [`FormSession`] is the one explicit state object behind a scouting
//! wizard: which step is showing, the draft entry, and whatever the scout
//! typed into the team search box. It validates before moving forward,
//! builds the record at submit time, and resets itself once the record is
//! delivered.

use std::fmt::Debug;

use tracing::{debug, info};

use crate::delivery::DeliveryChannel;
use crate::error::{Error, Result};
use crate::manager::{QueueManager, SubmitOutcome};
use crate::record::{BuildContext, MatchEntry, MatchStep, PitEntry, PitStep, Record, RecordKind};
use crate::roster::parse_manual_team;
use crate::storage::KeyValueStore;

/// A draft entry a wizard can drive.
pub trait FormEntry: Default + Debug {
    /// Wizard step type.
    type Step: Copy + Debug + PartialEq + 'static;

    /// Which record kind this entry produces.
    const KIND: RecordKind;

    /// All steps in wizard order.
    fn steps() -> &'static [Self::Step];

    /// Check the required fields of one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first missing field.
    fn validate_step(&self, step: Self::Step) -> Result<()>;

    /// Check only the submitter identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first missing field.
    fn validate_identity(&self) -> Result<()>;

    /// Whether a team has been chosen.
    fn has_team(&self) -> bool;

    /// Set the team from a hand-typed number.
    fn set_manual_team(&mut self, number: u32);

    /// Clear the draft, keeping the submitter identity.
    fn clear_keep_identity(&mut self);

    /// Build the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be serialized.
    fn to_record(&self, ctx: &BuildContext) -> Result<Record>;
}

impl FormEntry for MatchEntry {
    type Step = MatchStep;
    const KIND: RecordKind = RecordKind::Match;

    fn steps() -> &'static [MatchStep] {
        MatchStep::ALL
    }

    fn validate_step(&self, step: MatchStep) -> Result<()> {
        MatchEntry::validate_step(self, step)
    }

    fn validate_identity(&self) -> Result<()> {
        MatchEntry::validate_identity(self)
    }

    fn has_team(&self) -> bool {
        self.team_number.is_some()
    }

    fn set_manual_team(&mut self, number: u32) {
        MatchEntry::set_manual_team(self, number);
    }

    fn clear_keep_identity(&mut self) {
        MatchEntry::clear_keep_identity(self);
    }

    fn to_record(&self, ctx: &BuildContext) -> Result<Record> {
        MatchEntry::to_record(self, ctx)
    }
}

impl FormEntry for PitEntry {
    type Step = PitStep;
    const KIND: RecordKind = RecordKind::Pit;

    fn steps() -> &'static [PitStep] {
        PitStep::ALL
    }

    fn validate_step(&self, step: PitStep) -> Result<()> {
        PitEntry::validate_step(self, step)
    }

    fn validate_identity(&self) -> Result<()> {
        PitEntry::validate_identity(self)
    }

    fn has_team(&self) -> bool {
        self.team_number.is_some()
    }

    fn set_manual_team(&mut self, number: u32) {
        PitEntry::set_manual_team(self, number);
    }

    fn clear_keep_identity(&mut self) {
        PitEntry::clear_keep_identity(self);
    }

    fn to_record(&self, ctx: &BuildContext) -> Result<Record> {
        PitEntry::to_record(self, ctx)
    }
}

/// Wizard state for one form.
#[derive(Debug, Default)]
pub struct FormSession<E: FormEntry> {
    entry: E,
    step: usize,
    team_search: String,
}

impl<E: FormEntry> FormSession<E> {
    /// Start a session on the first step with an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from an existing draft.
    #[must_use]
    pub fn with_entry(entry: E) -> Self {
        Self {
            entry,
            step: 0,
            team_search: String::new(),
        }
    }

    /// The draft entry.
    #[must_use]
    pub fn entry(&self) -> &E {
        &self.entry
    }

    /// Mutable access to the draft entry.
    pub fn entry_mut(&mut self) -> &mut E {
        &mut self.entry
    }

    /// The step currently showing.
    #[must_use]
    pub fn step(&self) -> E::Step {
        E::steps()[self.step]
    }

    /// Zero-based index of the current step.
    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Whether the current step is the last one.
    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.step + 1 == E::steps().len()
    }

    /// Remember text typed into the team search box.
    pub fn set_team_search(&mut self, text: impl Into<String>) {
        self.team_search = text.into();
    }

    /// Validate the current step and move to the next one.
    ///
    /// Stays on the last step once there.
    ///
    /// # Errors
    ///
    /// Returns the validation error for the current step; the step does not change.
    pub fn advance(&mut self) -> Result<E::Step> {
        self.entry.validate_step(self.step())?;
        if !self.is_last_step() {
            self.step += 1;
        }
        Ok(self.step())
    }

    /// Move back one step without validating. Returns `false` on the first step.
    pub fn back(&mut self) -> bool {
        if self.step == 0 {
            return false;
        }
        self.step -= 1;
        true
    }

    /// Clear the draft, keep the submitter identity, and return to the first step.
    pub fn reset(&mut self) {
        self.entry.clear_keep_identity();
        self.team_search.clear();
        self.step = 0;
    }

    /// Validate and build the record.
    ///
    /// Online, every step must validate. Offline, only the submitter identity
    /// is required, and a number typed into the team search box stands in
    /// for a roster pick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if validation fails, or a serialization error.
    pub fn build_record(&mut self, online: bool, ctx: &BuildContext) -> Result<Record> {
        if online {
            for step in E::steps() {
                self.entry.validate_step(*step)?;
            }
        } else {
            self.entry.validate_identity()?;
            if !self.entry.has_team() {
                if let Some(number) = parse_manual_team(&self.team_search) {
                    debug!("Offline: using manually entered team {}", number);
                    self.entry.set_manual_team(number);
                }
            }
        }
        self.entry.to_record(ctx)
    }

    /// Build the record, hand it to `manager`, and reset after delivery.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is sent. Delivery problems
    /// never surface here; they show up in the outcome.
    pub async fn submit<C, S>(
        &mut self,
        manager: &QueueManager<C, S>,
        online: bool,
        ctx: &BuildContext,
    ) -> Result<SubmitOutcome>
    where
        C: DeliveryChannel,
        S: KeyValueStore,
    {
        if manager.kind() != E::KIND {
            return Err(Error::internal(format!(
                "{} session submitted to the {} queue",
                E::KIND,
                manager.kind()
            )));
        }
        let record = self.build_record(online, ctx)?;
        let outcome = manager.submit(record).await;
        if outcome == SubmitOutcome::Sent {
            info!("Resetting {} form after delivery", E::KIND);
            self.reset();
        }
        Ok(outcome)
    }
}
