//! Match scouting entry: one robot observed through one match.

use serde::{Deserialize, Serialize};

use super::{BuildContext, Record};
use crate::error::{Error, Result};

/// Maximum scoring cycles per period.
pub const MAX_CYCLES: usize = 20;

/// Tower level recorded when the robot did not climb.
const NO_TOWER: &str = "NONE";

/// One hopper-load scoring attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// How full the hopper was, in percent.
    pub hopper_fill: u32,
    /// Share of the load that scored, in percent.
    pub accuracy: u32,
}

/// Points credited for a list of cycles: Σ fill × accuracy / 100.
#[must_use]
pub fn fuel_points(cycles: &[Cycle]) -> f64 {
    cycles
        .iter()
        .map(|c| f64::from(c.hopper_fill) * f64::from(c.accuracy) / 100.0)
        .sum()
}

/// Tower points in autonomous.
#[must_use]
pub fn tower_points_auto(level: Option<&str>) -> u32 {
    match level {
        Some("L1") => 15,
        _ => 0,
    }
}

/// Tower points at the end of teleop.
#[must_use]
pub fn tower_points_teleop(level: Option<&str>) -> u32 {
    match level {
        Some("L1") => 10,
        Some("L2") => 20,
        Some("L3") => 30,
        _ => 0,
    }
}

/// Wizard steps of the match form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    /// Scout identity, match number, alliance, team.
    Start,
    /// Autonomous period.
    Auto,
    /// Teleoperated period.
    Teleop,
    /// Endgame climb.
    Endgame,
    /// Ratings, comments, submit code.
    Misc,
}

impl MatchStep {
    /// All steps in wizard order.
    pub const ALL: &'static [MatchStep] = &[
        MatchStep::Start,
        MatchStep::Auto,
        MatchStep::Teleop,
        MatchStep::Endgame,
        MatchStep::Misc,
    ];
}

/// Where fuel was collected from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuelSources {
    /// Neutral zone pickup.
    pub neutral_zone: bool,
    /// Outpost pickup.
    pub outpost: bool,
    /// Depot pickup.
    pub depot: bool,
    /// Floor pickup.
    pub floor: bool,
}

impl FuelSources {
    fn any(self) -> bool {
        self.neutral_zone || self.outpost || self.depot || self.floor
    }
}

/// What the robot did while its hub was inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InactiveActivity {
    /// Played defense.
    pub played_defense: bool,
    /// Shuttled fuel toward its alliance.
    pub shuttled_fuel: bool,
    /// Blocked the bump or trench.
    pub blocked_bump_trench: bool,
    /// Collected fuel for the next active period.
    pub collecting_fuel: bool,
}

impl InactiveActivity {
    fn any(self) -> bool {
        self.played_defense || self.shuttled_fuel || self.blocked_bump_trench || self.collecting_fuel
    }
}

/// Draft state of the match form.
///
/// Field names mirror the record fields they feed.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs, clippy::struct_excessive_bools)]
pub struct MatchEntry {
    pub student_name: String,
    pub scout_team: String,
    pub match_number: Option<u32>,
    pub team_number: Option<u32>,
    pub alliance: String,

    pub start_pos: Option<String>,
    pub auto_cycles: Vec<Cycle>,
    pub auto_sources: FuelSources,
    pub auto_bump_over: bool,
    pub auto_trench_under: bool,
    pub auto_bump_trench_none: bool,
    pub auto_shuttling: Option<String>,
    pub auto_tower: Option<String>,

    pub teleop_cycles: Vec<Cycle>,
    pub teleop_sources: FuelSources,
    pub inactive: InactiveActivity,
    pub shuttling: String,

    pub teleop_tower: Option<String>,
    pub climb_pos: Option<String>,
    pub shot_in_hub: Option<String>,

    pub affected_by_defense: Option<String>,
    pub crossed_bump: Option<String>,
    pub crossed_trench: Option<String>,
    pub excessive_penalties: Option<String>,
    pub auto_effectiveness: String,
    pub teleop_active_effectiveness: String,
    pub teleop_inactive_effectiveness: String,
    pub endgame_effectiveness: String,
    pub robot_status: String,
    pub defense_rating: String,
    pub rank: Option<String>,
    pub comments: String,
    pub submit_code: String,
}

/// Wire shape of a match record.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
struct MatchPayload<'a> {
    #[serde(rename = "timestampISO")]
    timestamp_iso: String,
    student_name: &'a str,
    scout_team: &'a str,
    event_code: &'a str,
    match_number: u32,
    team_number: u32,
    alliance: &'a str,

    start_pos: &'a str,
    auto_cycles: &'a [Cycle],
    auto_fuel_points: f64,
    auto_tower: &'a str,
    auto_tower_points: u32,

    teleop_cycles: &'a [Cycle],
    teleop_fuel_points: f64,
    fuel_neutral_zone: bool,
    fuel_outpost: bool,
    fuel_depot: bool,
    fuel_floor: bool,
    auto_bump_over: bool,
    auto_trench_under: bool,
    auto_bump_trench_none: bool,
    auto_shuttling: &'a str,
    teleop_fuel_neutral_zone: bool,
    teleop_fuel_outpost: bool,
    teleop_fuel_depot: bool,
    teleop_fuel_floor: bool,
    inactive_played_defense: bool,
    inactive_shuttled_fuel: bool,
    inactive_blocked_bump_trench: bool,
    inactive_collecting_fuel: bool,
    shuttling: &'a str,

    teleop_tower: &'a str,
    teleop_tower_points: u32,
    climb_pos: &'a str,
    shot_in_hub: &'a str,
    affected_by_defense: &'a str,
    crossed_bump: &'a str,
    crossed_trench: &'a str,
    excessive_penalties: &'a str,
    auto_effectiveness: &'a str,
    teleop_active_effectiveness: &'a str,
    teleop_inactive_effectiveness: &'a str,
    endgame_effectiveness: &'a str,
    robot_status: &'a str,
    defense_rating: &'a str,
    rank: &'a str,
    comments: &'a str,

    submit_code: &'a str,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn opt(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}

impl MatchEntry {
    /// Add an empty cycle to the autonomous or teleop list.
    ///
    /// Returns `false` once the period already holds [`MAX_CYCLES`].
    pub fn add_cycle(&mut self, teleop: bool) -> bool {
        let cycles = if teleop {
            &mut self.teleop_cycles
        } else {
            &mut self.auto_cycles
        };
        if cycles.len() >= MAX_CYCLES {
            return false;
        }
        cycles.push(Cycle::default());
        true
    }

    /// Set the scouted team from a typed number when no roster is available.
    pub fn set_manual_team(&mut self, number: u32) {
        self.team_number = Some(number);
    }

    /// Mark "neither bump nor trench" in auto, clearing the other two.
    pub fn set_auto_bump_trench_none(&mut self) {
        self.auto_bump_trench_none = true;
        self.auto_bump_over = false;
        self.auto_trench_under = false;
    }

    /// Mark auto bump/trench crossings, clearing "none" if either is set.
    pub fn set_auto_crossings(&mut self, bump_over: bool, trench_under: bool) {
        self.auto_bump_over = bump_over;
        self.auto_trench_under = trench_under;
        if bump_over || trench_under {
            self.auto_bump_trench_none = false;
        }
    }

    /// Check the required fields of one wizard step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first missing field.
    pub fn validate_step(&self, step: MatchStep) -> Result<()> {
        match step {
            MatchStep::Start => {
                self.validate_identity()?;
                if self.match_number.unwrap_or(0) < 1 {
                    return Err(Error::missing_field("matchNumber", "Enter match number"));
                }
                if blank(&self.alliance) {
                    return Err(Error::missing_field("alliance", "Select alliance color"));
                }
                if self.team_number.is_none() {
                    return Err(Error::missing_field("teamNumber", "Select a team from the list"));
                }
            }
            MatchStep::Auto => {
                if self.start_pos.is_none() {
                    return Err(Error::missing_field("startPos", "Select where robot starts"));
                }
                if self.auto_cycles.is_empty() {
                    return Err(Error::missing_field(
                        "autoCycles",
                        "Add at least one auto fuel cycle",
                    ));
                }
                if !self.auto_sources.any() {
                    return Err(Error::missing_field("fuelSource", "Select at least one fuel source"));
                }
                if !(self.auto_bump_over || self.auto_trench_under || self.auto_bump_trench_none) {
                    return Err(Error::missing_field("autoBumpTrench", "Select bump/trench option"));
                }
                if self.auto_shuttling.is_none() {
                    return Err(Error::missing_field("autoShuttling", "Select shuttling during auto"));
                }
                if self.auto_tower.is_none() {
                    return Err(Error::missing_field("autoTower", "Select auto tower level"));
                }
            }
            MatchStep::Teleop => {
                if self.teleop_cycles.is_empty() {
                    return Err(Error::missing_field(
                        "teleopCycles",
                        "Add at least one teleop fuel cycle",
                    ));
                }
                if !self.teleop_sources.any() {
                    return Err(Error::missing_field(
                        "teleopFuelSource",
                        "Select at least one teleop fuel source",
                    ));
                }
                if !self.inactive.any() {
                    return Err(Error::missing_field(
                        "inactiveActivity",
                        "Select at least one inactive activity",
                    ));
                }
                if blank(&self.shuttling) {
                    return Err(Error::missing_field("shuttling", "Select shuttling rating"));
                }
            }
            MatchStep::Endgame => {
                let Some(tower) = self.teleop_tower.as_deref() else {
                    return Err(Error::missing_field("teleopTower", "Select endgame tower level"));
                };
                if self.climb_pos.is_none() && tower != NO_TOWER {
                    return Err(Error::missing_field(
                        "climbPos",
                        "Select where robot climbed on tower",
                    ));
                }
                if self.shot_in_hub.is_none() {
                    return Err(Error::missing_field("shotInHub", "Select shot in hub"));
                }
            }
            MatchStep::Misc => {
                if self.affected_by_defense.is_none() {
                    return Err(Error::missing_field(
                        "affectedByDefense",
                        "Select if team was affected by defense",
                    ));
                }
                if blank(&self.robot_status) {
                    return Err(Error::missing_field("robotStatus", "Select robot status"));
                }
                if blank(&self.defense_rating) {
                    return Err(Error::missing_field("defenseRating", "Select defense rating"));
                }
                if self.crossed_bump.is_none() {
                    return Err(Error::missing_field("crossedBump", "Select if robot crossed bump"));
                }
                if self.crossed_trench.is_none() {
                    return Err(Error::missing_field(
                        "crossedTrench",
                        "Select if robot crossed under trench",
                    ));
                }
                if self.rank.is_none() {
                    return Err(Error::missing_field("rank", "Rank this robot"));
                }
                if blank(&self.submit_code) {
                    return Err(Error::missing_field(
                        "submitCode",
                        "Enter submit code to authorize submission",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Minimal checks for queueing while offline: who is scouting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the scout's name or team is blank.
    pub fn validate_identity(&self) -> Result<()> {
        if blank(&self.student_name) {
            return Err(Error::missing_field("studentName", "Enter student name"));
        }
        if blank(&self.scout_team) {
            return Err(Error::missing_field("scoutTeam", "Select your team"));
        }
        Ok(())
    }

    /// Clear the draft, keeping who is scouting.
    pub fn clear_keep_identity(&mut self) {
        let student_name = std::mem::take(&mut self.student_name);
        let scout_team = std::mem::take(&mut self.scout_team);
        *self = Self {
            student_name,
            scout_team,
            ..Self::default()
        };
    }

    /// Build the immutable record.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_record(&self, ctx: &BuildContext) -> Result<Record> {
        let payload = MatchPayload {
            timestamp_iso: ctx.timestamp_iso(),
            student_name: self.student_name.trim(),
            scout_team: &self.scout_team,
            event_code: &ctx.event_code,
            match_number: self.match_number.unwrap_or(0),
            team_number: self.team_number.unwrap_or(0),
            alliance: &self.alliance,

            start_pos: opt(self.start_pos.as_ref()),
            auto_cycles: &self.auto_cycles,
            auto_fuel_points: fuel_points(&self.auto_cycles),
            auto_tower: self.auto_tower.as_deref().unwrap_or(NO_TOWER),
            auto_tower_points: tower_points_auto(self.auto_tower.as_deref()),

            teleop_cycles: &self.teleop_cycles,
            teleop_fuel_points: fuel_points(&self.teleop_cycles),
            fuel_neutral_zone: self.auto_sources.neutral_zone,
            fuel_outpost: self.auto_sources.outpost,
            fuel_depot: self.auto_sources.depot,
            fuel_floor: self.auto_sources.floor,
            auto_bump_over: self.auto_bump_over,
            auto_trench_under: self.auto_trench_under,
            auto_bump_trench_none: self.auto_bump_trench_none,
            auto_shuttling: opt(self.auto_shuttling.as_ref()),
            teleop_fuel_neutral_zone: self.teleop_sources.neutral_zone,
            teleop_fuel_outpost: self.teleop_sources.outpost,
            teleop_fuel_depot: self.teleop_sources.depot,
            teleop_fuel_floor: self.teleop_sources.floor,
            inactive_played_defense: self.inactive.played_defense,
            inactive_shuttled_fuel: self.inactive.shuttled_fuel,
            inactive_blocked_bump_trench: self.inactive.blocked_bump_trench,
            inactive_collecting_fuel: self.inactive.collecting_fuel,
            shuttling: &self.shuttling,

            teleop_tower: self.teleop_tower.as_deref().unwrap_or(NO_TOWER),
            teleop_tower_points: tower_points_teleop(self.teleop_tower.as_deref()),
            climb_pos: opt(self.climb_pos.as_ref()),
            shot_in_hub: opt(self.shot_in_hub.as_ref()),
            affected_by_defense: opt(self.affected_by_defense.as_ref()),
            crossed_bump: opt(self.crossed_bump.as_ref()),
            crossed_trench: opt(self.crossed_trench.as_ref()),
            excessive_penalties: opt(self.excessive_penalties.as_ref()),
            auto_effectiveness: &self.auto_effectiveness,
            teleop_active_effectiveness: &self.teleop_active_effectiveness,
            teleop_inactive_effectiveness: &self.teleop_inactive_effectiveness,
            endgame_effectiveness: &self.endgame_effectiveness,
            robot_status: &self.robot_status,
            defense_rating: &self.defense_rating,
            rank: opt(self.rank.as_ref()),
            comments: &self.comments,

            submit_code: &self.submit_code,
        };
        Record::from_entry(&payload)
    }
}
