//! Pit scouting entry: one interview about a robot's design.

use serde::Serialize;

use super::{BuildContext, Record, PIT_SCOUTING_TYPE};
use crate::error::{Error, Result};

/// Game piece diameter, inches.
const BALL_DIAMETER_IN: f64 = 5.91;

/// Random close packing of spheres fills about 64% of a volume.
const PACKING_EFFICIENCY: f64 = 0.64;

/// Estimate how many balls fit in a hopper of the given inner dimensions (inches).
///
/// Returns 0 unless all three dimensions are positive.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ball_capacity(length: f64, width: f64, height: f64) -> u32 {
    if !(length > 0.0 && width > 0.0 && height > 0.0) {
        return 0;
    }
    let radius = BALL_DIAMETER_IN / 2.0;
    let ball_volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    let hopper_volume = length * width * height;
    (hopper_volume / ball_volume * PACKING_EFFICIENCY).floor() as u32
}

/// Wizard steps of the pit form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitStep {
    /// Scout name and team.
    TeamInfo,
    /// Drivetrain, dimensions, mechanisms, photo.
    RobotDesign,
}

impl PitStep {
    /// All steps in wizard order.
    pub const ALL: &'static [PitStep] = &[PitStep::TeamInfo, PitStep::RobotDesign];
}

/// Draft state of the pit form.
///
/// Dimensions stay as typed text; the collector receives them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PitEntry {
    pub scout_name: String,
    pub team_number: Option<u32>,
    pub team_name: String,

    pub drivetrain: String,
    pub motor_type: String,
    pub width: String,
    pub length: String,
    pub height: String,
    pub programming_lang: String,
    pub can_climb: Option<String>,
    pub hopper: Option<String>,
    pub hopper_length: String,
    pub hopper_width: String,
    pub hopper_height: String,
    pub special_features: String,
    /// Base64 photo of the robot.
    pub robot_photo: Option<String>,

    pub submit_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PitPayload<'a> {
    scouting_type: &'static str,
    #[serde(rename = "timestampISO")]
    timestamp_iso: String,
    scout_name: &'a str,
    event_code: &'a str,
    team_number: u32,
    team_name: &'a str,

    drivetrain: &'a str,
    motor_type: &'a str,
    width: &'a str,
    length: &'a str,
    height: &'a str,
    programming_lang: &'a str,
    can_climb: &'a str,
    hopper: &'a str,
    hopper_length: &'a str,
    hopper_width: &'a str,
    hopper_height: &'a str,
    ball_capacity: u32,
    special_features: &'a str,
    robot_photo: &'a str,

    submit_code: &'a str,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn dimension(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}

impl PitEntry {
    /// Whether the robot was reported to have a hopper.
    #[must_use]
    pub fn has_hopper(&self) -> bool {
        self.hopper.as_deref() == Some("Yes")
    }

    /// Estimated hopper capacity, 0 without a hopper or complete dimensions.
    #[must_use]
    pub fn ball_capacity(&self) -> u32 {
        if !self.has_hopper() {
            return 0;
        }
        ball_capacity(
            dimension(&self.hopper_length),
            dimension(&self.hopper_width),
            dimension(&self.hopper_height),
        )
    }

    /// Record the team, naming it `Team N` when typed by hand.
    pub fn set_manual_team(&mut self, number: u32) {
        self.team_number = Some(number);
        self.team_name = format!("Team {number}");
    }

    /// Check the required fields of one wizard step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first missing field.
    pub fn validate_step(&self, step: PitStep) -> Result<()> {
        match step {
            PitStep::TeamInfo => {
                self.validate_identity()?;
                if self.team_number.is_none() {
                    return Err(Error::missing_field("teamNumber", "Select a team from the list"));
                }
            }
            PitStep::RobotDesign => {
                if blank(&self.drivetrain) {
                    return Err(Error::missing_field("drivetrain", "Select drivetrain type"));
                }
                if blank(&self.motor_type) {
                    return Err(Error::missing_field("motorType", "Select motor type"));
                }
                if blank(&self.width) || blank(&self.length) || blank(&self.height) {
                    return Err(Error::missing_field("dimensions", "Enter all robot dimensions"));
                }
                if blank(&self.programming_lang) {
                    return Err(Error::missing_field(
                        "programmingLang",
                        "Select programming language",
                    ));
                }
                if self.can_climb.is_none() {
                    return Err(Error::missing_field("canClimb", "Select tower climb level"));
                }
                if self.hopper.is_none() {
                    return Err(Error::missing_field("hopper", "Indicate if robot has hopper"));
                }
                if self.has_hopper()
                    && (blank(&self.hopper_length)
                        || blank(&self.hopper_width)
                        || blank(&self.hopper_height))
                {
                    return Err(Error::missing_field(
                        "hopperDimensions",
                        "Enter all hopper dimensions",
                    ));
                }
                if blank(&self.special_features) {
                    return Err(Error::missing_field(
                        "specialFeatures",
                        "Describe special features/mechanisms",
                    ));
                }
                if self.robot_photo.as_deref().map_or(true, blank) {
                    return Err(Error::missing_field("robotPhoto", "Robot photo is required"));
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

    /// Minimal check for queueing while offline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the scout's name is blank.
    pub fn validate_identity(&self) -> Result<()> {
        if blank(&self.scout_name) {
            return Err(Error::missing_field("scoutName", "Enter scout name"));
        }
        Ok(())
    }

    /// Clear the draft, keeping the scout's name.
    pub fn clear_keep_identity(&mut self) {
        let scout_name = std::mem::take(&mut self.scout_name);
        *self = Self {
            scout_name,
            ..Self::default()
        };
    }

    /// Build the immutable record.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_record(&self, ctx: &BuildContext) -> Result<Record> {
        let payload = PitPayload {
            scouting_type: PIT_SCOUTING_TYPE,
            timestamp_iso: ctx.timestamp_iso(),
            scout_name: self.scout_name.trim(),
            event_code: &ctx.event_code,
            team_number: self.team_number.unwrap_or(0),
            team_name: &self.team_name,

            drivetrain: self.drivetrain.trim(),
            motor_type: self.motor_type.trim(),
            width: self.width.trim(),
            length: self.length.trim(),
            height: self.height.trim(),
            programming_lang: self.programming_lang.trim(),
            can_climb: self.can_climb.as_deref().unwrap_or("No"),
            hopper: self.hopper.as_deref().unwrap_or("No"),
            hopper_length: self.hopper_length.trim(),
            hopper_width: self.hopper_width.trim(),
            hopper_height: self.hopper_height.trim(),
            ball_capacity: self.ball_capacity(),
            special_features: self.special_features.trim(),
            robot_photo: self.robot_photo.as_deref().unwrap_or(""),

            submit_code: self.submit_code.trim(),
        };
        Record::from_entry(&payload)
    }
}
