//! Scouting records.
//!
//! A [`Record`] is the flat key/value document that gets delivered or queued.
//! It is built once from a form entry ([`MatchEntry`] or [`PitEntry`]) and
//! never mutated afterwards.

mod match_entry;
mod pit_entry;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use match_entry::{
    fuel_points, tower_points_auto, tower_points_teleop, Cycle, FuelSources, InactiveActivity,
    MatchEntry, MatchStep, MAX_CYCLES,
};
pub use pit_entry::{ball_capacity, PitEntry, PitStep};

/// Field that marks a record as pit scouting.
pub const SCOUTING_TYPE_FIELD: &str = "scoutingType";

/// Value of [`SCOUTING_TYPE_FIELD`] on pit records.
pub const PIT_SCOUTING_TYPE: &str = "PIT";

/// Which form produced a record. Each kind has its own queue slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Per-match observations of one robot.
    Match,
    /// Pit interview about a robot's design.
    Pit,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Pit => write!(f, "pit"),
        }
    }
}

/// An immutable field-name → value document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap an already-built field map.
    #[must_use]
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a record from any serializable entry that serializes to an object.
    ///
    /// # Errors
    ///
    /// Returns an error if `entry` does not serialize to a JSON object.
    pub fn from_entry<T: Serialize>(entry: &T) -> Result<Self> {
        match serde_json::to_value(entry)? {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::internal(format!(
                "record must serialize to an object, got {other}"
            ))),
        }
    }

    /// Parse a record from a JSON object string.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the record to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// All fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Infer the record kind from its `scoutingType` marker.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self.get_str(SCOUTING_TYPE_FIELD) {
            Some(PIT_SCOUTING_TYPE) => RecordKind::Pit,
            _ => RecordKind::Match,
        }
    }

    /// Short human label for logs and listings.
    #[must_use]
    pub fn summary(&self) -> String {
        let team = self.get("teamNumber").map_or_else(String::new, Value::to_string);
        match self.kind() {
            RecordKind::Match => {
                let matchno = self.get("matchNumber").map_or_else(String::new, Value::to_string);
                let who = self.get_str("studentName").unwrap_or("");
                format!("match {matchno} team {team} by {who}")
            }
            RecordKind::Pit => {
                let who = self.get_str("scoutName").unwrap_or("");
                format!("pit team {team} by {who}")
            }
        }
    }
}

/// Event context and build time stamped on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Event key from configuration.
    pub event_code: String,
    /// When the record was built.
    pub built_at: DateTime<Utc>,
}

impl BuildContext {
    /// Context for a record built right now.
    #[must_use]
    pub fn now(event_code: impl Into<String>) -> Self {
        Self::at(event_code, Utc::now())
    }

    /// Context for a record built at a fixed time.
    #[must_use]
    pub fn at(event_code: impl Into<String>, built_at: DateTime<Utc>) -> Self {
        Self {
            event_code: event_code.into(),
            built_at,
        }
    }

    /// Build time in the millisecond ISO-8601 form the collector expects.
    #[must_use]
    pub fn timestamp_iso(&self) -> String {
        self.built_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    /// 1970-01-01T00:00:00Z, for deterministic timestamps.
    pub(crate) fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_opt(0, 0).unwrap()
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(fields) => Record::from_fields(fields),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_record_kind_display() {
        assert_eq!(RecordKind::Match.to_string(), "match");
        assert_eq!(RecordKind::Pit.to_string(), "pit");
    }

    #[test]
    fn test_kind_from_marker() {
        let pit = record(json!({"scoutingType": "PIT", "teamNumber": 1792}));
        let matched = record(json!({"matchNumber": 4, "teamNumber": 1792}));
        assert_eq!(pit.kind(), RecordKind::Pit);
        assert_eq!(matched.kind(), RecordKind::Match);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(Record::from_json("[1, 2, 3]").is_err());
        assert!(Record::from_json("{\"a\": 1}").is_ok());
    }

    #[test]
    fn test_from_entry_rejects_non_object() {
        assert!(Record::from_entry(&42).is_err());
    }

    #[test]
    fn test_json_preserves_nested_cycles() {
        let original = record(json!({
            "studentName": "Ada",
            "autoCycles": [{"hopperFill": 50, "accuracy": 80}],
            "fuelFloor": true,
        }));
        let reloaded = Record::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(original, reloaded);
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_build_context_timestamp() {
        let ctx = BuildContext::at("2026wiapp", fixed_time());
        assert_eq!(ctx.timestamp_iso(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_summary() {
        let m = record(json!({"matchNumber": 12, "teamNumber": 1792, "studentName": "Ada"}));
        assert_eq!(m.summary(), "match 12 team 1792 by Ada");

        let p = record(json!({"scoutingType": "PIT", "teamNumber": 1259, "scoutName": "Lin"}));
        assert_eq!(p.summary(), "pit team 1259 by Lin");
    }
}
