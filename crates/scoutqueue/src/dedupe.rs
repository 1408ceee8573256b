//! Duplicate detection for queued records.
//!
//! Records have no primary key at submission time, so identity is
//! approximated by a fixed projection of fields per [`RecordKind`]. Two
//! records are equivalent iff every projected field is exactly equal (an
//! absent field only equals another absent field). Re-scouting the same
//! subject with different projected values, or near-duplicates with small
//! edits, are not detected.

use serde_json::Value;

use crate::record::{Record, RecordKind};

/// Projected fields for match records.
pub const MATCH_PROJECTION: &[&str] = &[
    "studentName",
    "matchNumber",
    "teamNumber",
    "alliance",
    "autoFuelPoints",
    "teleopFuelPoints",
    "robotStatus",
];

/// Projected fields for pit records.
pub const PIT_PROJECTION: &[&str] = &[
    "scoutName",
    "teamNumber",
    "drivetrain",
    "motorType",
    "width",
    "length",
    "height",
    "specialFeatures",
    "robotPhoto",
];

/// Decides whether a candidate record is already queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDetector {
    fields: &'static [&'static str],
}

impl DuplicateDetector {
    /// Detector using the canonical projection for `kind`.
    #[must_use]
    pub fn for_kind(kind: RecordKind) -> Self {
        let fields = match kind {
            RecordKind::Match => MATCH_PROJECTION,
            RecordKind::Pit => PIT_PROJECTION,
        };
        Self { fields }
    }

    /// Detector over an arbitrary projection.
    #[must_use]
    pub fn with_fields(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    /// The projected field names.
    #[must_use]
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Whether `a` and `b` agree on every projected field.
    #[must_use]
    pub fn equivalent(&self, a: &Record, b: &Record) -> bool {
        self.fields.iter().all(|field| a.get(field) == b.get(field))
    }

    /// Whether any record in `queue` is equivalent to `candidate`.
    #[must_use]
    pub fn is_duplicate(&self, candidate: &Record, queue: &[Record]) -> bool {
        queue.iter().any(|queued| self.equivalent(candidate, queued))
    }

    /// BLAKE3 fingerprint of the projection, for logs and listings.
    ///
    /// Equivalent records share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self, record: &Record) -> String {
        let mut hasher = blake3::Hasher::new();
        for field in self.fields {
            let value = record.get(field).unwrap_or(&Value::Null);
            hasher.update(field.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(fields) => Record::from_fields(fields),
            _ => panic!("not an object"),
        }
    }

    fn match_record(comments: &str) -> Record {
        record(json!({
            "studentName": "Ada",
            "matchNumber": 12,
            "teamNumber": 2056,
            "alliance": "red",
            "autoFuelPoints": 40.0,
            "teleopFuelPoints": 125.0,
            "robotStatus": "OK",
            "comments": comments,
        }))
    }

    #[test]
    fn test_ignores_fields_outside_projection() {
        let detector = DuplicateDetector::for_kind(RecordKind::Match);
        let a = match_record("fast intake");
        let b = match_record("actually slow");
        assert!(detector.equivalent(&a, &b));
        assert!(detector.is_duplicate(&b, &[a]));
    }

    #[test]
    fn test_projected_field_difference_is_not_duplicate() {
        let detector = DuplicateDetector::for_kind(RecordKind::Match);
        let a = match_record("");
        let mut fields = a.fields().clone();
        fields.insert("matchNumber".to_string(), json!(13));
        let b = Record::from_fields(fields);
        assert!(!detector.is_duplicate(&b, &[a]));
    }

    #[test]
    fn test_empty_queue_never_duplicate() {
        let detector = DuplicateDetector::for_kind(RecordKind::Match);
        assert!(!detector.is_duplicate(&match_record(""), &[]));
    }

    #[test]
    fn test_absent_fields_compare_equal_only_to_absent() {
        let detector = DuplicateDetector::with_fields(&["a", "b"]);
        let only_a = record(json!({"a": 1}));
        let also_only_a = record(json!({"a": 1, "z": 9}));
        let a_and_null_b = record(json!({"a": 1, "b": null}));
        assert!(detector.equivalent(&only_a, &also_only_a));
        assert!(!detector.equivalent(&only_a, &a_and_null_b));
    }

    #[test]
    fn test_exact_equality_no_normalization() {
        let detector = DuplicateDetector::with_fields(&["name"]);
        let a = record(json!({"name": "Ada"}));
        let b = record(json!({"name": "ada"}));
        let c = record(json!({"name": "Ada "}));
        assert!(!detector.equivalent(&a, &b));
        assert!(!detector.equivalent(&a, &c));
    }

    #[test]
    fn test_pit_projection_includes_photo() {
        let detector = DuplicateDetector::for_kind(RecordKind::Pit);
        assert!(detector.fields().contains(&"robotPhoto"));
        let a = record(json!({"scoutName": "Lin", "teamNumber": 1259, "robotPhoto": "AAAA"}));
        let b = record(json!({"scoutName": "Lin", "teamNumber": 1259, "robotPhoto": "BBBB"}));
        assert!(!detector.equivalent(&a, &b));
    }

    #[test]
    fn test_fingerprint_tracks_equivalence() {
        let detector = DuplicateDetector::for_kind(RecordKind::Match);
        let a = match_record("one");
        let b = match_record("two");
        assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
        assert_eq!(detector.fingerprint(&a).len(), 64);

        let mut fields = a.fields().clone();
        fields.insert("alliance".to_string(), json!("blue"));
        let c = Record::from_fields(fields);
        assert_ne!(detector.fingerprint(&a), detector.fingerprint(&c));
    }
}
