use crate::core::frame_index;
use crate::shared::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One touch event. Field names on the wire match the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// 1-based frame number.
    #[serde(rename = "Frame Number", deserialize_with = "whole_frame_number")]
    pub frame_number: u32,
    #[serde(rename = "Time (seconds)")]
    pub time_seconds: f64,
    #[serde(rename = "Body Part")]
    pub body_part: String,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: String,
}

/// Accepts `45` as well as spreadsheet-style `45.0`; fractions are rejected.
fn whole_frame_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "frame number must be a whole non-negative number, got {value}"
        )));
    }
    Ok(value as u32)
}

impl AnnotationRecord {
    /// A new touch at `frame_number`, its time derived from `fps`.
    pub fn at_frame(frame_number: u32, fps: f64, body_part: &str, timestamp: String) -> Result<Self> {
        require_fps(fps)?;
        let record = Self {
            frame_number,
            time_seconds: frame_index::frame_number_time(frame_number, fps),
            body_part: body_part.to_string(),
            timestamp,
        };
        record.validate()?;
        Ok(record)
    }

    /// The same touch relocated to `to_frame`; time is re-derived, body part
    /// and timestamp carry over.
    pub fn moved_to(&self, to_frame: u32, fps: f64) -> Result<Self> {
        require_fps(fps)?;
        let moved = Self {
            frame_number: to_frame,
            time_seconds: frame_index::frame_number_time(to_frame, fps),
            ..self.clone()
        };
        moved.validate()?;
        Ok(moved)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_number == 0 {
            return Err(Error::Validation("frame number must be positive".to_string()));
        }
        if !self.time_seconds.is_finite() || self.time_seconds < 0.0 {
            return Err(Error::Validation(format!(
                "frame {}: time must be a non-negative number, got {}",
                self.frame_number, self.time_seconds
            )));
        }
        if self.body_part.trim().is_empty() {
            return Err(Error::Validation(format!(
                "frame {}: body part is required",
                self.frame_number
            )));
        }
        Ok(())
    }
}

fn require_fps(fps: f64) -> Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!("video reports an unusable frame rate ({fps})")))
    }
}

/// An edit submitted against a persisted annotation set.
///
/// Deletion is an explicit tombstone; frames no edit names are left as they
/// are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AnnotationEdit {
    Upsert(AnnotationRecord),
    Delete { frame_number: u32 },
}

/// All touches of one video keyed by frame number, so iteration is always
/// ascending and a frame holds at most one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    records: BTreeMap<u32, AnnotationRecord>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later records for an already-seen frame replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.upsert(record);
        }
        set
    }

    pub fn upsert(&mut self, record: AnnotationRecord) -> Option<AnnotationRecord> {
        self.records.insert(record.frame_number, record)
    }

    pub fn remove(&mut self, frame_number: u32) -> Option<AnnotationRecord> {
        self.records.remove(&frame_number)
    }

    pub fn get(&self, frame_number: u32) -> Option<&AnnotationRecord> {
        self.records.get(&frame_number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.records.values()
    }

    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.records.values().cloned().collect()
    }

    pub fn frame_numbers(&self) -> BTreeSet<u32> {
        self.records.keys().copied().collect()
    }

    /// Replace the annotations of every frame the edits name and keep all
    /// other records untouched. Edits apply in order, so the last edit for a
    /// frame wins.
    pub fn reconcile(&self, edits: &[AnnotationEdit]) -> Self {
        let mut merged = self.clone();
        for edit in edits {
            match edit {
                AnnotationEdit::Upsert(record) => {
                    merged.upsert(record.clone());
                }
                AnnotationEdit::Delete { frame_number } => {
                    merged.remove(*frame_number);
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(frame: u32, part: &str) -> AnnotationRecord {
        AnnotationRecord {
            frame_number: frame,
            time_seconds: (frame - 1) as f64 / 30.0,
            body_part: part.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_reconcile_replaces_only_edited_frames() {
        let persisted = AnnotationSet::from_records([touch(10, "Right Foot"), touch(5, "Right Foot")]);
        let merged = persisted.reconcile(&[AnnotationEdit::Upsert(touch(10, "Left Hand"))]);

        let parts: Vec<_> = merged
            .iter()
            .map(|r| (r.frame_number, r.body_part.as_str()))
            .collect();
        assert_eq!(parts, vec![(5, "Right Foot"), (10, "Left Hand")]);
    }

    #[test]
    fn test_reconcile_delete_is_explicit() {
        let persisted = AnnotationSet::from_records([touch(5, "Right Foot"), touch(10, "Right Foot")]);

        let merged = persisted.reconcile(&[AnnotationEdit::Delete { frame_number: 10 }]);
        assert_eq!(merged.frame_numbers(), BTreeSet::from([5]));

        let untouched = persisted.reconcile(&[AnnotationEdit::Upsert(touch(20, "Head"))]);
        assert_eq!(untouched.frame_numbers(), BTreeSet::from([5, 10, 20]));
    }

    #[test]
    fn test_last_edit_for_a_frame_wins() {
        let persisted = AnnotationSet::from_records([touch(3, "Chest")]);
        let merged = persisted.reconcile(&[
            AnnotationEdit::Delete { frame_number: 3 },
            AnnotationEdit::Upsert(touch(3, "Head")),
        ]);
        assert_eq!(merged.get(3).unwrap().body_part, "Head");
    }

    #[test]
    fn test_duplicate_frames_keep_later_record() {
        let set = AnnotationSet::from_records([touch(7, "Left Foot"), touch(7, "Right Foot")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(7).unwrap().body_part, "Right Foot");
    }

    #[test]
    fn test_move_recomputes_time() {
        let original = touch(100, "Left Knee");
        let moved = original.moved_to(200, 25.0).unwrap();
        assert_eq!(moved.frame_number, 200);
        assert_eq!(moved.time_seconds, 199.0 / 25.0);
        assert!((moved.time_seconds - 7.96).abs() < 1e-12);
        assert_eq!(moved.body_part, "Left Knee");
        assert_eq!(moved.timestamp, original.timestamp);
    }

    #[test]
    fn test_add_derives_time_and_rejects_frame_zero() {
        let added = AnnotationRecord::at_frame(31, 30.0, "Head", "t".to_string()).unwrap();
        assert_eq!(added.time_seconds, 1.0);

        assert!(matches!(
            AnnotationRecord::at_frame(0, 30.0, "Head", "t".to_string()),
            Err(Error::Validation(_))
        ));
        assert!(AnnotationRecord::at_frame(5, 0.0, "Head", "t".to_string()).is_err());
    }

    #[test]
    fn test_edit_json_shape() {
        let edits: Vec<AnnotationEdit> = serde_json::from_str(
            r#"[
                {"op": "upsert", "Frame Number": 12, "Time (seconds)": 0.4, "Body Part": "Head", "Timestamp": ""},
                {"op": "delete", "frame_number": 9}
            ]"#,
        )
        .unwrap();

        assert!(matches!(&edits[0], AnnotationEdit::Upsert(r) if r.frame_number == 12 && r.body_part == "Head"));
        assert_eq!(edits[1], AnnotationEdit::Delete { frame_number: 9 });
    }
}
