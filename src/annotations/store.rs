use super::codec;
use super::record::{AnnotationEdit, AnnotationRecord, AnnotationSet};
use crate::shared::constants;
use crate::shared::error::{Error, Result};
use crate::utils::{file_utils, logger, time_utils};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Base name a video's annotations are filed under: the file name with its
/// extension stripped.
pub fn video_base_name(video_filename: &str) -> String {
    Path::new(video_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| video_filename.to_string())
}

/// Outcome of persisting a batch of edits.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub edited_touches: usize,
    pub total_touches: usize,
    pub backup_path: PathBuf,
    pub backup_created: bool,
}

/// Annotation files on disk: `<csv_dir>/<base>.csv`, with a one-time backup
/// of the pre-edit file at `<backup_dir>/<base>_original.csv`.
pub struct AnnotationStore {
    csv_dir: PathBuf,
    backup_dir: PathBuf,
}

impl AnnotationStore {
    pub fn new(csv_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_dir: csv_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn csv_path(&self, video_filename: &str) -> PathBuf {
        self.csv_dir.join(format!("{}.csv", video_base_name(video_filename)))
    }

    pub fn backup_path(&self, video_filename: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}{}", video_base_name(video_filename), constants::BACKUP_SUFFIX))
    }

    pub fn exists(&self, video_filename: &str) -> bool {
        self.csv_path(video_filename).is_file()
    }

    /// The persisted set; fails with `SourceUnavailable` when there is no file.
    pub fn load(&self, video_filename: &str) -> Result<AnnotationSet> {
        codec::read_file(&self.csv_path(video_filename))
    }

    /// Like `load`, but a missing file is an empty set.
    pub fn load_or_empty(&self, video_filename: &str) -> Result<AnnotationSet> {
        if self.exists(video_filename) {
            self.load(video_filename)
        } else {
            Ok(AnnotationSet::new())
        }
    }

    /// Reconciles `edits` against the persisted set and writes the result.
    ///
    /// The first time a video's annotations are about to change, the file as it
    /// was is copied to the backup location (a header-only file when there was
    /// nothing yet); that backup is never replaced.
    pub fn save_edits(&self, video_filename: &str, edits: &[AnnotationEdit]) -> Result<SaveReport> {
        for edit in edits {
            match edit {
                AnnotationEdit::Upsert(record) => record.validate()?,
                AnnotationEdit::Delete { frame_number: 0 } => {
                    return Err(Error::Validation("frame number must be positive".to_string()))
                }
                AnnotationEdit::Delete { .. } => {}
            }
        }

        let csv_path = self.csv_path(video_filename);
        let backup_path = self.backup_path(video_filename);
        let persisted = self.load_or_empty(video_filename)?;

        if edits.is_empty() {
            return Ok(SaveReport {
                edited_touches: 0,
                total_touches: persisted.len(),
                backup_created: false,
                backup_path,
            });
        }

        // A file created by this save backs up as a header-only snapshot
        let backup_created = if csv_path.is_file() {
            file_utils::copy_if_absent(&csv_path, &backup_path)?
        } else {
            file_utils::write_if_absent(&backup_path, &codec::to_bytes(&AnnotationSet::new())?)?
        };
        if backup_created {
            logger::info(&format!(
                "backed up {} to {}",
                csv_path.display(),
                backup_path.display()
            ));
        }

        let merged = persisted.reconcile(edits);
        codec::write_file(&csv_path, &merged)?;

        logger::info(&format!(
            "saved {} edit(s) for {}: {} -> {} annotation(s)",
            edits.len(),
            video_filename,
            persisted.len(),
            merged.len()
        ));

        Ok(SaveReport {
            edited_touches: edits.len(),
            total_touches: merged.len(),
            backup_path,
            backup_created,
        })
    }

    /// Adds a touch at `frame_number`; its time is `(frame_number - 1) / fps`.
    pub fn add_touch(
        &self,
        video_filename: &str,
        frame_number: u32,
        body_part: &str,
        fps: f64,
    ) -> Result<(AnnotationRecord, SaveReport)> {
        let record = AnnotationRecord::at_frame(
            frame_number,
            fps,
            body_part,
            time_utils::annotation_timestamp(),
        )?;
        let report = self.save_edits(video_filename, &[AnnotationEdit::Upsert(record.clone())])?;
        Ok((record, report))
    }

    /// Moves the touch at `from_frame` to `to_frame`, replacing whatever sat
    /// there and re-deriving its time.
    pub fn move_touch(
        &self,
        video_filename: &str,
        from_frame: u32,
        to_frame: u32,
        fps: f64,
    ) -> Result<(AnnotationRecord, SaveReport)> {
        let persisted = self.load(video_filename)?;
        let original = persisted
            .get(from_frame)
            .ok_or_else(|| Error::Validation(format!("no touch at frame {from_frame}")))?;
        let moved = original.moved_to(to_frame, fps)?;

        let edits = [
            AnnotationEdit::Delete { frame_number: from_frame },
            AnnotationEdit::Upsert(moved.clone()),
        ];
        let report = self.save_edits(video_filename, &edits)?;
        Ok((moved, report))
    }

    pub fn remove_touch(&self, video_filename: &str, frame_number: u32) -> Result<SaveReport> {
        let persisted = self.load(video_filename)?;
        if persisted.get(frame_number).is_none() {
            return Err(Error::Validation(format!("no touch at frame {frame_number}")));
        }
        self.save_edits(video_filename, &[AnnotationEdit::Delete { frame_number }])
    }
}
