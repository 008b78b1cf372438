use crate::core::session::{ExtractionSession, SessionManager};
use crate::shared::constants;
use crate::shared::error::{Error, Result};
use crate::utils::{file_utils, logger, time_utils};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// `metadata.json` written next to every saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub session_id: String,
    pub video_filename: String,
    pub extraction_timestamp: String,
    pub saved_timestamp: String,
    pub total_frames: usize,
    pub frame_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub session_id: String,
    pub saved_location: PathBuf,
    pub total_frames: usize,
    pub already_saved: bool,
}

/// Commits the working frames of the current session to
/// `<reviewed_dir>/<session_id>/`.
pub struct ReviewExporter {
    reviewed_dir: PathBuf,
}

impl ReviewExporter {
    pub fn new(reviewed_dir: impl Into<PathBuf>) -> Self {
        Self {
            reviewed_dir: reviewed_dir.into(),
        }
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.reviewed_dir.join(session_id)
    }

    fn working_frames(frames_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        Ok(file_utils::list_files(frames_dir, constants::FRAME_EXTENSION)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().to_string();
                Some((name, path))
            })
            .collect())
    }

    fn read_metadata(&self, session_dir: &Path) -> Option<ReviewMetadata> {
        let bytes = fs::read(session_dir.join(constants::REVIEW_METADATA_FILE)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Copies the working frames, the session's annotation file (as
    /// `annotations.csv`) and a metadata descriptor, then marks the session
    /// saved.
    ///
    /// Saving a saved session again is a no-op while the working directory
    /// still matches what was saved; otherwise it is `AlreadySaved`.
    pub fn save(&self, sessions: &mut SessionManager) -> Result<SaveReceipt> {
        let session: ExtractionSession = sessions.current().cloned().ok_or(Error::NoActiveSession)?;
        let session_dir = self.session_dir(&session.session_id);
        let working = Self::working_frames(sessions.frames_dir())?;

        if session.saved {
            let names: Vec<&str> = working.iter().map(|(name, _)| name.as_str()).collect();
            return match self.read_metadata(&session_dir) {
                Some(meta) if meta.frame_files == names => Ok(SaveReceipt {
                    session_id: session.session_id,
                    saved_location: session_dir,
                    total_frames: meta.total_frames,
                    already_saved: true,
                }),
                _ => Err(Error::AlreadySaved {
                    session_id: session.session_id,
                }),
            };
        }

        if !session.source_csv_path.is_file() {
            return Err(Error::source_unavailable(
                &session.source_csv_path,
                "annotation file no longer exists",
            ));
        }

        let frames_out = session_dir.join(constants::REVIEW_FRAMES_SUBDIR);
        fs::create_dir_all(&frames_out)?;

        let mut copied = Vec::with_capacity(working.len());
        for (name, path) in &working {
            fs::copy(path, frames_out.join(name))?;
            copied.push(name.clone());
        }

        let annotations = fs::read(&session.source_csv_path)?;
        file_utils::write_atomic(&session_dir.join(constants::REVIEW_ANNOTATIONS_FILE), &annotations)?;

        let metadata = ReviewMetadata {
            session_id: session.session_id.clone(),
            video_filename: session.video_filename.clone(),
            extraction_timestamp: session.created_at.clone(),
            saved_timestamp: time_utils::iso_now(),
            total_frames: copied.len(),
            frame_files: copied,
        };
        file_utils::write_atomic(
            &session_dir.join(constants::REVIEW_METADATA_FILE),
            &serde_json::to_vec_pretty(&metadata)?,
        )?;

        sessions.mark_saved()?;
        logger::info(&format!(
            "session {} saved to {} ({} frame(s))",
            session.session_id,
            session_dir.display(),
            metadata.total_frames
        ));

        Ok(SaveReceipt {
            session_id: session.session_id,
            saved_location: session_dir,
            total_frames: metadata.total_frames,
            already_saved: false,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReceipt {
    pub archive: PathBuf,
    pub frame_files: Vec<String>,
}

/// Packs every working frame into one zip at `archive`, entries named by
/// their file name. The archive is built in memory and written atomically.
pub fn archive_frames(frames_dir: &Path, archive: &Path) -> Result<ArchiveReceipt> {
    let working = ReviewExporter::working_frames(frames_dir)?;
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut frame_files = Vec::with_capacity(working.len());
    for (name, path) in working {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&fs::read(&path)?)?;
        frame_files.push(name);
    }
    let bytes = writer.finish()?.into_inner();
    file_utils::write_atomic(archive, &bytes)?;

    logger::info(&format!(
        "archived {} frame(s) from {} to {}",
        frame_files.len(),
        frames_dir.display(),
        archive.display()
    ));
    Ok(ArchiveReceipt {
        archive: archive.to_path_buf(),
        frame_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::tests::{request, write_annotations, FakeSource, OPTIONS};

    fn extracted(dir: &Path, frames: &[u32]) -> SessionManager {
        let csv = write_annotations(dir, frames);
        let mut sessions = SessionManager::in_memory(dir.join("frames"));
        sessions
            .extract_touches(&request(dir, csv), OPTIONS, |_| Ok(FakeSource::new(30.0, 100)))
            .wait()
            .unwrap();
        sessions
    }

    #[test]
    fn test_save_writes_frames_annotations_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut sessions = extracted(dir.path(), &[7, 3]);
        let exporter = ReviewExporter::new(dir.path().join("reviewed"));

        let receipt = exporter.save(&mut sessions).unwrap();
        assert!(!receipt.already_saved);
        assert_eq!(receipt.total_frames, 2);
        assert!(sessions.current().unwrap().saved);

        let out = &receipt.saved_location;
        assert!(out.join("frames").join("frame_000003.jpg").is_file());
        assert!(out.join("frames").join("frame_000007.jpg").is_file());
        assert_eq!(
            fs::read(out.join("annotations.csv")).unwrap(),
            fs::read(dir.path().join("clip.csv")).unwrap()
        );

        let meta: ReviewMetadata =
            serde_json::from_slice(&fs::read(out.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(meta.session_id, receipt.session_id);
        assert_eq!(meta.video_filename, "clip one.mp4");
        assert_eq!(meta.frame_files, vec!["frame_000003.jpg", "frame_000007.jpg"]);
    }

    #[test]
    fn test_resave_is_noop_until_working_frames_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut sessions = extracted(dir.path(), &[3]);
        let exporter = ReviewExporter::new(dir.path().join("reviewed"));

        exporter.save(&mut sessions).unwrap();
        let again = exporter.save(&mut sessions).unwrap();
        assert!(again.already_saved);

        fs::write(sessions.frames_dir().join("frame_000099.jpg"), b"stray").unwrap();
        assert!(matches!(
            exporter.save(&mut sessions),
            Err(Error::AlreadySaved { .. })
        ));
    }

    #[test]
    fn test_save_without_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sessions = SessionManager::in_memory(dir.path().join("frames"));
        let exporter = ReviewExporter::new(dir.path().join("reviewed"));
        assert!(matches!(exporter.save(&mut sessions), Err(Error::NoActiveSession)));
    }

    #[test]
    fn test_saved_session_can_be_cleaned_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut sessions = extracted(dir.path(), &[3]);
        ReviewExporter::new(dir.path().join("reviewed"))
            .save(&mut sessions)
            .unwrap();

        assert_eq!(sessions.cleanup(false).unwrap(), 1);
        assert!(sessions.current().is_none());
    }

    #[test]
    fn test_archive_holds_every_working_frame() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = extracted(dir.path(), &[7, 3]);
        fs::write(sessions.frames_dir().join("notes.txt"), b"ignored").unwrap();
        let out = dir.path().join("out").join("frames.zip");

        let receipt = archive_frames(sessions.frames_dir(), &out).unwrap();
        assert_eq!(receipt.frame_files, vec!["frame_000003.jpg", "frame_000007.jpg"]);

        let mut archive = zip::ZipArchive::new(fs::File::open(&out).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["frame_000003.jpg", "frame_000007.jpg"]);

        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut archive.by_name("frame_000007.jpg").unwrap(), &mut bytes).unwrap();
        assert_eq!(bytes, b"6@90");
    }

    #[test]
    fn test_archive_of_empty_working_dir_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.zip");

        let receipt = archive_frames(&dir.path().join("frames"), &out).unwrap();
        assert!(receipt.frame_files.is_empty());
        assert_eq!(zip::ZipArchive::new(fs::File::open(&out).unwrap()).unwrap().len(), 0);
    }
}
