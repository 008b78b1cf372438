use crate::annotations::{codec, video_base_name};
use crate::core::extractor::{EncodeOptions, Extraction, Run};
use crate::core::frame_index;
use crate::decoder::FrameSource;
use crate::shared::error::{Error, Result};
use crate::utils::{file_utils, logger, time_utils};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Descriptor of the most recent extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSession {
    pub session_id: String,
    pub video_filename: String,
    pub source_csv_path: PathBuf,
    pub created_at: String,
    pub saved: bool,
}

impl ExtractionSession {
    fn new(video_filename: &str, source_csv_path: &Path) -> Self {
        let created_at = time_utils::session_stamp();
        let base = video_base_name(video_filename).replace(' ', "_");
        Self {
            session_id: format!("{}_{}", base, created_at),
            video_filename: video_filename.to_string(),
            source_csv_path: source_csv_path.to_path_buf(),
            created_at,
            saved: false,
        }
    }
}

/// Where to find the inputs of one extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub video_filename: String,
    pub video_path: PathBuf,
    pub annotations_path: PathBuf,
}

/// Owns the working frame directory and the single current-session slot.
///
/// A new extraction always replaces the previous session and wipes the
/// working directory, saved or not. When backed by a state file, every slot
/// change is written through to it.
pub struct SessionManager {
    frames_dir: PathBuf,
    state_file: Option<PathBuf>,
    current: Option<ExtractionSession>,
}

impl SessionManager {
    #[cfg(test)]
    pub fn in_memory(frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            state_file: None,
            current: None,
        }
    }

    pub fn open(frames_dir: impl Into<PathBuf>, state_file: impl Into<PathBuf>) -> Result<Self> {
        let state_file = state_file.into();
        let current = if state_file.is_file() {
            let bytes = fs::read(&state_file)?;
            serde_json::from_slice::<Option<ExtractionSession>>(&bytes)?
        } else {
            None
        };

        Ok(Self {
            frames_dir: frames_dir.into(),
            state_file: Some(state_file),
            current,
        })
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    pub fn current(&self) -> Option<&ExtractionSession> {
        self.current.as_ref()
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.state_file {
            let bytes = serde_json::to_vec_pretty(&self.current)?;
            file_utils::write_atomic(path, &bytes)?;
        }
        Ok(())
    }

    /// Wipes the working directory and installs a fresh unsaved session.
    fn begin(&mut self, request: &ExtractionRequest) -> Result<ExtractionSession> {
        if let Some(previous) = self.current.as_ref().filter(|s| !s.saved) {
            logger::warn(&format!(
                "discarding unsaved frames of session {}",
                previous.session_id
            ));
        }

        let removed = file_utils::wipe_dir(&self.frames_dir)?;
        logger::debug(&format!(
            "wiped {} file(s) from {}",
            removed,
            self.frames_dir.display()
        ));

        let session = ExtractionSession::new(&request.video_filename, &request.annotations_path);
        self.current = Some(session.clone());
        self.persist()?;
        logger::info(&format!(
            "session {} started for {}",
            session.session_id, request.video_filename
        ));
        Ok(session)
    }

    /// One frame per annotation, in frame order.
    pub fn extract_touches<S, F>(
        &mut self,
        request: &ExtractionRequest,
        options: EncodeOptions,
        open: F,
    ) -> Extraction<S>
    where
        S: FrameSource,
        F: FnOnce(&Path) -> Result<S>,
    {
        match self.prepare_touches(request, options, open) {
            Ok(run) => Extraction::running(run),
            Err(e) => Extraction::failed(e),
        }
    }

    /// Frames sampled at `sample_rate` per second, plus every annotated frame.
    pub fn extract_timeline<S, F>(
        &mut self,
        request: &ExtractionRequest,
        sample_rate: f64,
        options: EncodeOptions,
        open: F,
    ) -> Extraction<S>
    where
        S: FrameSource,
        F: FnOnce(&Path) -> Result<S>,
    {
        match self.prepare_timeline(request, sample_rate, options, open) {
            Ok(run) => Extraction::running(run),
            Err(e) => Extraction::failed(e),
        }
    }

    fn prepare_touches<S, F>(&mut self, request: &ExtractionRequest, options: EncodeOptions, open: F) -> Result<Run<S>>
    where
        S: FrameSource,
        F: FnOnce(&Path) -> Result<S>,
    {
        let annotations = codec::read_file(&request.annotations_path)?;
        if annotations.is_empty() {
            logger::warn(&format!(
                "{} has no touches; extraction will produce no frames",
                request.annotations_path.display()
            ));
        }
        let source = open(&request.video_path)?;
        let plan = frame_index::touch_plan(&annotations);
        let session = self.begin(request)?;

        Ok(Run {
            metadata: source.metadata(),
            source,
            plan,
            frames_dir: self.frames_dir.clone(),
            options,
            session,
            touch_frames: None,
        })
    }

    fn prepare_timeline<S, F>(
        &mut self,
        request: &ExtractionRequest,
        sample_rate: f64,
        options: EncodeOptions,
        open: F,
    ) -> Result<Run<S>>
    where
        S: FrameSource,
        F: FnOnce(&Path) -> Result<S>,
    {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::Validation(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }

        let annotations = codec::read_file(&request.annotations_path)?;
        let source = open(&request.video_path)?;
        let metadata = source.metadata();
        let plan = frame_index::timeline_plan(
            metadata.total_frame_count,
            metadata.fps,
            sample_rate,
            &annotations,
        )?;
        let session = self.begin(request)?;

        Ok(Run {
            metadata,
            source,
            plan,
            frames_dir: self.frames_dir.clone(),
            options,
            session,
            touch_frames: Some(annotations.len()),
        })
    }

    /// Flips the current session to saved. Saved never goes back to unsaved.
    pub fn mark_saved(&mut self) -> Result<()> {
        let session = self.current.as_mut().ok_or(Error::NoActiveSession)?;
        session.saved = true;
        self.persist()
    }

    /// Empties the working directory and forgets the session. Refused while
    /// the session is unsaved unless `force` is set.
    pub fn cleanup(&mut self, force: bool) -> Result<usize> {
        if let Some(session) = &self.current {
            if !session.saved && !force {
                return Err(Error::SaveConflict {
                    session_id: session.session_id.clone(),
                });
            }
        }

        let removed = file_utils::wipe_dir(&self.frames_dir)?;
        if let Some(session) = self.current.take() {
            logger::info(&format!(
                "session {} cleaned up ({} file(s), saved={})",
                session.session_id, removed, session.saved
            ));
        }
        self.persist()?;
        Ok(removed)
    }
}
