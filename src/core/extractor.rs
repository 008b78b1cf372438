use crate::core::frame_index::FrameRequest;
use crate::core::session::ExtractionSession;
use crate::decoder::{FrameSource, VideoInfo, VideoMetadata};
use crate::shared::error::Error;
use crate::utils::logger;
use crate::utils::time_utils::Timer;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Deterministic working-directory name for a 1-based frame number.
pub fn frame_filename(frame_number: u32) -> String {
    format!("frame_{:06}.jpg", frame_number)
}

/// JPEG qualities for the stored frame and the inline preview.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    pub frame_quality: i32,
    pub preview_quality: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedFrame {
    pub frame_number: u32,
    pub time_seconds: f64,
    pub body_part: String,
    pub timestamp: String,
    pub filename: String,
    pub is_touch: bool,
    /// Low-quality JPEG for inline display.
    #[serde(skip)]
    pub thumbnail: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub frames: Vec<ExtractedFrame>,
    pub total_frames: usize,
    /// Timeline runs only: how many annotated frames the plan carried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touch_frames: Option<usize>,
    pub session: ExtractionSession,
    pub video_info: VideoInfo,
}

#[derive(Debug)]
pub enum ExtractionEvent {
    Progress {
        current: usize,
        total: usize,
        frame_number: u32,
    },
    Complete(ExtractionSummary),
    Failed(Error),
}

impl ExtractionEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExtractionEvent::Progress { .. })
    }
}

/// Everything a run needs once setup has succeeded.
pub(crate) struct Run<S: FrameSource> {
    pub source: S,
    pub metadata: VideoMetadata,
    pub plan: Vec<FrameRequest>,
    pub frames_dir: PathBuf,
    pub options: EncodeOptions,
    pub session: ExtractionSession,
    pub touch_frames: Option<usize>,
}

struct Progressing<S: FrameSource> {
    run: Run<S>,
    position: usize,
    extracted: Vec<ExtractedFrame>,
    timer: Timer,
}

enum Step {
    Progress(ExtractionEvent),
    Finished,
    Failed(Error),
}

impl<S: FrameSource> Progressing<S> {
    fn step(&mut self) -> Step {
        let total = self.run.plan.len();
        while self.position < total {
            let request = self.run.plan[self.position].clone();
            self.position += 1;

            match self.extract_one(&request) {
                Ok(Some(frame)) => {
                    self.extracted.push(frame);
                    return Step::Progress(ExtractionEvent::Progress {
                        current: self.position,
                        total,
                        frame_number: request.frame_number,
                    });
                }
                Ok(None) => continue,
                Err(e) => return Step::Failed(e),
            }
        }
        Step::Finished
    }

    /// `Ok(None)` means the frame was skipped; `Err` aborts the run.
    fn extract_one(&mut self, request: &FrameRequest) -> Result<Option<ExtractedFrame>, Error> {
        let index = request.index as i64;
        let encoded = self.run.source.read_frame(index).and_then(|frame| {
            let full = self.run.source.encode_jpeg(&frame, self.run.options.frame_quality)?;
            let preview = self.run.source.encode_jpeg(&frame, self.run.options.preview_quality)?;
            Ok((full, preview))
        });

        let (full, preview) = match encoded {
            Ok(pair) => pair,
            Err(e) => {
                logger::warn(&format!(
                    "skipping frame {} (index {}): {}",
                    request.frame_number, index, e
                ));
                return Ok(None);
            }
        };

        let filename = frame_filename(request.frame_number);
        fs::write(self.run.frames_dir.join(&filename), &full)?;

        Ok(Some(ExtractedFrame {
            frame_number: request.frame_number,
            time_seconds: request.time_seconds,
            body_part: request.body_part.clone(),
            timestamp: request.timestamp.clone(),
            filename,
            is_touch: request.is_touch,
            thumbnail: preview,
        }))
    }

    fn finish(self) -> ExtractionSummary {
        logger::info(&format!(
            "session {}: extracted {}/{} frame(s) in {} ms",
            self.run.session.session_id,
            self.extracted.len(),
            self.run.plan.len(),
            self.timer.elapsed_ms()
        ));

        ExtractionSummary {
            total_frames: self.extracted.len(),
            frames: self.extracted,
            touch_frames: self.run.touch_frames,
            session: self.run.session,
            video_info: self.run.metadata.info(),
        }
    }
}

enum State<S: FrameSource> {
    Running(Progressing<S>),
    Failed(Error),
    Done,
}

/// A single extraction run as a lazy event stream.
///
/// Yields `Progress` events in processing order, then exactly one `Complete`
/// or `Failed`, then nothing. The video source is dropped, and so released,
/// as soon as the terminal event is produced.
pub struct Extraction<S: FrameSource> {
    state: State<S>,
}

impl<S: FrameSource> Extraction<S> {
    pub(crate) fn running(run: Run<S>) -> Self {
        Self {
            state: State::Running(Progressing {
                extracted: Vec::with_capacity(run.plan.len()),
                run,
                position: 0,
                timer: Timer::new(),
            }),
        }
    }

    pub(crate) fn failed(error: Error) -> Self {
        Self {
            state: State::Failed(error),
        }
    }

    /// Drains the stream, discarding progress.
    #[cfg(test)]
    pub fn wait(self) -> Result<ExtractionSummary, Error> {
        for event in self {
            match event {
                ExtractionEvent::Complete(summary) => return Ok(summary),
                ExtractionEvent::Failed(e) => return Err(e),
                ExtractionEvent::Progress { .. } => {}
            }
        }
        // only reachable when the stream was already drained
        Err(Error::NoActiveSession)
    }
}

impl<S: FrameSource> Iterator for Extraction<S> {
    type Item = ExtractionEvent;

    fn next(&mut self) -> Option<ExtractionEvent> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Failed(e) => {
                logger::error(&format!("extraction failed: {}", e));
                Some(ExtractionEvent::Failed(e))
            }
            State::Running(mut progressing) => match progressing.step() {
                Step::Progress(event) => {
                    self.state = State::Running(progressing);
                    Some(event)
                }
                Step::Finished => Some(ExtractionEvent::Complete(progressing.finish())),
                Step::Failed(e) => {
                    logger::error(&format!(
                        "session {}: extraction aborted: {}",
                        progressing.run.session.session_id, e
                    ));
                    Some(ExtractionEvent::Failed(e))
                }
            },
        }
    }
}
