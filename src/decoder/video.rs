use super::frame_data::VideoMetadata;
use super::FrameSource;
use crate::shared::error::{Error, Result};
use crate::utils::logger;
use opencv::{core, imgcodecs, prelude::*, videoio};
use std::path::{Path, PathBuf};

/// Random-access frame reader over an OpenCV `VideoCapture`.
///
/// The capture is released when the decoder is dropped, so every exit path
/// out of an extraction gives the file handle back.
pub struct VideoDecoder {
    capture: videoio::VideoCapture,
    path: PathBuf,
    metadata: VideoMetadata,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::source_unavailable(path, "no such video file"));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::source_unavailable(path, "path is not valid UTF-8"))?;

        // CAP_ANY lets OpenCV pick the backend available on this platform
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| Error::source_unavailable(path, e))?;

        if !capture.is_opened()? {
            logger::error(&format!("failed to open video file: {}", path.display()));
            return Err(Error::source_unavailable(path, "could not open video file"));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?;

        let metadata = VideoMetadata {
            fps,
            total_frame_count: if frame_count > 0.0 { frame_count as u64 } else { 0 },
            width: width.max(0.0) as u32,
            height: height.max(0.0) as u32,
        };

        logger::debug(&format!(
            "opened {}: {}x{} @ {:.3} fps, {} frames",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frame_count
        ));

        Ok(Self {
            capture,
            path: path.to_path_buf(),
            metadata,
        })
    }

    fn decode_failure(index: i64, reason: impl ToString) -> Error {
        Error::DecodeFailure {
            index,
            reason: reason.to_string(),
        }
    }
}

impl FrameSource for VideoDecoder {
    type Frame = core::Mat;

    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn read_frame(&mut self, index: i64) -> Result<core::Mat> {
        if !self.metadata.contains_index(index) {
            return Err(Self::decode_failure(
                index,
                format!("outside 0..{}", self.metadata.total_frame_count),
            ));
        }

        let seeked = self
            .capture
            .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
            .map_err(|e| Self::decode_failure(index, e))?;
        if !seeked {
            return Err(Self::decode_failure(index, "seek rejected by backend"));
        }

        let mut frame = core::Mat::default();
        let read = self
            .capture
            .read(&mut frame)
            .map_err(|e| Self::decode_failure(index, e))?;
        if !read || frame.empty() {
            return Err(Self::decode_failure(index, "no frame returned"));
        }

        Ok(frame)
    }

    fn encode_jpeg(&self, frame: &core::Mat, quality: i32) -> Result<Vec<u8>> {
        let params = core::Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, quality]);
        let mut buffer = core::Vector::<u8>::new();
        let encoded = imgcodecs::imencode(".jpg", frame, &mut buffer, &params).map_err(|e| {
            Error::EncodeFailure {
                quality,
                reason: e.to_string(),
            }
        })?;
        if !encoded {
            return Err(Error::EncodeFailure {
                quality,
                reason: "jpeg encoder refused the frame".to_string(),
            });
        }
        Ok(buffer.to_vec())
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            logger::error(&format!("failed to release {}: {}", self.path.display(), e));
        } else {
            logger::debug(&format!("released {}", self.path.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_video_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = VideoDecoder::open(&dir.path().join("absent.mp4"));
        assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
    }
}
