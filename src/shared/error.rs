use std::path::PathBuf;

/// Failure taxonomy shared by the annotation store, the decoder adapter and
/// the extraction session manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Annotation file or video missing, unreadable or unopenable.
    #[error("source unavailable: {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// A single frame could not be seeked or read.
    #[error("could not decode frame at index {index}: {reason}")]
    DecodeFailure { index: i64, reason: String },

    /// A decoded frame could not be turned into a JPEG.
    #[error("could not encode frame as jpeg (quality {quality}): {reason}")]
    EncodeFailure { quality: i32, reason: String },

    /// Malformed annotation row or invalid request parameter.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsaved frames exist for session {session_id}; save them first or force the cleanup")]
    SaveConflict { session_id: String },

    #[error("frames already saved for session {session_id}")]
    AlreadySaved { session_id: String },

    #[error("no active extraction session")]
    NoActiveSession,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    OpenCv(#[from] opencv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
