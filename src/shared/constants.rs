pub const APP_NAME: &str = "touchframe";

pub const CONFIG_FILE: &str = "touchframe.config";
pub const ERROR_LOG_FILE: &str = "touchframe-error.log";
pub const DEBUG_LOG_FILE: &str = "touchframe-debug.log";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CSV_DIR: &str = "csv";
pub const DEFAULT_FRAMES_DIR: &str = "extracted_frames";
pub const DEFAULT_REVIEWED_DIR: &str = "reviewed_extracted_frames";
pub const DEFAULT_BACKUP_DIR: &str = "backup_csv";
pub const DEFAULT_SESSION_FILE: &str = "extraction_session.json";
pub const DEFAULT_LOG_DIR: &str = ".";

pub const DEFAULT_FRAME_QUALITY: i32 = 90;
pub const DEFAULT_PREVIEW_QUALITY: i32 = 50;
pub const DEFAULT_SINGLE_FRAME_QUALITY: i32 = 85;
pub const DEFAULT_TIMELINE_RATE: f64 = 5.0;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
pub const FRAME_EXTENSION: &str = "jpg";

/// Column order of every annotation file we read or write.
pub const ANNOTATION_COLUMNS: [&str; 4] = ["Frame Number", "Time (seconds)", "Body Part", "Timestamp"];

pub const REVIEW_FRAMES_SUBDIR: &str = "frames";
pub const REVIEW_ANNOTATIONS_FILE: &str = "annotations.csv";
pub const REVIEW_METADATA_FILE: &str = "metadata.json";
pub const BACKUP_SUFFIX: &str = "_original.csv";

pub const DEFAULT_BODY_PART: &str = "Right Foot";
pub const CSV_PREVIEW_ROWS: usize = 5;
