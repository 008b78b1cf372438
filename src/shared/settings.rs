use crate::shared::constants;
use crate::shared::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder layout and encoding knobs, read from a `key = value` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub reviewed_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub session_file: PathBuf,
    pub log_dir: PathBuf,
    pub frame_quality: i32,
    pub preview_quality: i32,
    pub single_frame_quality: i32,
    pub timeline_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(constants::DEFAULT_DATA_DIR),
            csv_dir: PathBuf::from(constants::DEFAULT_CSV_DIR),
            frames_dir: PathBuf::from(constants::DEFAULT_FRAMES_DIR),
            reviewed_dir: PathBuf::from(constants::DEFAULT_REVIEWED_DIR),
            backup_dir: PathBuf::from(constants::DEFAULT_BACKUP_DIR),
            session_file: PathBuf::from(constants::DEFAULT_SESSION_FILE),
            log_dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
            frame_quality: constants::DEFAULT_FRAME_QUALITY,
            preview_quality: constants::DEFAULT_PREVIEW_QUALITY,
            single_frame_quality: constants::DEFAULT_SINGLE_FRAME_QUALITY,
            timeline_rate: constants::DEFAULT_TIMELINE_RATE,
        }
    }
}

impl Settings {
    /// Missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut settings = Self::default();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "data-dir" => settings.data_dir = PathBuf::from(value),
                "csv-dir" => settings.csv_dir = PathBuf::from(value),
                "frames-dir" => settings.frames_dir = PathBuf::from(value),
                "reviewed-dir" => settings.reviewed_dir = PathBuf::from(value),
                "backup-dir" => settings.backup_dir = PathBuf::from(value),
                "session-file" => settings.session_file = PathBuf::from(value),
                "log-dir" => settings.log_dir = PathBuf::from(value),
                "frame-quality" => settings.frame_quality = parse_quality(key, value)?,
                "preview-quality" => settings.preview_quality = parse_quality(key, value)?,
                "single-frame-quality" => settings.single_frame_quality = parse_quality(key, value)?,
                "timeline-rate" => {
                    settings.timeline_rate = value
                        .parse()
                        .map_err(|_| Error::Validation(format!("{key}: expected a number, got '{value}'")))?
                }
                _ => {}
            }
        }

        Ok(settings)
    }
}

fn parse_quality(key: &str, value: &str) -> Result<i32> {
    match value.parse::<i32>() {
        Ok(q) if (0..=100).contains(&q) => Ok(q),
        _ => Err(Error::Validation(format!("{key}: expected 0-100, got '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides_and_ignores_unknown_keys() {
        let settings = Settings::parse(
            "# comment\nframes-dir = /tmp/frames\nframe-quality=75\nfont-size = 2.5\ntimeline-rate = 2.5\n",
        )
        .unwrap();

        assert_eq!(settings.frames_dir, PathBuf::from("/tmp/frames"));
        assert_eq!(settings.frame_quality, 75);
        assert_eq!(settings.timeline_rate, 2.5);
        assert_eq!(settings.csv_dir, PathBuf::from(constants::DEFAULT_CSV_DIR));
    }

    #[test]
    fn test_bad_quality_names_the_key() {
        let err = Settings::parse("preview-quality = high").unwrap_err();
        assert!(err.to_string().contains("preview-quality"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.config")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
