use crate::annotations::{video_base_name, AnnotationRecord, AnnotationStore};
use crate::core::frame_index;
use crate::decoder::{FrameSource, VideoMetadata};
use crate::shared::constants;
use crate::shared::error::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub fps: f64,
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
    /// Seconds, rounded to two decimals.
    pub duration: f64,
}

impl From<VideoMetadata> for VideoSummary {
    fn from(meta: VideoMetadata) -> Self {
        Self {
            fps: meta.fps,
            total_frames: meta.total_frame_count,
            width: meta.width,
            height: meta.height,
            duration: (meta.duration_seconds() * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoEntry {
    pub filename: String,
    pub base_name: String,
    pub has_csv: bool,
    pub csv_filename: Option<String>,
    pub file_size: u64,
    pub video_info: Option<VideoSummary>,
}

pub fn is_video_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    constants::VIDEO_EXTENSIONS.iter().any(|allowed| *allowed == ext)
}

/// Videos in `data_dir`, sorted by file name. `probe` supplies metadata; a
/// video it cannot open is still listed, without metadata.
pub fn list_videos<F>(data_dir: &Path, store: &AnnotationStore, mut probe: F) -> Result<Vec<VideoEntry>>
where
    F: FnMut(&Path) -> Result<VideoMetadata>,
{
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut videos = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_video_file(&path) {
            continue;
        }
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        let has_csv = store.exists(&filename);
        let base_name = video_base_name(&filename);
        videos.push(VideoEntry {
            csv_filename: has_csv.then(|| format!("{base_name}.csv")),
            base_name,
            has_csv,
            file_size: fs::metadata(&path)?.len(),
            video_info: probe(&path).ok().map(VideoSummary::from),
            filename,
        });
    }

    videos.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(videos)
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationCheck {
    pub has_csv: bool,
    pub csv_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub csv_preview: Vec<AnnotationRecord>,
}

pub fn check_annotations(store: &AnnotationStore, video_filename: &str) -> Result<AnnotationCheck> {
    let csv_filename = format!("{}.csv", video_base_name(video_filename));
    if !store.exists(video_filename) {
        return Ok(AnnotationCheck {
            has_csv: false,
            csv_filename,
            annotation_count: None,
            csv_preview: Vec::new(),
        });
    }

    let set = store.load(video_filename)?;
    Ok(AnnotationCheck {
        has_csv: true,
        csv_filename,
        annotation_count: Some(set.len()),
        csv_preview: set.iter().take(constants::CSV_PREVIEW_ROWS).cloned().collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FramePreview {
    /// 0-based, as requested.
    pub index: i64,
    pub time_seconds: f64,
    #[serde(skip)]
    pub jpeg: Vec<u8>,
}

/// Reads one frame by 0-based index for inspection.
pub fn preview_frame<S: FrameSource>(source: &mut S, index: i64, quality: i32) -> Result<FramePreview> {
    let meta = source.metadata();
    if !meta.contains_index(index) {
        return Err(Error::Validation(format!(
            "frame index {index} outside 0..{}",
            meta.total_frame_count
        )));
    }

    let frame = source.read_frame(index)?;
    Ok(FramePreview {
        index,
        time_seconds: frame_index::index_time(index as u64, meta.fps),
        jpeg: source.encode_jpeg(&frame, quality)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::tests::FakeSource;

    #[test]
    fn test_list_videos_filters_sorts_and_pairs_csv() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let csv = dir.path().join("csv");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&csv).unwrap();
        fs::write(data.join("b.MP4"), b"1234").unwrap();
        fs::write(data.join("a.mov"), b"12").unwrap();
        fs::write(data.join("notes.txt"), b"x").unwrap();
        fs::write(csv.join("b.csv"), "Frame Number,Time (seconds),Body Part,Timestamp\n").unwrap();
        let store = AnnotationStore::new(&csv, dir.path().join("backup"));

        let videos = list_videos(&data, &store, |path| {
            if path.ends_with("a.mov") {
                Err(Error::source_unavailable(path, "corrupt"))
            } else {
                Ok(FakeSource::new(25.0, 1001).metadata)
            }
        })
        .unwrap();

        let names: Vec<_> = videos.iter().map(|v| v.filename.as_str()).collect();
        assert_eq!(names, vec!["a.mov", "b.MP4"]);
        assert!(videos[0].video_info.is_none());
        assert!(!videos[0].has_csv);
        assert_eq!(videos[1].csv_filename.as_deref(), Some("b.csv"));
        assert_eq!(videos[1].file_size, 4);
        assert_eq!(videos[1].video_info.as_ref().unwrap().duration, 40.04);
    }

    #[test]
    fn test_check_annotations_previews_first_rows() {
        let dir = tempfile::tempdir().unwrap();
        let csv_dir = dir.path().join("csv");
        fs::create_dir_all(&csv_dir).unwrap();
        let mut body = String::from("Frame Number,Time (seconds),Body Part,Timestamp\n");
        for n in (1..=8).rev() {
            body.push_str(&format!("{n},0.1,Head,\n"));
        }
        fs::write(csv_dir.join("clip.csv"), body).unwrap();
        let store = AnnotationStore::new(&csv_dir, dir.path().join("backup"));

        let check = check_annotations(&store, "clip.mp4").unwrap();
        assert!(check.has_csv);
        assert_eq!(check.annotation_count, Some(8));
        let frames: Vec<_> = check.csv_preview.iter().map(|r| r.frame_number).collect();
        assert_eq!(frames, vec![1, 2, 3, 4, 5]);

        let missing = check_annotations(&store, "other.mp4").unwrap();
        assert!(!missing.has_csv);
        assert_eq!(missing.csv_filename, "other.csv");
    }

    #[test]
    fn test_preview_frame_bounds() {
        let mut source = FakeSource::new(25.0, 10);
        let preview = preview_frame(&mut source, 5, 85).unwrap();
        assert_eq!(preview.time_seconds, 0.2);
        assert_eq!(preview.jpeg, b"5@85");

        assert!(matches!(preview_frame(&mut source, 10, 85), Err(Error::Validation(_))));
        assert!(matches!(preview_frame(&mut source, -1, 85), Err(Error::Validation(_))));
        assert_eq!(source.reads, vec![5]);
    }
}
