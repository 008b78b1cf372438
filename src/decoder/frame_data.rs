use serde::Serialize;

/// Properties reported by an opened video. Read fresh for every operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub fps: f64,
    pub total_frame_count: u64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frame_count as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn contains_index(&self, index: i64) -> bool {
        index >= 0 && (index as u64) < self.total_frame_count
    }

    pub fn info(&self) -> VideoInfo {
        VideoInfo {
            fps: self.fps,
            total_frames: self.total_frame_count,
            duration: self.duration_seconds(),
        }
    }
}

/// The `video_info` block reported with every extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub fps: f64,
    pub total_frames: u64,
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_bounds() {
        let meta = VideoMetadata {
            fps: 25.0,
            total_frame_count: 250,
            width: 1920,
            height: 1080,
        };
        assert_eq!(meta.duration_seconds(), 10.0);
        assert!(meta.contains_index(0));
        assert!(meta.contains_index(249));
        assert!(!meta.contains_index(250));
        assert!(!meta.contains_index(-1));

        let unknown_rate = VideoMetadata { fps: 0.0, ..meta };
        assert_eq!(unknown_rate.duration_seconds(), 0.0);
    }
}
