//! Maps touch annotations and a sampling rate onto decoder frame indices.
//!
//! Annotations count frames from 1; the decoder addresses them from 0. The
//! two conversions below are the only place that difference is spelled out.

use crate::annotations::{AnnotationRecord, AnnotationSet};
use crate::shared::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// 1-based annotation frame number to 0-based decoder index.
pub fn to_decoder_index(frame_number: u32) -> u64 {
    u64::from(frame_number.saturating_sub(1))
}

/// 0-based decoder index to 1-based annotation frame number.
pub fn to_frame_number(index: u64) -> u32 {
    (index + 1).min(u64::from(u32::MAX)) as u32
}

/// Seconds from the start of the video for a decoder index; 0 when the
/// frame rate is unknown.
pub fn index_time(index: u64, fps: f64) -> f64 {
    if fps > 0.0 {
        index as f64 / fps
    } else {
        0.0
    }
}

/// Seconds for a 1-based frame number: `(n - 1) / fps`.
pub fn frame_number_time(frame_number: u32, fps: f64) -> f64 {
    index_time(to_decoder_index(frame_number), fps)
}

/// One frame to pull out of the video.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub index: u64,
    pub frame_number: u32,
    pub time_seconds: f64,
    pub is_touch: bool,
    pub body_part: String,
    pub timestamp: String,
}

impl FrameRequest {
    fn for_touch(record: &AnnotationRecord) -> Self {
        Self {
            index: to_decoder_index(record.frame_number),
            frame_number: record.frame_number,
            time_seconds: record.time_seconds,
            is_touch: true,
            body_part: record.body_part.clone(),
            timestamp: record.timestamp.clone(),
        }
    }
}

/// One request per annotation, in annotation order.
pub fn touch_plan(annotations: &AnnotationSet) -> Vec<FrameRequest> {
    annotations.iter().map(FrameRequest::for_touch).collect()
}

/// Sampling stride for the timeline. Rates at or above the source rate take
/// every frame.
pub fn sample_interval(source_fps: f64, target_rate: f64) -> Result<u64> {
    if !(target_rate.is_finite() && target_rate > 0.0) {
        return Err(Error::Validation(format!(
            "sample rate must be positive, got {target_rate}"
        )));
    }
    if target_rate >= source_fps {
        return Ok(1);
    }
    Ok(((source_fps / target_rate).floor() as u64).max(1))
}

/// Evenly spaced indices over `[0, total_frames)` merged with every annotated
/// frame, ascending and free of duplicates.
pub fn timeline_indices(total_frames: u64, interval: u64, touch_frames: &BTreeSet<u32>) -> Vec<u64> {
    let mut indices: BTreeSet<u64> = (0..total_frames).step_by(interval.max(1) as usize).collect();
    indices.extend(touch_frames.iter().map(|&n| to_decoder_index(n)));
    indices.into_iter().collect()
}

/// Timeline extraction plan: the sampled backbone plus every touch, each
/// request marked with whether an annotation sits on it.
pub fn timeline_plan(
    total_frames: u64,
    source_fps: f64,
    target_rate: f64,
    annotations: &AnnotationSet,
) -> Result<Vec<FrameRequest>> {
    let interval = sample_interval(source_fps, target_rate)?;
    let touches: BTreeMap<u32, &AnnotationRecord> =
        annotations.iter().map(|r| (r.frame_number, r)).collect();
    let plan = timeline_indices(total_frames, interval, &annotations.frame_numbers())
        .into_iter()
        .map(|index| {
            let frame_number = to_frame_number(index);
            let touch = touches.get(&frame_number);
            FrameRequest {
                index,
                frame_number,
                time_seconds: index_time(index, source_fps),
                is_touch: touch.is_some(),
                body_part: touch.map(|r| r.body_part.clone()).unwrap_or_default(),
                timestamp: touch.map(|r| r.timestamp.clone()).unwrap_or_default(),
            }
        })
        .collect();

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touches(frames: &[u32]) -> AnnotationSet {
        AnnotationSet::from_records(frames.iter().map(|&n| AnnotationRecord {
            frame_number: n,
            time_seconds: frame_number_time(n, 30.0),
            body_part: format!("part-{n}"),
            timestamp: String::new(),
        }))
    }

    #[test]
    fn test_index_conversions_both_directions() {
        assert_eq!(to_decoder_index(1), 0);
        assert_eq!(to_decoder_index(200), 199);
        assert_eq!(to_frame_number(0), 1);
        assert_eq!(to_frame_number(199), 200);
        for n in [1u32, 2, 57, 1_000_000] {
            assert_eq!(to_frame_number(to_decoder_index(n)), n);
        }
    }

    #[test]
    fn test_touch_plan_keeps_length_and_order() {
        let set = touches(&[90, 3, 41]);
        let plan = touch_plan(&set);
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan.iter().map(|r| (r.frame_number, r.index)).collect::<Vec<_>>(),
            vec![(3, 2), (41, 40), (90, 89)]
        );
        assert!(plan.iter().all(|r| r.is_touch));
    }

    #[test]
    fn test_interval_rounding() {
        assert_eq!(sample_interval(30.0, 5.0).unwrap(), 6);
        assert_eq!(sample_interval(29.97, 5.0).unwrap(), 5);
        assert_eq!(sample_interval(30.0, 30.0).unwrap(), 1);
        assert_eq!(sample_interval(24.0, 60.0).unwrap(), 1);
        assert!(matches!(sample_interval(30.0, 0.0), Err(Error::Validation(_))));
        assert!(sample_interval(30.0, -2.0).is_err());
    }

    #[test]
    fn test_base_schedule_at_30fps_5hz() {
        let indices = timeline_indices(300, sample_interval(30.0, 5.0).unwrap(), &BTreeSet::new());
        assert_eq!(indices.len(), 50);
        assert_eq!(indices.first(), Some(&0));
        assert_eq!(indices.last(), Some(&294));
        assert!(indices.iter().all(|i| i % 6 == 0));
    }

    #[test]
    fn test_timeline_merges_touches_off_grid() {
        let set = touches(&[1, 8, 14, 400]);
        let plan = timeline_plan(300, 30.0, 5.0, &set).unwrap();
        let indices: Vec<u64> = plan.iter().map(|r| r.index).collect();

        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        for n in set.frame_numbers() {
            assert!(indices.contains(&to_decoder_index(n)));
        }
        // 50 grid points, frame 1 already on grid, 8/14/400 added
        assert_eq!(indices.len(), 53);

        let on_seven = plan.iter().find(|r| r.index == 7).unwrap();
        assert!(on_seven.is_touch);
        assert_eq!(on_seven.body_part, "part-8");

        let on_six = plan.iter().find(|r| r.index == 6).unwrap();
        assert!(!on_six.is_touch);
        assert_eq!(on_six.body_part, "");
        assert_eq!(on_six.time_seconds, 0.2);
    }

    #[test]
    fn test_timeline_time_is_zero_without_fps() {
        let plan = timeline_plan(3, 0.0, 5.0, &AnnotationSet::new()).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|r| r.time_seconds == 0.0));
    }
}
