pub mod frame_data;
pub mod video;

pub use frame_data::{VideoInfo, VideoMetadata};
pub use video::VideoDecoder;

use crate::shared::error::Result;

/// Random-access, one-frame-at-a-time access to a video.
///
/// `read_frame` addresses frames from 0 and must fail for negative indices or
/// indices at or past `total_frame_count`.
pub trait FrameSource {
    type Frame;

    fn metadata(&self) -> VideoMetadata;

    fn read_frame(&mut self, index: i64) -> Result<Self::Frame>;

    fn encode_jpeg(&self, frame: &Self::Frame, quality: i32) -> Result<Vec<u8>>;
}
