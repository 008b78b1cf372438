pub mod catalog;
pub mod export;
pub mod extractor;
pub mod frame_index;
pub mod session;
pub mod worker;
