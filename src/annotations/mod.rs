pub mod codec;
pub mod record;
pub mod store;

pub use record::{AnnotationEdit, AnnotationRecord, AnnotationSet};
pub use store::{video_base_name, AnnotationStore, SaveReport};
