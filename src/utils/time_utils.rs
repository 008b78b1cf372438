use std::time::Instant;

pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Local wall-clock stamp used in session ids, e.g. `2024-03-01_14-05-09`.
pub fn session_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Compact local stamp for archive names, e.g. `20240301_140509`.
pub fn archive_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Local wall-clock time in ISO-8601 for saved metadata.
pub fn iso_now() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// UTC time with a `Z` suffix for newly created annotations.
pub fn annotation_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stamp_shape() {
        let stamp = session_stamp();
        assert_eq!(stamp.len(), "2024-03-01_14-05-09".len());
        assert_eq!(&stamp[10..11], "_");
    }

    #[test]
    fn test_annotation_timestamp_is_utc() {
        assert!(annotation_timestamp().ends_with('Z'));
    }
}
