use crate::core::extractor::{Extraction, ExtractionEvent};
use crate::decoder::FrameSource;
use crate::utils::logger;
use crossbeam_channel::Sender;
use std::thread::JoinHandle;

/// Drives an extraction on its own thread, forwarding each event over
/// `sender`. The thread stops early if the receiver goes away.
pub fn spawn_extraction<S>(extraction: Extraction<S>, sender: Sender<ExtractionEvent>) -> JoinHandle<()>
where
    S: FrameSource + Send + 'static,
{
    std::thread::spawn(move || {
        logger::debug("extraction thread started");
        for event in extraction {
            let terminal = event.is_terminal();
            if sender.send(event).is_err() {
                logger::debug("extraction receiver dropped");
                break;
            }
            if terminal {
                break;
            }
        }
        logger::debug("extraction thread exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::tests::{request, write_annotations, FakeSource, OPTIONS};
    use crate::core::session::SessionManager;

    #[test]
    fn test_events_arrive_in_order_and_end_with_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_annotations(dir.path(), &[4, 2, 9]);
        let mut sessions = SessionManager::in_memory(dir.path().join("frames"));
        let extraction =
            sessions.extract_touches(&request(dir.path(), csv), OPTIONS, |_| Ok(FakeSource::new(30.0, 100)));

        let (sender, receiver) = crossbeam_channel::bounded(2);
        let handle = spawn_extraction(extraction, sender);
        let events: Vec<ExtractionEvent> = receiver.iter().collect();
        handle.join().unwrap();

        let frames: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Progress { frame_number, .. } => Some(*frame_number),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![2, 4, 9]);
        assert!(matches!(events.last(), Some(ExtractionEvent::Complete(_))));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }
}
