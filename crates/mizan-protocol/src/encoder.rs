use chrono::Utc;
use tracing::warn;

use crate::frames::{FramePayload, StreamFrame};

/// Stamps payloads into ordered frames for one request stream.
///
/// Guarantees, per request:
/// - `seq` is monotonically increasing, starting at 0;
/// - `layer_progress` values never decrease (late lower values are clamped
///   to the maximum seen so far);
/// - at most one terminal frame (`error` or `end`) is emitted, and nothing
///   after it — late payloads are dropped, not reordered.
///
/// The encoder never batches or reorders: payloads become frames in exactly
/// the order they arrive.
pub struct FrameEncoder {
    next_seq: u64,
    max_progress: u8,
    closed: bool,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            max_progress: 0,
            closed: false,
        }
    }

    /// Stamp a payload into the next frame. Returns `None` when the stream
    /// has already been closed by a terminal frame.
    pub fn encode(&mut self, mut payload: FramePayload) -> Option<StreamFrame> {
        if self.closed {
            warn!(
                event = payload.event_name(),
                "dropping frame after stream close"
            );
            return None;
        }

        if let FramePayload::LayerProgress { ref mut progress, .. } = payload {
            if *progress < self.max_progress {
                *progress = self.max_progress;
            } else {
                self.max_progress = *progress;
            }
        }

        if payload.is_terminal() {
            self.closed = true;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        Some(StreamFrame {
            seq,
            timestamp: Utc::now().to_rfc3339(),
            payload,
        })
    }

    /// Whether a terminal frame has been emitted.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_core::types::SectionType;

    fn progress(stage: &str, value: u8) -> FramePayload {
        FramePayload::LayerProgress {
            stage: stage.to_string(),
            agent: "tester".to_string(),
            progress: value,
        }
    }

    #[test]
    fn seq_is_monotonic_from_zero() {
        let mut enc = FrameEncoder::new();
        let a = enc
            .encode(FramePayload::Start {
                session_id: "t-1".into(),
            })
            .unwrap();
        let b = enc.encode(progress("thinking", 10)).unwrap();
        let c = enc
            .encode(FramePayload::Delta {
                section_type: SectionType::Text,
                content: "hi".into(),
            })
            .unwrap();
        assert_eq!((a.seq, b.seq, c.seq), (0, 1, 2));
    }

    #[test]
    fn progress_never_decreases() {
        let mut enc = FrameEncoder::new();
        enc.encode(progress("thinking", 40)).unwrap();
        let late = enc.encode(progress("planning", 20)).unwrap();
        match late.payload {
            FramePayload::LayerProgress { progress, .. } => assert_eq!(progress, 40),
            other => panic!("unexpected payload: {other:?}"),
        }
        let ahead = enc.encode(progress("execution", 80)).unwrap();
        match ahead.payload {
            FramePayload::LayerProgress { progress, .. } => assert_eq!(progress, 80),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn nothing_follows_error() {
        let mut enc = FrameEncoder::new();
        enc.encode(FramePayload::Error {
            code: "PROVIDER_ERROR".into(),
            message: "upstream".into(),
        })
        .unwrap();
        assert!(enc.is_closed());
        assert!(enc.encode(FramePayload::End).is_none());
        assert!(enc
            .encode(FramePayload::Delta {
                section_type: SectionType::Text,
                content: "late".into(),
            })
            .is_none());
    }

    #[test]
    fn nothing_follows_end() {
        let mut enc = FrameEncoder::new();
        enc.encode(FramePayload::End).unwrap();
        assert!(enc.encode(progress("execution", 100)).is_none());
    }
}
