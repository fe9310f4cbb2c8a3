//! Server-Sent-Events wire encoding for stream frames.
//!
//! Each frame is `event: <type>\ndata: <json>\n\n`. The `delta` type omits
//! the `event:` line per client convention — bare `data:` lines default to
//! the `message` event, which the front end treats as content.

use crate::frames::{FramePayload, StreamFrame};

/// Encode a frame as a complete SSE block, including the trailing blank line.
pub fn encode_frame(frame: &StreamFrame) -> String {
    let json = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    match frame.payload {
        FramePayload::Delta { .. } => format!("data: {json}\n\n"),
        _ => format!("event: {}\ndata: {json}\n\n", frame.payload.event_name()),
    }
}
