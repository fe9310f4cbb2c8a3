// Verify the stream wire format matches what front-end clients expect.
// These tests pin the JSON shape — breaking them breaks deployed clients.

use mizan_core::types::SectionType;
use mizan_protocol::frames::{FramePayload, StreamFrame};
use mizan_protocol::sse::encode_frame;

fn frame(seq: u64, payload: FramePayload) -> StreamFrame {
    StreamFrame {
        seq,
        timestamp: "2026-03-01T12:00:00+00:00".to_string(),
        payload,
    }
}

#[test]
fn start_frame_shape() {
    let json = serde_json::to_string(&frame(
        0,
        FramePayload::Start {
            session_id: "0195cafe-0000-7000-8000-000000000001".into(),
        },
    ))
    .unwrap();

    assert!(json.contains(r#""event_type":"start""#));
    assert!(json.contains(r#""seq":0"#));
    assert!(json.contains(r#""session_id":"0195cafe-0000-7000-8000-000000000001""#));
}

#[test]
fn layer_progress_frame_shape() {
    let json = serde_json::to_string(&frame(
        2,
        FramePayload::LayerProgress {
            stage: "planning".into(),
            agent: "Structure Planner".into(),
            progress: 55,
        },
    ))
    .unwrap();

    assert!(json.contains(r#""event_type":"layer_progress""#));
    assert!(json.contains(r#""stage":"planning""#));
    assert!(json.contains(r#""progress":55"#));
}

#[test]
fn delta_frame_carries_section_type_wire_name() {
    let json = serde_json::to_string(&frame(
        5,
        FramePayload::Delta {
            section_type: SectionType::Header,
            content: "عقد عمل".into(),
        },
    ))
    .unwrap();

    assert!(json.contains(r#""section_type":"contract_header""#));
    assert!(json.contains(r#""content":"عقد عمل""#));
}

#[test]
fn document_and_completion_echo_same_stats() {
    let stats = mizan_core::types::DocumentStats {
        word_count: 412,
        citation_count: 3,
        compliance_score: 0.67,
    };
    let doc = serde_json::to_string(&frame(8, FramePayload::document(stats))).unwrap();
    let done = serde_json::to_string(&frame(9, FramePayload::completion(stats))).unwrap();

    for json in [&doc, &done] {
        assert!(json.contains(r#""word_count":412"#));
        assert!(json.contains(r#""citation_count":3"#));
        assert!(json.contains(r#""compliance_score":0.67"#));
    }
    assert!(doc.contains(r#""event_type":"document""#));
    assert!(done.contains(r#""event_type":"completion""#));
}

#[test]
fn error_frame_shape() {
    let json = serde_json::to_string(&frame(
        3,
        FramePayload::Error {
            code: "PROVIDER_ERROR".into(),
            message: "stream interrupted".into(),
        },
    ))
    .unwrap();

    assert!(json.contains(r#""event_type":"error""#));
    assert!(json.contains(r#""code":"PROVIDER_ERROR""#));
}

#[test]
fn end_frame_has_no_extra_fields() {
    let json = serde_json::to_string(&frame(10, FramePayload::End)).unwrap();
    assert!(json.contains(r#""event_type":"end""#));
    assert!(!json.contains("session_id"));
    assert!(!json.contains("content"));
}

#[test]
fn sse_block_format() {
    let out = encode_frame(&frame(
        1,
        FramePayload::ArchitectureInfo {
            stages: vec!["thinking".into(), "planning".into(), "execution".into()],
        },
    ));
    // exact framing: event line, data line, blank terminator
    assert!(out.starts_with("event: architecture_info\ndata: {"));
    assert!(out.ends_with("}\n\n"));
}

#[test]
fn frame_deserializes_back() {
    let json = r#"{"seq":4,"timestamp":"2026-03-01T12:00:00+00:00","event_type":"delta","section_type":"contract_body","content":"البند الأول"}"#;
    let frame: StreamFrame = serde_json::from_str(json).unwrap();
    assert_eq!(frame.seq, 4);
    match frame.payload {
        FramePayload::Delta {
            section_type,
            content,
        } => {
            assert_eq!(section_type, SectionType::Body);
            assert_eq!(content, "البند الأول");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}
