//! Shared SSE plumbing: spawns a pipeline run and adapts its event channel
//! into an ordered frame stream on the response body.
//!
//! The pipeline and the encoder are connected by nothing but the channel —
//! when the client disconnects, the response stream (and with it the
//! receiver) is dropped, which cancels the run.

use axum::response::sse::{Event, KeepAlive, Sse};
use mizan_agent::pipeline::{run_pipeline, PipelineEvent, PipelineRequest};
use mizan_agent::runtime::AgentRuntime;
use mizan_protocol::{FrameEncoder, FramePayload};
use mizan_sessions::SessionStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Map a pipeline event onto its wire payload. 1:1 and order-preserving.
fn payload_for(event: PipelineEvent) -> FramePayload {
    match event {
        PipelineEvent::Started { thread_id } => FramePayload::Start {
            session_id: thread_id,
        },
        PipelineEvent::Architecture { stages } => FramePayload::ArchitectureInfo { stages },
        PipelineEvent::StageProgress { stage, progress } => FramePayload::LayerProgress {
            stage: stage.wire_name().to_string(),
            agent: stage.agent_label().to_string(),
            progress,
        },
        PipelineEvent::Delta { section_type, text } => FramePayload::Delta {
            section_type,
            content: text,
        },
        PipelineEvent::Document { stats } => FramePayload::document(stats),
        PipelineEvent::Completed { stats } => FramePayload::completion(stats),
        PipelineEvent::Failed { code, message } => FramePayload::Error { code, message },
        PipelineEvent::Finished => FramePayload::End,
    }
}

/// Spawn the pipeline and return its SSE response.
///
/// `task` optionally ties the run to a task record whose status/progress is
/// updated as events pass through.
pub fn pipeline_sse(
    agent: Arc<AgentRuntime>,
    store: Option<Arc<SessionStore>>,
    task: Option<(Arc<SessionStore>, String)>,
    req: PipelineRequest,
) -> Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(64);
    tokio::spawn(run_pipeline(agent, store, req, tx));

    let stream = async_stream::stream! {
        let mut encoder = FrameEncoder::new();
        while let Some(event) = rx.recv().await {
            if let Some((ref task_store, ref task_id)) = task {
                track_task(task_store, task_id, &event);
            }

            let Some(frame) = encoder.encode(payload_for(event)) else {
                continue;
            };
            let json = serde_json::to_string(&frame).unwrap_or_default();
            // `delta` frames go out as bare data lines; everything else is a
            // named event — same convention as mizan_protocol::sse.
            let sse_event = match frame.payload {
                FramePayload::Delta { .. } => Event::default().data(json),
                _ => Event::default()
                    .event(frame.payload.event_name())
                    .data(json),
            };
            yield Ok(sse_event);
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Mirror pipeline progress onto the task record.
fn track_task(store: &SessionStore, task_id: &str, event: &PipelineEvent) {
    let result = match event {
        PipelineEvent::StageProgress { progress, .. } => store.task_processing(task_id, *progress),
        PipelineEvent::Document { stats } => store.task_completed(
            task_id,
            serde_json::json!({
                "word_count": stats.word_count,
                "citation_count": stats.citation_count,
                "compliance_score": stats.compliance_score,
            }),
        ),
        PipelineEvent::Failed { message, .. } => store.task_failed(task_id, message),
        _ => return,
    };
    if let Err(e) = result {
        warn!(task = %task_id, error = %e, "task update failed");
    }
}
