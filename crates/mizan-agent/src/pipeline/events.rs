use mizan_core::types::{DocumentStats, SectionType};

use super::stage::Stage;

/// Progress signals and content emitted by a running pipeline.
///
/// Consumed by the gateway's frame encoder, which maps them 1:1 onto wire
/// frames. Events are emitted in order; the channel is the only coupling
/// between the pipeline and the transport.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Pipeline accepted the request. Always first.
    Started { thread_id: String },

    /// The stages this run will execute, in order. Informational.
    Architecture { stages: Vec<String> },

    /// A stage transition or an intermediate step within a stage.
    StageProgress { stage: Stage, progress: u8 },

    /// One unit of classified, client-visible content
    /// (DIRECT_RESPONSE or EXECUTION only).
    Delta {
        section_type: SectionType,
        text: String,
    },

    /// Content assembly finished (full pipeline only).
    Document { stats: DocumentStats },

    /// Final summary echoing the document statistics.
    Completed { stats: DocumentStats },

    /// Terminal failure. No events follow.
    Failed { code: String, message: String },

    /// Terminal success marker. Always last on the happy path.
    Finished,
}
