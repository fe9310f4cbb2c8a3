use mizan_core::types::{DocumentStats, SectionType};
use serde::{Deserialize, Serialize};

/// One typed frame on the response stream.
///
/// Wire: `{ "event_type": "delta", "seq": 7, "timestamp": "...", ... }` —
/// payload fields are flattened next to the envelope so clients read a flat
/// object per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Monotonically increasing per-request sequence marker, starting at 0.
    pub seq: u64,
    /// RFC3339 emission timestamp.
    pub timestamp: String,
    #[serde(flatten)]
    pub payload: FramePayload,
}

/// The typed payload of a stream frame, discriminated by `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FramePayload {
    /// Emitted once, first. Carries the session (thread) identifier.
    Start { session_id: String },

    /// Emitted once, describes the active pipeline stages. Informational.
    ArchitectureInfo { stages: Vec<String> },

    /// Per stage transition (and optionally per step within a stage).
    /// `progress` is a 0–100 value, non-decreasing within one request.
    LayerProgress {
        stage: String,
        agent: String,
        progress: u8,
    },

    /// One unit of classified, client-visible content.
    Delta {
        section_type: SectionType,
        content: String,
    },

    /// Emitted once when content assembly completes.
    Document {
        word_count: usize,
        citation_count: usize,
        compliance_score: f64,
    },

    /// Final summary — echoes the same statistics as `document`.
    Completion {
        word_count: usize,
        citation_count: usize,
        compliance_score: f64,
    },

    /// Terminal failure. At most one per request; no frames follow it.
    Error { code: String, message: String },

    /// Always the last frame on success.
    End,
}

impl FramePayload {
    /// The SSE `event:` name for this payload.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::ArchitectureInfo { .. } => "architecture_info",
            Self::LayerProgress { .. } => "layer_progress",
            Self::Delta { .. } => "delta",
            Self::Document { .. } => "document",
            Self::Completion { .. } => "completion",
            Self::Error { .. } => "error",
            Self::End => "end",
        }
    }

    /// True for `error` and `end` — nothing may follow either.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::End)
    }

    pub fn document(stats: DocumentStats) -> Self {
        Self::Document {
            word_count: stats.word_count,
            citation_count: stats.citation_count,
            compliance_score: stats.compliance_score,
        }
    }

    pub fn completion(stats: DocumentStats) -> Self {
        Self::Completion {
            word_count: stats.word_count,
            citation_count: stats.citation_count,
            compliance_score: stats.compliance_score,
        }
    }
}
