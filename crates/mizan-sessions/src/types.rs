use mizan_core::types::ProcessingMode;
use serde::{Deserialize, Serialize};

/// A conversation thread — created on the first user message, never
/// auto-deleted (retention is an external policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    /// The mode the previous turn ran in. Drives sticky routing: once a
    /// thread enters contract analysis it stays there until the topic
    /// changes.
    pub processing_mode: Option<ProcessingMode>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last update.
    pub updated_at: String,
}

/// One persisted conversation message. Append-only; never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub thread_id: String,
    /// `user` | `assistant` | `system`
    pub role: String,
    pub content: String,
    /// Structural tag from the content classifier, when the fragment carried
    /// one (wire name, e.g. `contract_header`).
    pub section_type: Option<String>,
    /// Free-form metadata: citations, confidence, stage provenance.
    pub metadata: serde_json::Value,
    pub created_at: String,
}

/// Composite key identifying one checkpoint.
///
/// `(thread_id, namespace, checkpoint_id)` is unique — the checkpoint log is
/// append-only and a duplicate key is a caller error, never an overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    pub thread_id: String,
    pub namespace: String,
    pub checkpoint_id: String,
}

impl CheckpointKey {
    pub fn new(
        thread_id: impl Into<String>,
        namespace: impl Into<String>,
        checkpoint_id: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            namespace: namespace.into(),
            checkpoint_id: checkpoint_id.into(),
        }
    }
}

impl std::fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.thread_id, self.namespace, self.checkpoint_id
        )
    }
}

/// An immutable snapshot of pipeline state, enabling exact resumption after
/// a crash or client disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub key: CheckpointKey,
    /// Optional back-reference forming a linear or branching history.
    pub parent_checkpoint_id: Option<String>,
    /// Serialized pipeline state (stage completed, accumulated plan text,
    /// routing decision).
    pub state: serde_json::Value,
    pub created_at: String,
}

/// Lifecycle status of an agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// The task resource consumed and produced by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    /// Which sub-agent family handles this task (e.g. `document_generation`).
    pub agent_type: String,
    pub status: TaskStatus,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// 0–100.
    pub progress: u8,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}
