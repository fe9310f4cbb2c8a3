use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a conversation thread (UUIDv7 — time-sortable for
/// easier log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Structural classification of a generated text fragment.
///
/// Closed set — wire-level two-letter codes are mapped here and validated at
/// the boundary; anything unrecognised degrades to `Text` instead of leaking
/// a raw code string into the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    #[serde(rename = "contract_header")]
    Header,
    #[serde(rename = "contract_body")]
    Body,
    #[serde(rename = "contract_clause")]
    Clause,
    #[serde(rename = "contract_signature")]
    Signature,
    #[serde(rename = "contract_terms")]
    Terms,
    Metadata,
    Text,
    Analysis,
}

impl SectionType {
    /// Map a two-letter stream tag (the `XX` inside `[XX]`) to a section type.
    ///
    /// Returns `None` for unknown tags — the classifier treats those as plain
    /// text rather than failing the stream.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CH" => Some(Self::Header),
            "CB" => Some(Self::Body),
            "CF" => Some(Self::Signature),
            _ => None,
        }
    }

    /// The wire name used in stream frames and stored messages.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Header => "contract_header",
            Self::Body => "contract_body",
            Self::Clause => "contract_clause",
            Self::Signature => "contract_signature",
            Self::Terms => "contract_terms",
            Self::Metadata => "metadata",
            Self::Text => "text",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for SectionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contract_header" => Ok(Self::Header),
            "contract_body" => Ok(Self::Body),
            "contract_clause" => Ok(Self::Clause),
            "contract_signature" => Ok(Self::Signature),
            "contract_terms" => Ok(Self::Terms),
            "metadata" => Ok(Self::Metadata),
            "text" => Ok(Self::Text),
            "analysis" => Ok(Self::Analysis),
            other => Err(format!("unknown section type: {other}")),
        }
    }
}

/// A classified fragment of generated text, ready for document assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSection {
    pub section_id: String,
    pub section_type: SectionType,
    pub title: String,
    pub content: String,
    /// Assembly position. Non-negative by construction.
    pub order: u32,
}

/// Aggregate statistics over a completed generation, echoed in both the
/// `document` and `completion` frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DocumentStats {
    pub word_count: usize,
    pub citation_count: usize,
    /// Validation score in [0, 1].
    pub compliance_score: f64,
}

/// Top-level processing path for an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    GeneralChat,
    ContractAnalysis,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralChat => write!(f, "general_chat"),
            Self::ContractAnalysis => write!(f, "contract_analysis"),
        }
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general_chat" => Ok(Self::GeneralChat),
            "contract_analysis" => Ok(Self::ContractAnalysis),
            other => Err(format!("unknown processing mode: {other}")),
        }
    }
}

/// Request priority for generation tasks. Stored on the task record;
/// scheduling is a deployment concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}
