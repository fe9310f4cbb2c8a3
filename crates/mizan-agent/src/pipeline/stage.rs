use serde::{Deserialize, Serialize};

/// One phase of the pipeline. Each stage is backed by exactly one LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DirectResponse,
    Thinking,
    Planning,
    Execution,
}

impl Stage {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::DirectResponse => "direct_response",
            Self::Thinking => "thinking",
            Self::Planning => "planning",
            Self::Execution => "execution",
        }
    }

    /// Human label for the active sub-agent, shown in progress frames.
    pub fn agent_label(&self) -> &'static str {
        match self {
            Self::DirectResponse => "Legal Assistant",
            Self::Thinking => "Legal Reasoner",
            Self::Planning => "Structure Planner",
            Self::Execution => "Drafting Agent",
        }
    }

    /// Progress value reported when the stage starts.
    pub fn entry_progress(&self) -> u8 {
        match self {
            Self::DirectResponse => 10,
            Self::Thinking => 10,
            Self::Planning => 40,
            Self::Execution => 70,
        }
    }

    /// Progress value reported when the stage's LLM call completes.
    pub fn completion_progress(&self) -> u8 {
        match self {
            Self::DirectResponse => 90,
            Self::Thinking => 30,
            Self::Planning => 60,
            Self::Execution => 95,
        }
    }

    /// Rank within the full pipeline, used to decide which stages a resumed
    /// run may skip.
    pub fn rank(&self) -> u8 {
        match self {
            Self::DirectResponse => 0,
            Self::Thinking => 1,
            Self::Planning => 2,
            Self::Execution => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline_progress_is_monotonic() {
        let stages = [Stage::Thinking, Stage::Planning, Stage::Execution];
        let mut last = 0u8;
        for stage in stages {
            assert!(stage.entry_progress() > last);
            assert!(stage.completion_progress() > stage.entry_progress());
            last = stage.completion_progress();
        }
    }

    #[test]
    fn wire_names() {
        assert_eq!(Stage::Thinking.to_string(), "thinking");
        assert_eq!(Stage::DirectResponse.to_string(), "direct_response");
    }
}
