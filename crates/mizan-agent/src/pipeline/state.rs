use mizan_core::types::{DocumentStats, ProcessingMode, SectionType};
use serde::{Deserialize, Serialize};

use super::stage::Stage;

/// Serialized pipeline state stored in checkpoints.
///
/// Enough to resume an interrupted run: which stage last completed, the
/// accumulated intermediate text, and the user message the run serves (a
/// resumed run must not splice state from a different turn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// The sanitized user message this run serves.
    pub message: String,
    pub mode: ProcessingMode,
    /// Last stage whose LLM call completed.
    pub stage_completed: Stage,
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub plan: String,
    /// True once the run reached END — terminal checkpoints are never
    /// resumed from.
    #[serde(default)]
    pub terminal: bool,
}

/// Running statistics over Execution output, folded per classified unit.
#[derive(Debug, Default)]
pub struct DocumentTally {
    words: usize,
    citations: usize,
    saw_header: bool,
    saw_body: bool,
    saw_signature: bool,
}

impl DocumentTally {
    pub fn record(&mut self, section: SectionType, text: &str) {
        self.words += text.split_whitespace().count();
        self.citations += count_citations(text);
        match section {
            SectionType::Header => self.saw_header = true,
            SectionType::Body | SectionType::Clause | SectionType::Terms => self.saw_body = true,
            SectionType::Signature => self.saw_signature = true,
            _ => {}
        }
    }

    /// Compliance score: fraction of the three structural section kinds
    /// (header, body, signature) present in the output.
    pub fn stats(&self) -> DocumentStats {
        let kinds =
            self.saw_header as usize + self.saw_body as usize + self.saw_signature as usize;
        DocumentStats {
            word_count: self.words,
            citation_count: self.citations,
            compliance_score: (kinds as f64 / 3.0).clamp(0.0, 1.0),
        }
    }
}

/// Count legal citations: statutory article references in either language
/// plus section-sign references.
fn count_citations(text: &str) -> usize {
    let lower = text.to_lowercase();
    count_occurrences(&lower, "article ")
        + count_occurrences(text, "المادة")
        + count_occurrences(text, "§")
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_words_and_citations() {
        let mut tally = DocumentTally::default();
        tally.record(SectionType::Body, "Pursuant to Article 74 and Article 75");
        tally.record(SectionType::Body, "وفقاً للمادة 80 من نظام العمل");
        let stats = tally.stats();
        assert_eq!(stats.citation_count, 3);
        assert!(stats.word_count > 0);
    }

    #[test]
    fn compliance_requires_all_three_kinds() {
        let mut tally = DocumentTally::default();
        tally.record(SectionType::Header, "عقد عمل");
        assert!((tally.stats().compliance_score - 1.0 / 3.0).abs() < 1e-9);

        tally.record(SectionType::Body, "terms");
        tally.record(SectionType::Signature, "signatures");
        assert!((tally.stats().compliance_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn plain_text_does_not_count_toward_compliance() {
        let mut tally = DocumentTally::default();
        tally.record(SectionType::Text, "some commentary");
        assert_eq!(tally.stats().compliance_score, 0.0);
    }

    #[test]
    fn state_roundtrips_through_json() {
        let state = PipelineState {
            message: "draft a contract".into(),
            mode: ProcessingMode::ContractAnalysis,
            stage_completed: Stage::Planning,
            thinking: "notes".into(),
            plan: "1. header".into(),
            terminal: false,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["stage_completed"], "planning");
        let back: PipelineState = serde_json::from_value(json).unwrap();
        assert_eq!(back.stage_completed, Stage::Planning);
        assert!(!back.terminal);
    }
}
