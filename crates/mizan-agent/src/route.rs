//! Routing decision — pure functions, no I/O, so the rules can be
//! table-tested without ever touching an LLM.
//!
//! Top level: general conversation vs. contract analysis. Within the
//! document path, a complexity estimate decides between a single direct
//! response and the full thinking → planning → execution pipeline.

use mizan_core::types::ProcessingMode;

/// Bilingual keyword set denoting contracts/agreements/terms/signatures/
/// clauses/legal matters. Matched case-insensitively as substrings.
const CONTRACT_KEYWORDS: &[&str] = &[
    "contract",
    "agreement",
    "clause",
    "signature",
    "terms",
    "legal",
    "nda",
    "lease",
    "عقد",
    "اتفاقية",
    "اتفاق",
    "بند",
    "توقيع",
    "شروط",
    "قانوني",
    "قانونية",
    "مادة",
    "إيجار",
];

/// Greetings and pleasantries — confidently simple.
const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good evening",
    "thanks",
    "thank you",
    "مرحبا",
    "أهلا",
    "اهلا",
    "السلام عليكم",
    "شكرا",
    "صباح الخير",
    "مساء الخير",
];

/// Conjunctions and enumeration markers that signal multi-clause requests.
const MULTI_CLAUSE_MARKERS: &[&str] = &[
    " and ", " also ", " plus ", " including ", " و ", "وكذلك", "بالإضافة", "1.", "2.", "1)", "2)",
    "- ", "* ",
];

/// Messages longer than this are never treated as simple.
const SIMPLE_MAX_CHARS: usize = 200;
/// Word cap for a "single-sentence factual question".
const SIMPLE_MAX_WORDS: usize = 15;

/// Select the top-level processing path.
///
/// Precedence: session stickiness first — once a thread is in contract
/// analysis it stays there; then the bilingual keyword rule; then the
/// general-chat default.
pub fn route(message: &str, prior_mode: Option<ProcessingMode>) -> ProcessingMode {
    if prior_mode == Some(ProcessingMode::ContractAnalysis) {
        return ProcessingMode::ContractAnalysis;
    }

    let lower = message.to_lowercase();
    if CONTRACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ProcessingMode::ContractAnalysis;
    }

    ProcessingMode::GeneralChat
}

/// Estimated task complexity within the document-generation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// A single direct-response stage suffices.
    Direct,
    /// The full thinking → planning → execution sequence is warranted.
    FullPipeline,
}

/// Heuristic complexity estimate.
///
/// The cheap path is only taken when confidence in simplicity is high:
/// greetings, or short single-sentence questions with no multi-clause
/// markers. Everything ambiguous falls through to the full pipeline —
/// under-delivering on complex legal drafting is the worse failure.
pub fn estimate_complexity(message: &str) -> Complexity {
    let trimmed = message.trim();
    let lower = trimmed.to_lowercase();

    if trimmed.chars().count() > SIMPLE_MAX_CHARS {
        return Complexity::FullPipeline;
    }
    if MULTI_CLAUSE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Complexity::FullPipeline;
    }

    let words = trimmed.split_whitespace().count();
    if words <= 4 && GREETINGS.iter().any(|g| lower.starts_with(g)) {
        return Complexity::Direct;
    }

    // short single-sentence factual question
    let sentence_breaks = trimmed
        .chars()
        .filter(|c| matches!(c, '.' | '!' | '؟' | '?'))
        .count();
    if words <= SIMPLE_MAX_WORDS && sentence_breaks <= 1 && (trimmed.ends_with('?') || trimmed.ends_with('؟'))
    {
        return Complexity::Direct;
    }

    Complexity::FullPipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_mode_wins_regardless_of_content() {
        let mode = route("hello", Some(ProcessingMode::ContractAnalysis));
        assert_eq!(mode, ProcessingMode::ContractAnalysis);
    }

    #[test]
    fn general_chat_prior_does_not_stick() {
        let mode = route("hello", Some(ProcessingMode::GeneralChat));
        assert_eq!(mode, ProcessingMode::GeneralChat);
    }

    #[test]
    fn english_keyword_routes_to_contract_analysis() {
        assert_eq!(
            route("Draft an employment contract", None),
            ProcessingMode::ContractAnalysis
        );
        assert_eq!(
            route("review these TERMS please", None),
            ProcessingMode::ContractAnalysis
        );
    }

    #[test]
    fn arabic_keyword_routes_to_contract_analysis() {
        assert_eq!(
            route("أريد صياغة عقد إيجار", None),
            ProcessingMode::ContractAnalysis
        );
        assert_eq!(route("ما هي الشروط؟", None), ProcessingMode::ContractAnalysis);
    }

    #[test]
    fn default_is_general_chat() {
        assert_eq!(route("hello", None), ProcessingMode::GeneralChat);
        assert_eq!(route("كيف حالك", None), ProcessingMode::GeneralChat);
    }

    #[test]
    fn greetings_are_direct() {
        assert_eq!(estimate_complexity("hello"), Complexity::Direct);
        assert_eq!(estimate_complexity("مرحبا"), Complexity::Direct);
    }

    #[test]
    fn short_question_is_direct() {
        assert_eq!(
            estimate_complexity("What is a liability clause?"),
            Complexity::Direct
        );
        assert_eq!(estimate_complexity("ما هو البند؟"), Complexity::Direct);
    }

    #[test]
    fn drafting_request_is_full_pipeline() {
        assert_eq!(
            estimate_complexity("Draft an employment contract"),
            Complexity::FullPipeline
        );
    }

    #[test]
    fn multi_clause_request_is_full_pipeline() {
        assert_eq!(
            estimate_complexity("Draft a lease with a penalty clause and a renewal option"),
            Complexity::FullPipeline
        );
        assert_eq!(
            estimate_complexity("1. salary 2. probation 3. termination"),
            Complexity::FullPipeline
        );
    }

    #[test]
    fn long_message_is_full_pipeline() {
        let long = "please ".repeat(40);
        assert_eq!(estimate_complexity(&long), Complexity::FullPipeline);
    }
}
