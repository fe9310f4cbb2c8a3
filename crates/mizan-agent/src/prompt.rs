//! Stage prompt templates.
//!
//! Each pipeline stage is one LLM call with a stage-specific system prompt
//! assembled here: a language/domain variant base plus the stage template.
//! Execution additionally receives the planning output as grounding context
//! and the section-tagging instruction.

use std::fmt;

/// System prompt variant — selects the language/domain framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    ArabicLegal,
    EnglishLegal,
}

impl PromptVariant {
    /// Resolve from the `agent.language` config value. Unknown codes fall
    /// back to Arabic — the primary deployment audience.
    pub fn from_language(code: &str) -> Self {
        match code {
            "en" => Self::EnglishLegal,
            _ => Self::ArabicLegal,
        }
    }

    fn base(&self) -> &'static str {
        match self {
            Self::ArabicLegal => {
                "أنت مساعد قانوني متخصص في صياغة وتحليل العقود والمستندات القانونية. \
                 اكتب بلغة قانونية دقيقة وواضحة. استشهد بالمواد النظامية عند الاقتضاء. \
                 You may answer in English when the user writes in English."
            }
            Self::EnglishLegal => {
                "You are a legal assistant specialised in drafting and analysing \
                 contracts and legal documents. Write in precise, plain legal \
                 language and cite governing articles where relevant."
            }
        }
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArabicLegal => write!(f, "ar-legal"),
            Self::EnglishLegal => write!(f, "en-legal"),
        }
    }
}

/// Instruction block teaching the model the section tag convention consumed
/// by the content classifier.
const TAGGING_RULES: &str = "\
Structure the document as newline-separated units. End each unit with a \
structural tag in square brackets:\n\
  [CH] — document header (title, parties, date)\n\
  [CB] — body content (clauses, obligations, terms)\n\
  [CF] — signature/footer block\n\
Untagged lines are treated as plain text. Place the tag at the very end of \
the unit.";

/// System prompt for the direct-response stage — a single conversational
/// answer, no document assembly.
pub fn direct_response(variant: PromptVariant) -> String {
    format!(
        "{}\n\nAnswer the user's message directly and concisely. Do not emit \
         structural tags.",
        variant.base()
    )
}

/// System prompt for the thinking stage — requirements analysis, not shown
/// to the end user.
pub fn thinking(variant: PromptVariant) -> String {
    format!(
        "{}\n\nAnalyse the user's request. Identify the document type, the \
         parties involved, governing law considerations, and any missing \
         information that must be assumed. Output your analysis as concise \
         notes. This is internal reasoning — it will not be shown to the \
         user.",
        variant.base()
    )
}

/// System prompt for the planning stage — consumes the thinking notes and
/// produces an ordered section plan.
pub fn planning(variant: PromptVariant, thinking_notes: &str) -> String {
    format!(
        "{}\n\nUsing the analysis below, produce an ordered outline of the \
         document: one line per section with the section's purpose. This \
         outline drives drafting — be exhaustive but do not draft yet.\n\n\
         ## Analysis\n{}",
        variant.base(),
        thinking_notes
    )
}

/// System prompt for the execution stage — drafts the final document,
/// grounded in the plan, emitting tagged units.
pub fn execution(variant: PromptVariant, plan: &str) -> String {
    format!(
        "{}\n\nDraft the full document following the outline below, section \
         by section, in order.\n\n{}\n\n## Outline\n{}",
        variant.base(),
        TAGGING_RULES,
        plan
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_resolution() {
        assert_eq!(PromptVariant::from_language("en"), PromptVariant::EnglishLegal);
        assert_eq!(PromptVariant::from_language("ar"), PromptVariant::ArabicLegal);
        assert_eq!(PromptVariant::from_language(""), PromptVariant::ArabicLegal);
    }

    #[test]
    fn execution_prompt_carries_plan_and_tags() {
        let prompt = execution(PromptVariant::EnglishLegal, "1. Header\n2. Clauses");
        assert!(prompt.contains("[CH]"));
        assert!(prompt.contains("[CB]"));
        assert!(prompt.contains("[CF]"));
        assert!(prompt.contains("1. Header"));
    }

    #[test]
    fn planning_prompt_embeds_thinking_notes() {
        let prompt = planning(PromptVariant::ArabicLegal, "employment, KSA law");
        assert!(prompt.contains("employment, KSA law"));
    }

    #[test]
    fn direct_prompt_forbids_tags() {
        let prompt = direct_response(PromptVariant::ArabicLegal);
        assert!(prompt.contains("Do not emit"));
    }
}
