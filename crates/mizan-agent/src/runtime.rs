use tokio::sync::RwLock;

use crate::prompt::PromptVariant;
use crate::provider::{ChatRequest, LlmProvider, Message};

/// Central agent runtime — holds the LLM provider and request defaults.
/// Shared across all requests via Arc in the gateway's AppState.
///
/// Explicitly constructed and injected at startup; there is deliberately no
/// process-wide singleton.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    default_model: RwLock<String>,
    max_tokens: u32,
    variant: PromptVariant,
}

impl AgentRuntime {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        default_model: String,
        max_tokens: u32,
        variant: PromptVariant,
    ) -> Self {
        Self {
            provider,
            default_model: RwLock::new(default_model),
            max_tokens,
            variant,
        }
    }

    /// Get the current default model name.
    pub async fn get_model(&self) -> String {
        self.default_model.read().await.clone()
    }

    /// Change the default model at runtime. Returns the previous model.
    pub async fn set_model(&self, model: String) -> String {
        let mut guard = self.default_model.write().await;
        std::mem::replace(&mut *guard, model)
    }

    /// Access the LLM provider directly.
    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }

    /// The configured prompt variant (language/domain).
    pub fn variant(&self) -> PromptVariant {
        self.variant
    }

    /// Assemble a streaming request from a stage system prompt and history.
    pub async fn stage_request(&self, system: String, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: self.default_model.read().await.clone(),
            system,
            messages,
            max_tokens: self.max_tokens,
            stream: true,
        }
    }
}
