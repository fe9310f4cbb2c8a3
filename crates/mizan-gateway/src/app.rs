use axum::{
    routing::{get, post},
    Router,
};
use mizan_agent::runtime::AgentRuntime;
use mizan_core::config::MizanConfig;
use mizan_sessions::SessionStore;
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
///
/// Explicitly constructed in main and injected; nothing here is a
/// process-wide singleton.
pub struct AppState {
    pub config: MizanConfig,
    pub agent: Arc<AgentRuntime>,
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: MizanConfig, agent: AgentRuntime, store: SessionStore) -> Self {
        Self {
            config,
            agent: Arc::new(agent),
            store: Arc::new(store),
        }
    }

    /// The checkpoint store handle for pipeline runs — `None` when
    /// checkpointing is disabled, which makes runs fully stateless.
    pub fn pipeline_store(&self) -> Option<Arc<SessionStore>> {
        self.config
            .pipeline
            .use_checkpointing
            .then(|| Arc::clone(&self.store))
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/v1/chat", post(crate::http::chat::chat_handler))
        .route(
            "/v1/documents/generate",
            post(crate::http::documents::generate_handler),
        )
        .route(
            "/v1/documents/analyze",
            post(crate::http::documents::analyze_handler),
        )
        .route("/v1/tasks/{id}", get(crate::http::tasks::get_task_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
