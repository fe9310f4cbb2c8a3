//! Pipeline runner — drives the stage state machine for one request.
//!
//! The runner owns all in-flight state for the duration of a request and
//! hands completed-stage snapshots to the checkpoint store. Events flow out
//! through an mpsc channel; a failed send means the client is gone, which
//! cancels the run (no further LLM calls, no checkpoint for the incomplete
//! stage).

use std::sync::Arc;

use mizan_core::types::ProcessingMode;
use mizan_sessions::{CheckpointKey, SessionStore};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::prompt;
use crate::provider::{ChatRequest, Message, ProviderError, Role};
use crate::route::Complexity;
use crate::runtime::AgentRuntime;
use crate::stream::StreamEvent;

use super::events::PipelineEvent;
use super::stage::Stage;
use super::state::{DocumentTally, PipelineState};

const CHECKPOINT_NAMESPACE: &str = "pipeline";

/// One routed, sanitized request ready for execution.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub thread_id: String,
    /// Sanitized user message.
    pub message: String,
    pub mode: ProcessingMode,
    pub complexity: Complexity,
    /// Prior conversation turns, oldest first.
    pub history: Vec<Message>,
}

impl PipelineRequest {
    /// Whether this run takes the single direct-response stage.
    fn is_direct(&self) -> bool {
        self.mode == ProcessingMode::GeneralChat || self.complexity == Complexity::Direct
    }

    fn stages(&self) -> Vec<Stage> {
        if self.is_direct() {
            vec![Stage::DirectResponse]
        } else {
            vec![Stage::Thinking, Stage::Planning, Stage::Execution]
        }
    }

    fn messages(&self) -> Vec<Message> {
        let mut messages = self.history.clone();
        messages.push(Message {
            role: Role::User,
            content: self.message.clone(),
        });
        messages
    }
}

/// Why a stage stopped early.
enum StageAbort {
    /// The LLM call failed (before or during streaming).
    Provider(ProviderError),
    /// The event receiver dropped — client disconnected.
    ClientGone,
}

/// Run the pipeline for one request, emitting events on `tx`.
///
/// Pass `store: None` (or a disabled config upstream) for stateless
/// operation — no persistence, no resumption.
pub async fn run_pipeline(
    agent: Arc<AgentRuntime>,
    store: Option<Arc<SessionStore>>,
    req: PipelineRequest,
    tx: mpsc::Sender<PipelineEvent>,
) {
    if tx
        .send(PipelineEvent::Started {
            thread_id: req.thread_id.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    let stages: Vec<String> = req.stages().iter().map(|s| s.wire_name().to_string()).collect();
    if tx
        .send(PipelineEvent::Architecture { stages })
        .await
        .is_err()
    {
        return;
    }

    let result = if req.is_direct() {
        run_direct(&agent, &store, &req, &tx).await
    } else {
        run_full(&agent, &store, &req, &tx).await
    };

    match result {
        Ok(()) => {
            let _ = tx.send(PipelineEvent::Finished).await;
        }
        Err(StageAbort::ClientGone) => {
            info!(thread = %req.thread_id, "client disconnected — pipeline cancelled");
        }
        Err(StageAbort::Provider(e)) => {
            warn!(thread = %req.thread_id, error = %e, "pipeline stage failed");
            let _ = tx
                .send(PipelineEvent::Failed {
                    code: "PROVIDER_ERROR".to_string(),
                    message: e.to_string(),
                })
                .await;
        }
    }
}

/// Single-stage path: one conversational answer, streamed as plain deltas.
async fn run_direct(
    agent: &Arc<AgentRuntime>,
    store: &Option<Arc<SessionStore>>,
    req: &PipelineRequest,
    tx: &mpsc::Sender<PipelineEvent>,
) -> Result<(), StageAbort> {
    let system = prompt::direct_response(agent.variant());
    let chat = agent.stage_request(system, req.messages()).await;

    let mut tally = DocumentTally::default();
    let content = stream_stage(agent, chat, tx, true, &mut tally).await?;

    if let Some(store) = store {
        let _ = store.append_message(
            &req.thread_id,
            "assistant",
            &content,
            None,
            serde_json::json!({ "stage": Stage::DirectResponse.wire_name() }),
        );
        let mut parent = None;
        save_checkpoint(store, req, Stage::DirectResponse, "", "", true, &mut parent);
    }

    Ok(())
}

/// Full path: thinking → planning → execution, checkpointed at each
/// completed transition, resuming from a prior non-terminal checkpoint of
/// the same turn when one exists.
async fn run_full(
    agent: &Arc<AgentRuntime>,
    store: &Option<Arc<SessionStore>>,
    req: &PipelineRequest,
    tx: &mpsc::Sender<PipelineEvent>,
) -> Result<(), StageAbort> {
    let (resume, mut parent_ckpt) = load_resume_state(store, req);
    let resumed_rank = resume.as_ref().map(|s| s.stage_completed.rank()).unwrap_or(0);
    let mut thinking = resume.as_ref().map(|s| s.thinking.clone()).unwrap_or_default();
    let mut plan = resume.map(|s| s.plan).unwrap_or_default();
    let mut tally = DocumentTally::default();

    // THINKING — progress metadata only, output feeds planning
    progress(tx, Stage::Thinking, Stage::Thinking.entry_progress()).await?;
    if resumed_rank < Stage::Thinking.rank() {
        let system = prompt::thinking(agent.variant());
        let chat = agent.stage_request(system, req.messages()).await;
        thinking = stream_stage(agent, chat, tx, false, &mut tally).await?;
        if let Some(store) = store {
            save_checkpoint(store, req, Stage::Thinking, &thinking, &plan, false, &mut parent_ckpt);
        }
    }
    progress(tx, Stage::Thinking, Stage::Thinking.completion_progress()).await?;

    // PLANNING — grounded in the thinking notes
    progress(tx, Stage::Planning, Stage::Planning.entry_progress()).await?;
    if resumed_rank < Stage::Planning.rank() {
        let system = prompt::planning(agent.variant(), &thinking);
        let chat = agent.stage_request(system, req.messages()).await;
        plan = stream_stage(agent, chat, tx, false, &mut tally).await?;
        if let Some(store) = store {
            save_checkpoint(store, req, Stage::Planning, &thinking, &plan, false, &mut parent_ckpt);
        }
    }
    progress(tx, Stage::Planning, Stage::Planning.completion_progress()).await?;

    // EXECUTION — grounded in the plan, streams classified content
    progress(tx, Stage::Execution, Stage::Execution.entry_progress()).await?;
    let system = prompt::execution(agent.variant(), &plan);
    let chat = agent.stage_request(system, req.messages()).await;
    let content = stream_stage(agent, chat, tx, true, &mut tally).await?;

    if let Some(store) = store {
        save_checkpoint(store, req, Stage::Execution, &thinking, &plan, true, &mut parent_ckpt);
        let _ = store.append_message(
            &req.thread_id,
            "assistant",
            &content,
            None,
            serde_json::json!({ "stage": Stage::Execution.wire_name() }),
        );
    }
    progress(tx, Stage::Execution, Stage::Execution.completion_progress()).await?;

    let stats = tally.stats();
    tx.send(PipelineEvent::Document { stats })
        .await
        .map_err(|_| StageAbort::ClientGone)?;
    tx.send(PipelineEvent::Completed { stats })
        .await
        .map_err(|_| StageAbort::ClientGone)?;

    Ok(())
}

/// Load the latest checkpoint and decide whether it is resumable: it must be
/// non-terminal and belong to the same user message (never splice state from
/// a different turn).
fn load_resume_state(
    store: &Option<Arc<SessionStore>>,
    req: &PipelineRequest,
) -> (Option<PipelineState>, Option<String>) {
    let Some(store) = store else {
        return (None, None);
    };
    match store.latest_checkpoint(&req.thread_id) {
        Ok(Some(ckpt)) => {
            if let Ok(state) = serde_json::from_value::<PipelineState>(ckpt.state.clone()) {
                if !state.terminal && state.message == req.message {
                    info!(
                        thread = %req.thread_id,
                        stage = %state.stage_completed,
                        "resuming pipeline from checkpoint"
                    );
                    return (Some(state), Some(ckpt.key.checkpoint_id));
                }
            }
            (None, None)
        }
        Ok(None) => (None, None),
        Err(e) => {
            warn!(thread = %req.thread_id, error = %e, "checkpoint load failed — starting fresh");
            (None, None)
        }
    }
}

async fn progress(
    tx: &mpsc::Sender<PipelineEvent>,
    stage: Stage,
    value: u8,
) -> Result<(), StageAbort> {
    tx.send(PipelineEvent::StageProgress {
        stage,
        progress: value,
    })
    .await
    .map_err(|_| StageAbort::ClientGone)
}

/// Snapshot completed-stage state into the append-only checkpoint log.
/// A storage failure is logged and absorbed; the stream continues.
fn save_checkpoint(
    store: &Arc<SessionStore>,
    req: &PipelineRequest,
    stage_completed: Stage,
    thinking: &str,
    plan: &str,
    terminal: bool,
    parent: &mut Option<String>,
) {
    let state = PipelineState {
        message: req.message.clone(),
        mode: req.mode,
        stage_completed,
        thinking: thinking.to_string(),
        plan: plan.to_string(),
        terminal,
    };
    let key = CheckpointKey::new(
        req.thread_id.clone(),
        CHECKPOINT_NAMESPACE,
        format!("ckpt-{}", Uuid::now_v7()),
    );
    match serde_json::to_value(&state) {
        Ok(value) => match store.save_checkpoint(&key, parent.as_deref(), &value) {
            Ok(()) => *parent = Some(key.checkpoint_id),
            Err(e) => warn!(key = %key, error = %e, "checkpoint save failed"),
        },
        Err(e) => warn!(key = %key, error = %e, "checkpoint state serialization failed"),
    }
}

/// Drive one stage's LLM call. Text deltas are buffered into
/// newline-delimited units, classified, and — when `visible` — forwarded as
/// `Delta` events and recorded in the tally. Returns the accumulated clean
/// text (plan text for hidden stages, document text for visible ones).
async fn stream_stage(
    agent: &Arc<AgentRuntime>,
    chat: ChatRequest,
    tx: &mpsc::Sender<PipelineEvent>,
    visible: bool,
    tally: &mut DocumentTally,
) -> Result<String, StageAbort> {
    let (ptx, mut prx) = mpsc::channel::<StreamEvent>(64);
    let provider_agent = Arc::clone(agent);
    let handle = tokio::spawn(async move { provider_agent.provider().send_stream(&chat, ptx).await });

    let mut accumulated = String::new();
    let mut line_buf = String::new();
    let mut failed: Option<ProviderError> = None;

    while let Some(event) = prx.recv().await {
        match event {
            StreamEvent::TextDelta { text } => {
                line_buf.push_str(&text);
                while let Some(pos) = line_buf.find('\n') {
                    let unit: String = line_buf.drain(..=pos).collect();
                    emit_unit(&unit, tx, visible, tally, &mut accumulated).await?;
                }
            }
            StreamEvent::Done {
                model,
                tokens_in,
                tokens_out,
                ..
            } => {
                info!(model = %model, tokens_in, tokens_out, "stage stream complete");
            }
            StreamEvent::Error { message } => {
                failed = Some(ProviderError::Unavailable(message));
                break;
            }
        }
    }
    drop(prx);

    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            if failed.is_none() {
                failed = Some(e);
            }
        }
        Err(e) => {
            if failed.is_none() {
                failed = Some(ProviderError::Unavailable(format!(
                    "provider task panicked: {e}"
                )));
            }
        }
    }

    if let Some(e) = failed {
        return Err(StageAbort::Provider(e));
    }

    // flush the final unit (streams rarely end with a newline)
    let remainder = std::mem::take(&mut line_buf);
    emit_unit(&remainder, tx, visible, tally, &mut accumulated).await?;

    Ok(accumulated)
}

async fn emit_unit(
    unit: &str,
    tx: &mpsc::Sender<PipelineEvent>,
    visible: bool,
    tally: &mut DocumentTally,
    accumulated: &mut String,
) -> Result<(), StageAbort> {
    if unit.trim().is_empty() {
        return Ok(());
    }
    let (section_type, clean) = classify(unit);
    if clean.is_empty() {
        return Ok(());
    }
    if !accumulated.is_empty() {
        accumulated.push('\n');
    }
    accumulated.push_str(&clean);

    if visible {
        tally.record(section_type, &clean);
        tx.send(PipelineEvent::Delta {
            section_type,
            text: clean,
        })
        .await
        .map_err(|_| StageAbort::ClientGone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptVariant;
    use crate::provider::{ChatResponse, LlmProvider};
    use async_trait::async_trait;
    use mizan_core::types::SectionType;
    use std::collections::VecDeque;

    /// Provider that plays back one scripted event sequence per call.
    struct ScriptedProvider {
        scripts: tokio::sync::Mutex<VecDeque<Vec<StreamEvent>>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Vec<StreamEvent>>) -> Self {
            Self {
                scripts: tokio::sync::Mutex::new(scripts.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Unavailable("non-streaming not scripted".into()))
        }

        async fn send_stream(
            &self,
            _req: &ChatRequest,
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ProviderError> {
            let script = self
                .scripts
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ProviderError::Unavailable("no scripted response left".into()))?;
            for event in script {
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
            Ok(())
        }
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::TextDelta {
            text: text.to_string(),
        }
    }

    fn done() -> StreamEvent {
        StreamEvent::Done {
            model: "test-model".into(),
            tokens_in: 10,
            tokens_out: 20,
            stop_reason: "end_turn".into(),
        }
    }

    fn runtime(scripts: Vec<Vec<StreamEvent>>) -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime::new(
            Box::new(ScriptedProvider::new(scripts)),
            "test-model".into(),
            1024,
            PromptVariant::EnglishLegal,
        ))
    }

    fn request(message: &str, mode: ProcessingMode, complexity: Complexity) -> PipelineRequest {
        PipelineRequest {
            thread_id: "t-1".into(),
            message: message.into(),
            mode,
            complexity,
            history: Vec::new(),
        }
    }

    fn memory_store() -> Arc<SessionStore> {
        let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
        mizan_sessions::db::init_db(&conn).expect("init db");
        let store = SessionStore::new(conn);
        store.get_or_create_thread(Some("t-1")).expect("seed thread");
        Arc::new(store)
    }

    async fn collect(
        agent: Arc<AgentRuntime>,
        store: Option<Arc<SessionStore>>,
        req: PipelineRequest,
    ) -> Vec<PipelineEvent> {
        let (tx, mut rx) = mpsc::channel(256);
        run_pipeline(agent, store, req, tx).await;
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn progress_stages(events: &[PipelineEvent]) -> Vec<Stage> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StageProgress { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn general_chat_runs_direct_response_only() {
        let agent = runtime(vec![vec![delta("Hello! How can I help?"), done()]]);
        let req = request("hello", ProcessingMode::GeneralChat, Complexity::Direct);

        let events = collect(agent, None, req).await;

        assert!(matches!(events.first(), Some(PipelineEvent::Started { .. })));
        assert!(matches!(events.last(), Some(PipelineEvent::Finished)));
        match &events[1] {
            PipelineEvent::Architecture { stages } => {
                assert_eq!(stages, &vec!["direct_response".to_string()])
            }
            other => panic!("expected architecture, got {other:?}"),
        }
        // no stage progress at all on the direct path
        assert!(progress_stages(&events).is_empty());
        // the answer arrives as plain-text deltas
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Delta {
                section_type: SectionType::Text,
                ..
            }
        )));
        // no document/completion on general chat
        assert!(!events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Document { .. } | PipelineEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn full_pipeline_orders_stages_and_classifies_deltas() {
        let agent = runtime(vec![
            vec![delta("employment contract, two parties"), done()],
            vec![delta("1. header\n2. clauses\n3. signatures"), done()],
            vec![
                delta("Employment Contract [CH]\n"),
                delta("The employee shall perform duties under Article 80. [CB]\n"),
                delta("Signatures of the parties [CF]\n"),
                done(),
            ],
        ]);
        let req = request(
            "Draft an employment contract",
            ProcessingMode::ContractAnalysis,
            Complexity::FullPipeline,
        );

        let events = collect(agent, None, req).await;

        // planning progress strictly before execution progress
        let stages = progress_stages(&events);
        let first_planning = stages.iter().position(|s| *s == Stage::Planning).unwrap();
        let first_execution = stages.iter().position(|s| *s == Stage::Execution).unwrap();
        let first_thinking = stages.iter().position(|s| *s == Stage::Thinking).unwrap();
        assert!(first_thinking < first_planning);
        assert!(first_planning < first_execution);

        let sections: Vec<SectionType> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Delta { section_type, .. } => Some(*section_type),
                _ => None,
            })
            .collect();
        assert_eq!(
            sections,
            vec![
                SectionType::Header,
                SectionType::Body,
                SectionType::Signature
            ]
        );

        // deltas never leak the tag
        assert!(events.iter().all(|e| match e {
            PipelineEvent::Delta { text, .. } => !text.contains('['),
            _ => true,
        }));

        // document, completion, finished — in that order, at the end
        let tail: Vec<&str> = events
            .iter()
            .rev()
            .take(3)
            .map(|e| match e {
                PipelineEvent::Finished => "finished",
                PipelineEvent::Completed { .. } => "completed",
                PipelineEvent::Document { .. } => "document",
                _ => "other",
            })
            .collect();
        assert_eq!(tail, vec!["finished", "completed", "document"]);

        // stats: all three structural kinds seen → full compliance
        match events
            .iter()
            .find(|e| matches!(e, PipelineEvent::Document { .. }))
            .unwrap()
        {
            PipelineEvent::Document { stats } => {
                assert!((stats.compliance_score - 1.0).abs() < 1e-9);
                assert_eq!(stats.citation_count, 1);
                assert!(stats.word_count > 0);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn provider_error_mid_execution_is_terminal() {
        let agent = runtime(vec![
            vec![delta("analysis"), done()],
            vec![delta("plan"), done()],
            vec![delta("Partial clause [CB]\n"), StreamEvent::Error {
                message: "upstream reset".into(),
            }],
        ]);
        let req = request(
            "Draft an employment contract",
            ProcessingMode::ContractAnalysis,
            Complexity::FullPipeline,
        );

        let events = collect(agent, None, req).await;

        // the delta produced before the failure was delivered
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Delta { .. })));
        // exactly one Failed, as the final event — no Finished after
        assert!(matches!(events.last(), Some(PipelineEvent::Failed { .. })));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, PipelineEvent::Failed { .. }))
                .count(),
            1
        );
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Finished)));
    }

    #[tokio::test]
    async fn full_run_checkpoints_each_transition() {
        let store = memory_store();
        let agent = runtime(vec![
            vec![delta("analysis"), done()],
            vec![delta("the plan"), done()],
            vec![delta("Contract [CH]\nBody [CB]\nSigned [CF]\n"), done()],
        ]);
        let req = request(
            "Draft an employment contract",
            ProcessingMode::ContractAnalysis,
            Complexity::FullPipeline,
        );

        let events = collect(agent, Some(Arc::clone(&store)), req).await;
        assert!(matches!(events.last(), Some(PipelineEvent::Finished)));

        let latest = store.latest_checkpoint("t-1").unwrap().unwrap();
        let state: PipelineState = serde_json::from_value(latest.state).unwrap();
        assert!(state.terminal);
        assert_eq!(state.stage_completed, Stage::Execution);
        assert_eq!(state.plan, "the plan");
        // the terminal checkpoint chains back to the planning checkpoint
        assert!(latest.parent_checkpoint_id.is_some());

        // assistant content was persisted
        let history = store.get_history("t-1", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, "assistant");
        assert!(history[0].content.contains("Contract"));
    }

    #[tokio::test]
    async fn interrupted_run_resumes_after_planning() {
        let store = memory_store();
        // a crash left a non-terminal planning checkpoint for this message
        let key = CheckpointKey::new("t-1", CHECKPOINT_NAMESPACE, "ckpt-prior");
        let state = PipelineState {
            message: "Draft an employment contract".into(),
            mode: ProcessingMode::ContractAnalysis,
            stage_completed: Stage::Planning,
            thinking: "stored analysis".into(),
            plan: "stored plan".into(),
            terminal: false,
        };
        store
            .save_checkpoint(&key, None, &serde_json::to_value(&state).unwrap())
            .unwrap();

        // only the execution call is scripted — resuming must not re-run
        // thinking or planning
        let agent = runtime(vec![vec![delta("Contract [CH]\nDone [CF]\n"), done()]]);
        let req = request(
            "Draft an employment contract",
            ProcessingMode::ContractAnalysis,
            Complexity::FullPipeline,
        );

        let events = collect(agent, Some(Arc::clone(&store)), req).await;
        assert!(
            matches!(events.last(), Some(PipelineEvent::Finished)),
            "resume should succeed with only an execution script: {events:?}"
        );

        // progress frames are still replayed for the skipped stages
        let stages = progress_stages(&events);
        assert!(stages.contains(&Stage::Thinking));
        assert!(stages.contains(&Stage::Planning));
    }

    #[tokio::test]
    async fn terminal_checkpoint_is_not_resumed() {
        let store = memory_store();
        let key = CheckpointKey::new("t-1", CHECKPOINT_NAMESPACE, "ckpt-done");
        let state = PipelineState {
            message: "Draft an employment contract".into(),
            mode: ProcessingMode::ContractAnalysis,
            stage_completed: Stage::Execution,
            thinking: String::new(),
            plan: "old plan".into(),
            terminal: true,
        };
        store
            .save_checkpoint(&key, None, &serde_json::to_value(&state).unwrap())
            .unwrap();

        // a fresh run needs all three stage calls
        let agent = runtime(vec![
            vec![delta("analysis"), done()],
            vec![delta("new plan"), done()],
            vec![delta("Contract [CH]\n"), done()],
        ]);
        let req = request(
            "Draft an employment contract",
            ProcessingMode::ContractAnalysis,
            Complexity::FullPipeline,
        );

        let events = collect(agent, Some(store), req).await;
        assert!(matches!(events.last(), Some(PipelineEvent::Finished)));
    }
}
