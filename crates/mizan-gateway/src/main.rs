use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mizan_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path via MIZAN_CONFIG > ~/.mizan/mizan.toml
    let config_path = std::env::var("MIZAN_CONFIG").ok();
    let config = mizan_core::config::MizanConfig::load(config_path.as_deref())?;

    // a missing provider credential is fatal — fail before serving anything
    let anthropic = config.require_provider()?.clone();

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    // initialize SQLite database — single file for all subsystems
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    mizan_sessions::db::init_db(&db)?;
    info!("database migrations complete");

    let store = mizan_sessions::SessionStore::new(db);

    let provider = mizan_agent::anthropic::AnthropicProvider::new(
        anthropic.api_key,
        Some(anthropic.base_url),
    );
    let variant = mizan_agent::prompt::PromptVariant::from_language(&config.agent.language);
    let agent = mizan_agent::runtime::AgentRuntime::new(
        Box::new(provider),
        config.agent.model.clone(),
        config.agent.max_tokens,
        variant,
    );
    info!(model = %config.agent.model, variant = %variant, "agent runtime ready");

    let state = Arc::new(app::AppState::new(config, agent, store));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Mizan gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
