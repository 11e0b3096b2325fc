use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{AppState, build_router};
use shared::config::{ApiConfig, load_dotenv};
use shared::conversation::{ChatOrchestrator, InMemorySessionStore};
use shared::llm::{OpenAiResponsesGateway, ToolDispatcher};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=info,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let gateway = match OpenAiResponsesGateway::new(config.openai.clone()) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build text generation gateway: {err}");
            std::process::exit(1);
        }
    };

    let orchestrator = ChatOrchestrator::new(
        Arc::new(gateway),
        Arc::new(InMemorySessionStore::new()),
        config.chat.clone(),
    );

    let app = build_router(AppState {
        orchestrator: Arc::new(orchestrator),
        dispatcher: ToolDispatcher::local(),
        moderation_enabled: config.moderation_enabled,
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        model = %config.chat.default_model,
        moderation_enabled = config.moderation_enabled,
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server stopped with error: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
