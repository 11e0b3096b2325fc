use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde_json::Value;
use shared::capabilities::Capability;
use shared::conversation::ChatOrchestrator;
use shared::llm::ToolDispatcher;

mod capabilities;
mod chat;
mod conversation;
mod dispatch;
mod errors;
mod health;
mod observability;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub dispatcher: ToolDispatcher,
    pub moderation_enabled: bool,
}

pub fn build_router(app_state: AppState) -> Router {
    let capability_routes = Capability::ALL
        .into_iter()
        .fold(Router::<AppState>::new(), |router, capability| {
            router.route(
                &format!("/{}", capability.name()),
                post(move |payload: Result<Json<Value>, JsonRejection>| {
                    capabilities::invoke(capability, payload)
                }),
            )
        });

    Router::new()
        .route("/health", get(health::health))
        .route("/conversation", post(conversation::moderate_message))
        .route("/chat", post(chat::chat))
        .route("/chat_stream", post(chat::chat_stream))
        .route("/tools/dispatch", post(dispatch::dispatch_tool_call))
        .merge(capability_routes)
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(app_state)
}
