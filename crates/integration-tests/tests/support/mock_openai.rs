#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::{OpenAiGatewayConfig, PollConfig};
use tokio::sync::Mutex;

use super::LocalServer;

#[derive(Clone, Default)]
pub struct MockOpenAiState {
    pub chat_replies: Arc<Mutex<VecDeque<Value>>>,
    pub chat_requests: Arc<Mutex<Vec<Value>>>,
    pub run_statuses: Arc<Mutex<VecDeque<Value>>>,
    pub thread_messages: Arc<Mutex<Value>>,
    pub submitted_outputs: Arc<Mutex<Vec<Value>>>,
    pub created_messages: Arc<Mutex<Vec<Value>>>,
    pub created_runs: Arc<Mutex<Vec<Value>>>,
    pub cancelled_runs: Arc<Mutex<Vec<String>>>,
    pub beta_headers: Arc<Mutex<Vec<String>>>,
}

impl MockOpenAiState {
    pub async fn queue_chat_reply(&self, reply: Value) {
        self.chat_replies.lock().await.push_back(reply);
    }

    pub async fn queue_run_status(&self, run: Value) {
        self.run_statuses.lock().await.push_back(run);
    }

    pub async fn set_thread_messages(&self, messages: Value) {
        *self.thread_messages.lock().await = messages;
    }
}

pub struct MockOpenAi {
    pub state: MockOpenAiState,
    server: LocalServer,
}

impl MockOpenAi {
    pub async fn start() -> Self {
        let state = MockOpenAiState::default();
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/threads", post(create_thread))
            .route("/v1/threads/{thread_id}/messages", post(create_message).get(list_messages))
            .route("/v1/threads/{thread_id}/runs", post(create_run))
            .route("/v1/threads/{thread_id}/runs/{run_id}", get(retrieve_run))
            .route(
                "/v1/threads/{thread_id}/runs/{run_id}/submit_tool_outputs",
                post(submit_tool_outputs),
            )
            .route("/v1/threads/{thread_id}/runs/{run_id}/cancel", post(cancel_run))
            .with_state(state.clone());

        Self {
            state,
            server: LocalServer::start(app).await,
        }
    }

    pub fn config(&self) -> OpenAiGatewayConfig {
        OpenAiGatewayConfig {
            base_url: format!("{}/v1", self.server.base_url),
            api_key: "test-openai-key".to_string(),
            timeout_ms: 5_000,
            max_retries: 0,
            retry_base_backoff_ms: 0,
        }
    }
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
        timeout: Duration::from_secs(5),
    }
}

pub fn tool_call_reply(calls: &[(&str, &str, Value)]) -> Value {
    json!({
        "id": "chatcmpl-tools",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": calls
                    .iter()
                    .map(|(id, name, arguments)| json!({
                        "id": id,
                        "type": "function",
                        "function": { "name": name, "arguments": arguments.to_string() }
                    }))
                    .collect::<Vec<_>>()
            }
        }]
    })
}

pub fn text_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-text",
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    })
}

async fn chat_completions(
    State(state): State<MockOpenAiState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.chat_requests.lock().await.push(payload);
    match state.chat_replies.lock().await.pop_front() {
        Some(reply) => (StatusCode::OK, Json(reply)),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "code": "exhausted_test_replies" } })),
        ),
    }
}

async fn record_beta_header(state: &MockOpenAiState, headers: &HeaderMap) {
    if let Some(value) = headers
        .get("openai-beta")
        .and_then(|value| value.to_str().ok())
    {
        state.beta_headers.lock().await.push(value.to_string());
    }
}

async fn create_thread(State(state): State<MockOpenAiState>, headers: HeaderMap) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    Json(json!({ "id": "thread_1", "object": "thread" }))
}

async fn create_message(
    State(state): State<MockOpenAiState>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    state.created_messages.lock().await.push(payload);
    Json(json!({ "id": "msg_user", "thread_id": thread_id }))
}

async fn list_messages(
    State(state): State<MockOpenAiState>,
    headers: HeaderMap,
) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    Json(state.thread_messages.lock().await.clone())
}

async fn create_run(
    State(state): State<MockOpenAiState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    state.created_runs.lock().await.push(payload);
    Json(json!({ "id": "run_1", "status": "queued" }))
}

async fn retrieve_run(
    State(state): State<MockOpenAiState>,
    headers: HeaderMap,
    Path((_thread_id, run_id)): Path<(String, String)>,
) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    let run = state
        .run_statuses
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| json!({ "status": "in_progress" }));

    let mut run = run;
    if let Value::Object(entries) = &mut run {
        entries.insert("id".to_string(), json!(run_id));
    }
    Json(run)
}

async fn submit_tool_outputs(
    State(state): State<MockOpenAiState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<Value> {
    record_beta_header(&state, &headers).await;
    state.submitted_outputs.lock().await.push(payload);
    Json(json!({ "id": "run_1", "status": "queued" }))
}

async fn cancel_run(
    State(state): State<MockOpenAiState>,
    Path((_thread_id, run_id)): Path<(String, String)>,
) -> Json<Value> {
    state.cancelled_runs.lock().await.push(run_id);
    Json(json!({ "id": "run_1", "status": "cancelling" }))
}
