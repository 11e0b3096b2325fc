use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use shared::conversation::{ChatOutcome, ChatTurnRequest, SummaryOutcome, reply_chunks};
use shared::models::ChatRequest;
use shared::moderation::classify;
use tracing::info;

use super::AppState;
use super::errors::{chat_error_response, json_rejection_response};

const MODERATION_REASON_HEADER: &str = "x-moderation-reason";
const HISTORY_SUMMARY_HEADER: &str = "x-history-summary";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub(super) async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    let stream = request.stream;
    run_chat(state, request, stream).await
}

pub(super) async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    run_chat(state, request, true).await
}

async fn run_chat(state: AppState, request: ChatRequest, stream: bool) -> Response {
    if state.moderation_enabled {
        let verdict = classify(&request.message);
        if let Some(reason) = verdict.reason {
            info!(
                session_id = %request.session_id,
                reason = reason.as_str(),
                "chat message blocked by moderation"
            );
            let mut response = text_response(verdict.message);
            response.headers_mut().insert(
                HeaderName::from_static(MODERATION_REASON_HEADER),
                HeaderValue::from_static(reason.as_str()),
            );
            return response;
        }
    }

    let turn = ChatTurnRequest {
        session_id: request.session_id,
        message: request.message,
        model: request.model,
        max_output_tokens: request.max_output_tokens,
    };

    match state.orchestrator.chat(turn).await {
        Ok(outcome) => reply_response(outcome, stream),
        Err(err) => chat_error_response(err),
    }
}

fn reply_response(outcome: ChatOutcome, stream: bool) -> Response {
    let summary_failed = matches!(outcome.summary, SummaryOutcome::Failed(_));

    let mut response = if stream {
        let chunks = reply_chunks(&outcome.reply)
            .into_iter()
            .map(|chunk| Ok::<_, Infallible>(chunk.to_string()))
            .collect::<Vec<_>>();
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_PLAIN)],
            Body::from_stream(stream::iter(chunks)),
        )
            .into_response()
    } else {
        text_response(outcome.reply)
    };

    if summary_failed {
        response.headers_mut().insert(
            HeaderName::from_static(HISTORY_SUMMARY_HEADER),
            HeaderValue::from_static("failed"),
        );
    }

    response
}

fn text_response(text: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], text).into_response()
}
