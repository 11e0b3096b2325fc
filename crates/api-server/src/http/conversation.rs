use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use shared::models::{ConversationRequest, ConversationResponse};
use shared::moderation::classify;
use tracing::info;

use super::errors::json_rejection_response;

pub(super) async fn moderate_message(
    payload: Result<Json<ConversationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };

    let verdict = classify(&request.message);
    if let Some(reason) = verdict.reason {
        info!(reason = reason.as_str(), "message blocked by moderation");
    }

    Json(ConversationResponse::from(verdict)).into_response()
}
