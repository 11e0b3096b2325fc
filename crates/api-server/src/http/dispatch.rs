use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use shared::models::DispatchRequest;

use super::AppState;
use super::errors::{dispatch_error_response, json_rejection_response};

pub(super) async fn dispatch_tool_call(
    State(state): State<AppState>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };

    match state
        .dispatcher
        .dispatch(&request.name, &request.arguments)
        .await
    {
        Ok(output) => Json(output).into_response(),
        Err(err) => dispatch_error_response(err),
    }
}
