use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use shared::capabilities::{Capability, invoke_capability};

use super::errors::{capability_error_response, json_rejection_response};

pub(super) async fn invoke(
    capability: Capability,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(arguments) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };

    match invoke_capability(capability, &arguments) {
        Ok(response) => Json(response).into_response(),
        Err(err) => capability_error_response(err),
    }
}
