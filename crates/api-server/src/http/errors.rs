use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::capabilities::CapabilityError;
use shared::conversation::ChatError;
use shared::llm::DispatchError;
use shared::models::{ErrorBody, ErrorResponse};
use tracing::error;

const BODY_FIELD: &str = "body";

pub(super) fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    field: Option<&str>,
) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                field: field.map(ToString::to_string),
            },
        }),
    )
        .into_response()
}

pub(super) fn invalid_request_response(field: &str, message: &str) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        message,
        Some(field),
    )
}

pub(super) fn json_rejection_response(rejection: JsonRejection) -> Response {
    invalid_request_response(BODY_FIELD, &rejection.body_text())
}

fn internal_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Unexpected server error",
        None,
    )
}

pub(super) fn capability_error_response(err: CapabilityError) -> Response {
    match err {
        CapabilityError::UnknownCapability(name) => error_response(
            StatusCode::NOT_FOUND,
            "unknown_capability",
            &format!("Unknown capability: {name}"),
            None,
        ),
        CapabilityError::Validation { field, message } => {
            invalid_request_response(&field, &message)
        }
        other => {
            error!("capability invocation failed: {other}");
            internal_error_response()
        }
    }
}

pub(super) fn dispatch_error_response(err: DispatchError) -> Response {
    let status = match &err {
        DispatchError::UnknownCapability(_) => StatusCode::NOT_FOUND,
        DispatchError::MalformedArguments(_) | DispatchError::Validation { .. } => {
            StatusCode::BAD_REQUEST
        }
        DispatchError::BackendTimeout => StatusCode::GATEWAY_TIMEOUT,
        DispatchError::Backend(_) => StatusCode::BAD_GATEWAY,
    };

    error_response(status, err.code(), &err.to_string(), err.field())
}

pub(super) fn chat_error_response(err: ChatError) -> Response {
    match err {
        ChatError::InvalidRequest { field, message } => invalid_request_response(field, message),
        ChatError::EmptyResponse => error_response(
            StatusCode::BAD_GATEWAY,
            "empty_response",
            "Empty response from model",
            None,
        ),
        ChatError::BackendTimeout => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "backend_timeout",
            "Text generation backend timed out",
            None,
        ),
        ChatError::Backend(cause) => error_response(
            StatusCode::BAD_GATEWAY,
            "backend_error",
            &format!("AI error: {cause}"),
            None,
        ),
        ChatError::Store(store_err) => {
            error!("session store operation failed: {store_err}");
            internal_error_response()
        }
    }
}
