use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::capabilities::{self, Capability, CapabilityError};

pub type CapabilityHostFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Value, DispatchError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error("tool arguments are not a JSON object: {0}")]
    MalformedArguments(String),
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("capability host timed out")]
    BackendTimeout,
    #[error("capability host failed: {0}")]
    Backend(String),
}

impl DispatchError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownCapability(_) => "unknown_capability",
            Self::MalformedArguments(_) => "malformed_arguments",
            Self::Validation { .. } => "invalid_request",
            Self::BackendTimeout => "backend_timeout",
            Self::Backend(_) => "backend_error",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<CapabilityError> for DispatchError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::UnknownCapability(name) => Self::UnknownCapability(name),
            CapabilityError::Validation { field, message } => Self::Validation { field, message },
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Where capability requests are executed.
pub trait CapabilityHost: Send + Sync {
    fn invoke<'a>(&'a self, capability: Capability, arguments: Value) -> CapabilityHostFuture<'a>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCapabilityHost;

impl CapabilityHost for LocalCapabilityHost {
    fn invoke<'a>(&'a self, capability: Capability, arguments: Value) -> CapabilityHostFuture<'a> {
        Box::pin(async move {
            capabilities::invoke_capability(capability, &arguments).map_err(DispatchError::from)
        })
    }
}

/// Forwards capability requests to a running api-server as `POST {base}/{name}`.
#[derive(Clone)]
pub struct HttpCapabilityHost {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCapabilityHost {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DispatchError::Backend(format!("http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, capability: Capability, arguments: Value) -> Result<Value, DispatchError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, capability.name()))
            .json(&arguments)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DispatchError::BackendTimeout
                } else {
                    DispatchError::Backend("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                DispatchError::BackendTimeout
            } else {
                DispatchError::Backend("response_body_read_failed".to_string())
            }
        })?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|_| DispatchError::Backend("response_json_parse_failed".to_string()));
        }

        Err(map_host_failure(capability, status, &body))
    }
}

impl CapabilityHost for HttpCapabilityHost {
    fn invoke<'a>(&'a self, capability: Capability, arguments: Value) -> CapabilityHostFuture<'a> {
        Box::pin(self.post(capability, arguments))
    }
}

fn map_host_failure(capability: Capability, status: StatusCode, body: &str) -> DispatchError {
    #[derive(Deserialize)]
    struct HostErrorEnvelope {
        error: HostErrorBody,
    }

    #[derive(Deserialize)]
    struct HostErrorBody {
        message: String,
        field: Option<String>,
    }

    let details = serde_json::from_str::<HostErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);

    match (status, details) {
        (StatusCode::NOT_FOUND, _) => {
            DispatchError::UnknownCapability(capability.name().to_string())
        }
        (status, Some(HostErrorBody { message, field: Some(field) }))
            if status.is_client_error() =>
        {
            DispatchError::Validation { field, message }
        }
        (StatusCode::GATEWAY_TIMEOUT, _) => DispatchError::BackendTimeout,
        (status, _) => DispatchError::Backend(format!("status={}", status.as_u16())),
    }
}

/// Turns a tool call from a reasoning backend into a capability invocation.
#[derive(Clone)]
pub struct ToolDispatcher {
    host: Arc<dyn CapabilityHost>,
}

impl ToolDispatcher {
    pub fn new(host: Arc<dyn CapabilityHost>) -> Self {
        Self { host }
    }

    pub fn local() -> Self {
        Self::new(Arc::new(LocalCapabilityHost))
    }

    pub async fn dispatch(&self, name: &str, raw_arguments: &str) -> Result<Value, DispatchError> {
        let Some(capability) = Capability::from_name(name) else {
            warn!(capability = name, "tool call named an unknown capability");
            return Err(DispatchError::UnknownCapability(name.to_string()));
        };

        let arguments = parse_arguments(raw_arguments).inspect_err(|_| {
            warn!(capability = name, "tool call arguments were malformed");
        })?;

        match self.host.invoke(capability, arguments).await {
            Ok(response) => {
                info!(capability = name, outcome = "ok", "tool call dispatched");
                Ok(response)
            }
            Err(err) => {
                warn!(capability = name, code = err.code(), "tool call failed");
                Err(err)
            }
        }
    }
}

/// Strict JSON parse of untrusted argument text. Anything other than a JSON
/// object is rejected before a capability runs.
pub fn parse_arguments(raw_arguments: &str) -> Result<Value, DispatchError> {
    match serde_json::from_str::<Value>(raw_arguments) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(DispatchError::MalformedArguments(
            "expected a JSON object".to_string(),
        )),
        Err(err) => Err(DispatchError::MalformedArguments(err.to_string())),
    }
}

/// Payload returned to the reasoning backend as the tool result.
pub fn tool_output(result: &Result<Value, DispatchError>) -> String {
    let value = match result {
        Ok(response) => response.clone(),
        Err(err) => {
            let mut error = json!({ "code": err.code(), "message": err.to_string() });
            if let (Some(field), Value::Object(entries)) = (err.field(), &mut error) {
                entries.insert("field".to_string(), json!(field));
            }
            json!({ "error": error })
        }
    };

    value.to_string()
}
