use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::sleep;

use super::gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};

const RESPONSES_PATH: &str = "responses";
const OUTPUT_ITEM_MESSAGE: &str = "message";
const CONTENT_PART_OUTPUT_TEXT: &str = "output_text";

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl OpenAiGatewayConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Error)]
pub enum OpenAiClientError {
    #[error("failed to build OpenAI http client: {0}")]
    HttpClient(String),
}

pub(crate) fn build_http_client(
    config: &OpenAiGatewayConfig,
) -> Result<reqwest::Client, OpenAiClientError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|err| OpenAiClientError::HttpClient(err.to_string()))
}

/// Text generation through the Responses API.
#[derive(Clone)]
pub struct OpenAiResponsesGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiResponsesGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiClientError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    async fn send_once(
        &self,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, SendAttemptError> {
        let input = request
            .input
            .iter()
            .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.content }))
            .collect::<Vec<_>>();

        let mut request_body = json!({
            "model": request.model,
            "input": input,
        });
        if let (Some(max_output_tokens), Value::Object(entries)) =
            (request.max_output_tokens, &mut request_body)
        {
            entries.insert("max_output_tokens".to_string(), json!(max_output_tokens));
        }
        if let (Some(requester_id), Value::Object(entries)) =
            (request.requester_id.as_deref(), &mut request_body)
        {
            entries.insert("user".to_string(), json!(requester_id));
        }

        let reply = send_provider_request(
            self.client
                .post(self.config.endpoint(RESPONSES_PATH))
                .bearer_auth(&self.config.api_key)
                .json(&request_body),
        )
        .await?;

        let parsed: ResponsesSuccessBody = parse_provider_body(&reply.body)?;

        Ok(LlmGatewayResponse {
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            provider_request_id: reply.request_id.or(parsed.id),
            text: extract_reply_text(&parsed.output),
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                input_tokens: clamp_u64_to_u32(usage.input_tokens.unwrap_or(0)),
                output_tokens: clamp_u64_to_u32(usage.output_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenAiResponsesGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move { with_retries(&self.config, || self.send_once(&request)).await })
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesSuccessBody {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
    usage: Option<ResponsesUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ResponsesContentPart>,
}

#[derive(Debug, Deserialize)]
struct ResponsesContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

// Joins the output_text parts of the first message item. Reasoning and tool
// items that precede it are skipped.
fn extract_reply_text(output: &[ResponsesOutputItem]) -> String {
    let Some(message) = output.iter().find(|item| item.kind == OUTPUT_ITEM_MESSAGE) else {
        return String::new();
    };

    message
        .content
        .iter()
        .filter(|part| part.kind == CONTENT_PART_OUTPUT_TEXT)
        .filter_map(|part| part.text.as_deref())
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug)]
pub(crate) struct SendAttemptError {
    pub(crate) error: LlmGatewayError,
    pub(crate) retryable: bool,
}

impl SendAttemptError {
    pub(crate) fn retryable(error: LlmGatewayError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    pub(crate) fn non_retryable(error: LlmGatewayError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ProviderReply {
    pub(crate) request_id: Option<String>,
    pub(crate) body: String,
}

pub(crate) async fn with_retries<T, F, Fut>(
    config: &OpenAiGatewayConfig,
    mut attempt: F,
) -> Result<T, LlmGatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SendAttemptError>>,
{
    let mut retries = 0_u32;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if err.retryable && retries < config.max_retries {
                    sleep(Duration::from_millis(retry_backoff_ms(
                        config.retry_base_backoff_ms,
                        retries,
                    )))
                    .await;
                    retries = retries.saturating_add(1);
                    continue;
                }

                return Err(err.error);
            }
        }
    }
}

pub(crate) async fn send_provider_request(
    request: reqwest::RequestBuilder,
) -> Result<ProviderReply, SendAttemptError> {
    let response = request.send().await.map_err(|err| {
        if err.is_timeout() {
            SendAttemptError::retryable(LlmGatewayError::Timeout)
        } else {
            SendAttemptError::retryable(LlmGatewayError::ProviderFailure(
                "request_unavailable".to_string(),
            ))
        }
    })?;

    let status = response.status();
    let request_id = header_request_id(response.headers());
    let body = response.text().await.map_err(|err| {
        if err.is_timeout() {
            SendAttemptError::retryable(LlmGatewayError::Timeout)
        } else {
            SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
                "response_body_read_failed".to_string(),
            ))
        }
    })?;

    if !status.is_success() {
        let provider_code = parse_provider_error_code(&body);
        return Err(SendAttemptError {
            error: LlmGatewayError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            )),
            retryable: is_retryable_status(status),
        });
    }

    Ok(ProviderReply { request_id, body })
}

pub(crate) fn parse_provider_body<T>(body: &str) -> Result<T, SendAttemptError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|_| {
        SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
            "response_json_parse_failed".to_string(),
        ))
    })
}

pub(crate) fn retry_backoff_ms(base_backoff_ms: u64, retries_so_far: u32) -> u64 {
    base_backoff_ms.saturating_mul(2_u64.saturating_pow(retries_so_far))
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    let Some(details) = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return "unknown".to_string();
    };

    match details.code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => details.kind.unwrap_or_else(|| "unknown".to_string()),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
