use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::{ToolDispatcher, tool_output};
use super::gateway::LlmGatewayError;
use super::openai::{
    OpenAiClientError, OpenAiGatewayConfig, build_http_client, parse_provider_body,
    send_provider_request, with_retries,
};
use super::poller::{PollConfig, PollError, PollStatus, poll_with_backoff};
use super::tools::{DispatchedCall, ToolCall};

const ASSISTANTS_BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
pub enum AssistantRunError {
    #[error("assistant backend request timed out")]
    BackendTimeout,
    #[error("assistant backend failed: {0}")]
    Backend(LlmGatewayError),
    #[error("assistant run ended with status {}", .0.as_str())]
    RunEnded(RunStatus),
    #[error("assistant run requires action but listed no tool calls")]
    MissingToolCalls,
    #[error("assistant run completed without an assistant message")]
    NoAssistantReply,
    #[error("assistant run did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("assistant run was cancelled")]
    Cancelled,
}

impl From<LlmGatewayError> for AssistantRunError {
    fn from(err: LlmGatewayError) -> Self {
        if err.is_timeout() {
            Self::BackendTimeout
        } else {
            Self::Backend(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantRunOutcome {
    pub thread_id: String,
    pub run_id: String,
    pub reply: String,
    pub dispatched: Vec<DispatchedCall>,
}

#[derive(Debug)]
enum RunCheckpoint {
    Completed,
    RequiresAction(Vec<ToolCall>),
}

/// Drives one assistant thread/run to completion, servicing tool calls
/// through the dispatcher while the run waits on them.
pub struct AssistantsClient {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
    assistant_id: String,
    dispatcher: ToolDispatcher,
    poll: PollConfig,
}

impl AssistantsClient {
    pub fn new(
        config: OpenAiGatewayConfig,
        assistant_id: impl Into<String>,
        dispatcher: ToolDispatcher,
        poll: PollConfig,
    ) -> Result<Self, OpenAiClientError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            assistant_id: assistant_id.into(),
            dispatcher,
            poll,
        })
    }

    pub async fn run(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<AssistantRunOutcome, AssistantRunError> {
        let thread: ObjectId = self.post_json("threads", &json!({})).await?;
        let _: ObjectId = self
            .post_json(
                &format!("threads/{}/messages", thread.id),
                &json!({ "role": "user", "content": prompt }),
            )
            .await?;
        let run: ObjectId = self
            .post_json(
                &format!("threads/{}/runs", thread.id),
                &json!({ "assistant_id": self.assistant_id }),
            )
            .await?;
        info!(thread_id = %thread.id, run_id = %run.id, "assistant run created");

        let deadline = Instant::now() + self.poll.timeout;
        let mut dispatched = Vec::new();

        loop {
            let poll = PollConfig {
                timeout: deadline.saturating_duration_since(Instant::now()),
                ..self.poll
            };
            let checkpoint = poll_with_backoff(poll, cancel, || {
                self.probe_run(&thread.id, &run.id)
            })
            .await;

            let calls = match checkpoint {
                Ok(RunCheckpoint::Completed) => break,
                Ok(RunCheckpoint::RequiresAction(calls)) => calls,
                Err(PollError::Probe(err)) => {
                    // A run that already ended has nothing left to cancel.
                    if !matches!(err, AssistantRunError::RunEnded(_)) {
                        self.cancel_run(&thread.id, &run.id).await;
                    }
                    return Err(err);
                }
                Err(PollError::TimedOut(_)) => {
                    self.cancel_run(&thread.id, &run.id).await;
                    return Err(AssistantRunError::TimedOut(self.poll.timeout));
                }
                Err(PollError::Cancelled) => {
                    self.cancel_run(&thread.id, &run.id).await;
                    return Err(AssistantRunError::Cancelled);
                }
            };

            let mut outputs = Vec::with_capacity(calls.len());
            for call in calls {
                let result = self.dispatcher.dispatch(&call.name, &call.arguments).await;
                dispatched.push(DispatchedCall {
                    name: call.name.clone(),
                    outcome: match &result {
                        Ok(_) => "ok",
                        Err(err) => err.code(),
                    },
                });
                outputs.push(json!({ "tool_call_id": call.id, "output": tool_output(&result) }));
            }

            let _: ObjectId = self
                .post_json(
                    &format!("threads/{}/runs/{}/submit_tool_outputs", thread.id, run.id),
                    &json!({ "tool_outputs": outputs }),
                )
                .await?;
            debug!(run_id = %run.id, submitted = outputs.len(), "tool outputs submitted");
        }

        let messages: MessageList = self
            .get_json(&format!("threads/{}/messages?order=desc&limit=20", thread.id))
            .await?;
        let reply = newest_assistant_text(&messages).ok_or(AssistantRunError::NoAssistantReply)?;
        info!(run_id = %run.id, tool_calls = dispatched.len(), "assistant run completed");

        Ok(AssistantRunOutcome {
            thread_id: thread.id,
            run_id: run.id,
            reply,
            dispatched,
        })
    }

    async fn probe_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<PollStatus<RunCheckpoint>, AssistantRunError> {
        let run: RunObject = self
            .get_json(&format!("threads/{thread_id}/runs/{run_id}"))
            .await?;
        debug!(run_id, status = run.status.as_str(), "assistant run polled");

        match run.status {
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {
                Ok(PollStatus::Pending)
            }
            RunStatus::Completed => Ok(PollStatus::Ready(RunCheckpoint::Completed)),
            RunStatus::RequiresAction => {
                let calls = run
                    .required_action
                    .map(|action| action.submit_tool_outputs.tool_calls)
                    .unwrap_or_default();
                if calls.is_empty() {
                    return Err(AssistantRunError::MissingToolCalls);
                }
                Ok(PollStatus::Ready(RunCheckpoint::RequiresAction(
                    calls.into_iter().map(ToolCall::from).collect(),
                )))
            }
            status => Err(AssistantRunError::RunEnded(status)),
        }
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        let result: Result<Value, _> = self
            .post_json(&format!("threads/{thread_id}/runs/{run_id}/cancel"), &json!({}))
            .await;
        if let Err(err) = result {
            warn!(run_id, error = %err, "failed to cancel assistant run");
        }
    }

    async fn post_json<T>(&self, path: &str, body: &Value) -> Result<T, LlmGatewayError>
    where
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let url = url.as_str();
        with_retries(&self.config, || async move {
            let reply = send_provider_request(
                self.client
                    .post(url)
                    .bearer_auth(&self.config.api_key)
                    .header(ASSISTANTS_BETA_HEADER.0, ASSISTANTS_BETA_HEADER.1)
                    .json(body),
            )
            .await?;
            parse_provider_body(&reply.body)
        })
        .await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, LlmGatewayError>
    where
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let url = url.as_str();
        with_retries(&self.config, || async move {
            let reply = send_provider_request(
                self.client
                    .get(url)
                    .bearer_auth(&self.config.api_key)
                    .header(ASSISTANTS_BETA_HEADER.0, ASSISTANTS_BETA_HEADER.1),
            )
            .await?;
            parse_provider_body(&reply.body)
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: RunStatus,
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<RunToolCall>,
}

#[derive(Debug, Deserialize)]
struct RunToolCall {
    id: String,
    function: RunFunctionCall,
}

#[derive(Debug, Deserialize)]
struct RunFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl From<RunToolCall> for ToolCall {
    fn from(call: RunToolCall) -> Self {
        Self {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

// The list is requested newest first.
fn newest_assistant_text(messages: &MessageList) -> Option<String> {
    let message = messages
        .data
        .iter()
        .find(|message| message.role == "assistant")?;

    let text = message
        .content
        .iter()
        .filter(|part| part.kind == "text")
        .filter_map(|part| part.text.as_ref())
        .map(|text| text.value.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();

    (!text.is_empty()).then(|| text.to_string())
}
