use serde::Deserialize;
use serde_json::{Value, json};

use super::gateway::LlmGatewayError;
use super::openai::{
    OpenAiClientError, OpenAiGatewayConfig, SendAttemptError, build_http_client,
    parse_provider_body, send_provider_request, with_retries,
};
use super::tools::{
    ReasoningBackend, ReasoningFuture, ReasoningMessage, ReasoningStep, ToolCall,
    ToolDefinition, tool_definitions,
};

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Function-calling backend over the Chat Completions API.
#[derive(Clone)]
pub struct OpenAiChatCompletionsBackend {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
    model: String,
    tools: Vec<ToolDefinition>,
}

impl OpenAiChatCompletionsBackend {
    pub fn new(
        config: OpenAiGatewayConfig,
        model: impl Into<String>,
    ) -> Result<Self, OpenAiClientError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            model: model.into(),
            tools: tool_definitions(),
        })
    }

    async fn send_once(&self, body: &Value) -> Result<ReasoningStep, SendAttemptError> {
        let reply = send_provider_request(
            self.client
                .post(self.config.endpoint(CHAT_COMPLETIONS_PATH))
                .bearer_auth(&self.config.api_key)
                .json(body),
        )
        .await?;

        let parsed: ChatCompletionBody = parse_provider_body(&reply.body)?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                SendAttemptError::non_retryable(LlmGatewayError::InvalidProviderPayload(
                    "missing_choices".to_string(),
                ))
            })?;

        Ok(step_from_message(message))
    }
}

impl ReasoningBackend for OpenAiChatCompletionsBackend {
    fn step<'a>(&'a self, messages: &'a [ReasoningMessage]) -> ReasoningFuture<'a> {
        Box::pin(async move {
            let body = json!({
                "model": self.model,
                "messages": messages.iter().map(wire_message).collect::<Vec<_>>(),
                "tools": self.tools,
                "tool_choice": "auto",
            });
            with_retries(&self.config, || self.send_once(&body)).await
        })
    }
}

fn wire_message(message: &ReasoningMessage) -> Value {
    match message {
        ReasoningMessage::System(content) => json!({ "role": "system", "content": content }),
        ReasoningMessage::User(content) => json!({ "role": "user", "content": content }),
        ReasoningMessage::AssistantToolCalls(calls) => json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": calls
                .iter()
                .map(|call| json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                }))
                .collect::<Vec<_>>(),
        }),
        ReasoningMessage::ToolResult { call_id, content } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": content,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionBody {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn step_from_message(message: ChatCompletionMessage) -> ReasoningStep {
    if message.tool_calls.is_empty() {
        return ReasoningStep::Reply(message.content.unwrap_or_default());
    }

    ReasoningStep::ToolCalls(
        message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect(),
    )
}
