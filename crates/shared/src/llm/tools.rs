use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::dispatcher::{ToolDispatcher, tool_output};
use super::gateway::LlmGatewayError;
use crate::capabilities::Capability;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a travel assistant. Use the available tools to plan trips, \
compare eSIM plans, look up safety information, translate phrases and find local events.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// One function tool per registered capability, with the same argument schema
/// the registry validates against.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    Capability::ALL
        .into_iter()
        .map(|capability| ToolDefinition {
            kind: "function",
            function: FunctionDefinition {
                name: capability.name(),
                description: capability.description(),
                parameters: capability.parameters_schema(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningMessage {
    System(String),
    User(String),
    AssistantToolCalls(Vec<ToolCall>),
    ToolResult { call_id: String, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningStep {
    Reply(String),
    ToolCalls(Vec<ToolCall>),
}

pub type ReasoningFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ReasoningStep, LlmGatewayError>> + Send + 'a>>;

/// A backend that either answers or asks for tool calls given the transcript.
pub trait ReasoningBackend: Send + Sync {
    fn step<'a>(&'a self, messages: &'a [ReasoningMessage]) -> ReasoningFuture<'a>;
}

#[derive(Debug, Error)]
pub enum ToolLoopError {
    #[error("reasoning backend request timed out")]
    BackendTimeout,
    #[error("reasoning backend failed: {0}")]
    Backend(LlmGatewayError),
    #[error("reasoning backend returned an empty reply")]
    EmptyResponse,
    #[error("reasoning backend still requested tools after {0} rounds")]
    TooManyRounds(u32),
}

impl From<LlmGatewayError> for ToolLoopError {
    fn from(err: LlmGatewayError) -> Self {
        if err.is_timeout() {
            Self::BackendTimeout
        } else {
            Self::Backend(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedCall {
    pub name: String,
    pub outcome: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLoopOutcome {
    pub reply: String,
    pub dispatched: Vec<DispatchedCall>,
}

pub struct ToolCallingLoop {
    backend: Arc<dyn ReasoningBackend>,
    dispatcher: ToolDispatcher,
    system_prompt: String,
    max_rounds: u32,
}

impl ToolCallingLoop {
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        dispatcher: ToolDispatcher,
        max_rounds: u32,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_rounds,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub async fn run(&self, prompt: &str) -> Result<ToolLoopOutcome, ToolLoopError> {
        let mut messages = vec![
            ReasoningMessage::System(self.system_prompt.clone()),
            ReasoningMessage::User(prompt.to_string()),
        ];
        let mut dispatched = Vec::new();
        let mut rounds = 0_u32;

        loop {
            let calls = match self.backend.step(&messages).await? {
                ReasoningStep::Reply(reply) => {
                    let reply = reply.trim();
                    if reply.is_empty() {
                        return Err(ToolLoopError::EmptyResponse);
                    }
                    info!(rounds, tool_calls = dispatched.len(), "tool loop finished");
                    return Ok(ToolLoopOutcome {
                        reply: reply.to_string(),
                        dispatched,
                    });
                }
                ReasoningStep::ToolCalls(calls) => calls,
            };

            if rounds >= self.max_rounds {
                return Err(ToolLoopError::TooManyRounds(self.max_rounds));
            }
            rounds += 1;
            debug!(round = rounds, calls = calls.len(), "backend requested tools");

            messages.push(ReasoningMessage::AssistantToolCalls(calls.clone()));
            for call in calls {
                let result = self.dispatcher.dispatch(&call.name, &call.arguments).await;
                dispatched.push(DispatchedCall {
                    name: call.name.clone(),
                    outcome: match &result {
                        Ok(_) => "ok",
                        Err(err) => err.code(),
                    },
                });
                messages.push(ReasoningMessage::ToolResult {
                    call_id: call.id,
                    content: tool_output(&result),
                });
            }
        }
    }
}
