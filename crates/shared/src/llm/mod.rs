pub mod assistants;
pub mod chat_completions;
pub mod dispatcher;
pub mod gateway;
pub mod openai;
pub mod poller;
pub mod tools;

pub use assistants::{AssistantRunError, AssistantRunOutcome, AssistantsClient, RunStatus};
pub use chat_completions::OpenAiChatCompletionsBackend;
pub use dispatcher::{
    CapabilityHost, DispatchError, HttpCapabilityHost, LocalCapabilityHost, ToolDispatcher,
    parse_arguments, tool_output,
};
pub use gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};
pub use openai::{OpenAiClientError, OpenAiGatewayConfig, OpenAiResponsesGateway};
pub use poller::{PollConfig, PollError, PollStatus, poll_with_backoff};
pub use tools::{
    DispatchedCall, ReasoningBackend, ReasoningMessage, ReasoningStep, ToolCall, ToolCallingLoop,
    ToolDefinition, ToolLoopError, ToolLoopOutcome, tool_definitions,
};
