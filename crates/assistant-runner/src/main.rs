mod cli;

use std::sync::Arc;
use std::time::Duration;

use cli::{CliError, CliOptions, RunnerMode};
use shared::config::{RunnerConfig, load_dotenv};
use shared::llm::{
    AssistantRunError, AssistantsClient, DispatchError, HttpCapabilityHost,
    OpenAiChatCompletionsBackend, OpenAiClientError, ToolCallingLoop, ToolDispatcher,
    ToolLoopError,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
enum RunnerError {
    #[error("ASSISTANT_ID is required in assistant mode")]
    MissingAssistantId,
    #[error(transparent)]
    Client(#[from] OpenAiClientError),
    #[error(transparent)]
    CapabilityHost(#[from] DispatchError),
    #[error(transparent)]
    ToolLoop(#[from] ToolLoopError),
    #[error(transparent)]
    Assistant(#[from] AssistantRunError),
    #[error("run cancelled")]
    Cancelled,
}

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "assistant_runner=debug,shared=info".to_string()),
        )
        .init();

    let config = match RunnerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read runner config: {err}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, cancelling run");
            signal_token.cancel();
        }
    });

    match run(&options, config, &cancel).await {
        Ok(reply) => println!("{reply}"),
        Err(err) => {
            error!(mode = options.mode.as_str(), "assistant run failed: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(
    options: &CliOptions,
    config: RunnerConfig,
    cancel: &CancellationToken,
) -> Result<String, RunnerError> {
    let dispatcher = match config.capability_host_url.as_deref() {
        Some(url) => ToolDispatcher::new(Arc::new(HttpCapabilityHost::new(
            url,
            Duration::from_millis(config.capability_host_timeout_ms),
        )?)),
        None => ToolDispatcher::local(),
    };
    info!(
        mode = options.mode.as_str(),
        remote_capabilities = config.capability_host_url.is_some(),
        "starting assistant run"
    );

    match options.mode {
        RunnerMode::Tools => {
            let backend =
                OpenAiChatCompletionsBackend::new(config.openai, config.reasoning_model)?;
            let tool_loop =
                ToolCallingLoop::new(Arc::new(backend), dispatcher, config.tool_loop_max_rounds);

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
                outcome = tool_loop.run(&options.prompt) => outcome?,
            };
            info!(tool_calls = outcome.dispatched.len(), "tool loop completed");
            Ok(outcome.reply)
        }
        RunnerMode::Assistant => {
            let assistant_id = config
                .assistant_id
                .ok_or(RunnerError::MissingAssistantId)?;
            let client =
                AssistantsClient::new(config.openai, assistant_id, dispatcher, config.run_poll)?;

            let outcome = client.run(&options.prompt, cancel).await?;
            info!(
                thread_id = %outcome.thread_id,
                tool_calls = outcome.dispatched.len(),
                "assistant run completed"
            );
            Ok(outcome.reply)
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p assistant-runner -- [--mode tools|assistant] --prompt <text>\n\
         \n\
         Modes:\n\
         - tools (default): chat completions with function calling\n\
         - assistant: assistant thread/run polled until completion (needs ASSISTANT_ID)\n\
         \n\
         Tool calls run in-process unless CAPABILITY_HOST_URL points at an api-server.\n\
         \n\
         Options:\n\
         - --prompt <text>  Message sent to the reasoning backend\n\
         - --help           Show this help text"
    );
}
