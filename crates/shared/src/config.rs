use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;

use crate::config_env::{
    ensure_http_url, ensure_positive, optional_trimmed_env, parse_bool_env, parse_u32_env,
    parse_u64_env, parse_usize_env, require_non_empty_env,
};
use crate::llm::openai::OpenAiGatewayConfig;
use crate::llm::poller::PollConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_OPENAI_MAX_RETRIES: u32 = 0;
const DEFAULT_OPENAI_RETRY_BASE_BACKOFF_MS: u64 = 250;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 3_000;
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 20;
pub const DEFAULT_SUMMARY_MAX_WORDS: u32 = 200;

const DEFAULT_CAPABILITY_HOST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TOOL_LOOP_MAX_ROUNDS: u32 = 5;
const DEFAULT_RUN_POLL_INITIAL_MS: u64 = 500;
const DEFAULT_RUN_POLL_MAX_MS: u64 = 4_000;
const DEFAULT_RUN_POLL_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env: {0}")]
    Dotenv(String),
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub default_model: String,
    pub summary_model: String,
    pub max_output_tokens: u32,
    pub summary_threshold: usize,
    pub summary_max_words: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            summary_max_words: DEFAULT_SUMMARY_MAX_WORDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub openai: OpenAiGatewayConfig,
    pub chat: ChatSettings,
    pub moderation_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub openai: OpenAiGatewayConfig,
    pub assistant_id: Option<String>,
    pub capability_host_url: Option<String>,
    pub capability_host_timeout_ms: u64,
    pub reasoning_model: String,
    pub tool_loop_max_rounds: u32,
    pub run_poll: PollConfig,
}

/// Loads `.env` from the working directory when one exists. Variables that are
/// already set in the process environment win. A missing file is fine; an
/// unreadable or malformed one is an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    dotenv_outcome(dotenvy::dotenv())
}

fn dotenv_outcome<T>(result: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chat = ChatSettings {
            default_model: optional_trimmed_env("CHAT_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            summary_model: optional_trimmed_env("CHAT_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            max_output_tokens: parse_u32_env("CHAT_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?,
            summary_threshold: parse_usize_env(
                "CHAT_SUMMARY_THRESHOLD",
                DEFAULT_SUMMARY_THRESHOLD,
            )?,
            summary_max_words: parse_u32_env("CHAT_SUMMARY_MAX_WORDS", DEFAULT_SUMMARY_MAX_WORDS)?,
        };
        ensure_positive("CHAT_MAX_OUTPUT_TOKENS", u64::from(chat.max_output_tokens))?;
        ensure_positive("CHAT_SUMMARY_THRESHOLD", chat.summary_threshold as u64)?;
        ensure_positive("CHAT_SUMMARY_MAX_WORDS", u64::from(chat.summary_max_words))?;

        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            openai: openai_config_from_env()?,
            chat,
            moderation_enabled: parse_bool_env("CHAT_MODERATION_ENABLED", true)?,
        })
    }
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let capability_host_url = optional_trimmed_env("CAPABILITY_HOST_URL");
        if let Some(url) = capability_host_url.as_deref() {
            ensure_http_url("CAPABILITY_HOST_URL", url)?;
        }

        let capability_host_timeout_ms = parse_u64_env(
            "CAPABILITY_HOST_TIMEOUT_MS",
            DEFAULT_CAPABILITY_HOST_TIMEOUT_MS,
        )?;
        ensure_positive("CAPABILITY_HOST_TIMEOUT_MS", capability_host_timeout_ms)?;

        let tool_loop_max_rounds =
            parse_u32_env("TOOL_LOOP_MAX_ROUNDS", DEFAULT_TOOL_LOOP_MAX_ROUNDS)?;
        ensure_positive("TOOL_LOOP_MAX_ROUNDS", u64::from(tool_loop_max_rounds))?;

        let initial_ms = parse_u64_env("RUN_POLL_INITIAL_MS", DEFAULT_RUN_POLL_INITIAL_MS)?;
        let max_ms = parse_u64_env("RUN_POLL_MAX_MS", DEFAULT_RUN_POLL_MAX_MS)?;
        let timeout_ms = parse_u64_env("RUN_POLL_TIMEOUT_MS", DEFAULT_RUN_POLL_TIMEOUT_MS)?;
        ensure_positive("RUN_POLL_INITIAL_MS", initial_ms)?;
        ensure_positive("RUN_POLL_TIMEOUT_MS", timeout_ms)?;
        if max_ms < initial_ms {
            return Err(ConfigError::InvalidConfiguration(
                "RUN_POLL_MAX_MS must be at least RUN_POLL_INITIAL_MS".to_string(),
            ));
        }

        Ok(Self {
            openai: openai_config_from_env()?,
            assistant_id: optional_trimmed_env("ASSISTANT_ID"),
            capability_host_url,
            capability_host_timeout_ms,
            reasoning_model: optional_trimmed_env("REASONING_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            tool_loop_max_rounds,
            run_poll: PollConfig {
                initial_interval: Duration::from_millis(initial_ms),
                max_interval: Duration::from_millis(max_ms),
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }
}

fn openai_config_from_env() -> Result<OpenAiGatewayConfig, ConfigError> {
    let base_url = optional_trimmed_env("OPENAI_BASE_URL")
        .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
    ensure_http_url("OPENAI_BASE_URL", &base_url)?;

    let timeout_ms = parse_u64_env("OPENAI_TIMEOUT_MS", DEFAULT_OPENAI_TIMEOUT_MS)?;
    ensure_positive("OPENAI_TIMEOUT_MS", timeout_ms)?;

    Ok(OpenAiGatewayConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: require_non_empty_env("OPENAI_API_KEY")?,
        timeout_ms,
        max_retries: parse_u32_env("OPENAI_MAX_RETRIES", DEFAULT_OPENAI_MAX_RETRIES)?,
        retry_base_backoff_ms: parse_u64_env(
            "OPENAI_RETRY_BASE_BACKOFF_MS",
            DEFAULT_OPENAI_RETRY_BASE_BACKOFF_MS,
        )?,
    })
}
