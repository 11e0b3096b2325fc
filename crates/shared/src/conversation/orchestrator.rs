use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::locks::SessionLocks;
use super::store::{SessionStore, SessionStoreError};
use super::summarizer::Summarizer;
use super::turn::Turn;
use crate::config::ChatSettings;
use crate::llm::gateway::{LlmGateway, LlmGatewayError, LlmGatewayRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnRequest {
    pub session_id: String,
    pub message: String,
    pub model: Option<String>,
    pub max_output_tokens: Option<u32>,
}

impl ChatTurnRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            model: None,
            max_output_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    NotNeeded,
    Applied,
    Failed(String),
}

impl SummaryOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotNeeded => "not_needed",
            Self::Applied => "applied",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub reply: String,
    pub summary: SummaryOutcome,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid field `{field}`: {message}")]
    InvalidRequest {
        field: &'static str,
        message: &'static str,
    },
    #[error("text generation backend returned no text")]
    EmptyResponse,
    #[error("text generation backend timed out")]
    BackendTimeout,
    #[error("text generation backend failed: {0}")]
    Backend(LlmGatewayError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl From<LlmGatewayError> for ChatError {
    fn from(err: LlmGatewayError) -> Self {
        if err.is_timeout() {
            Self::BackendTimeout
        } else {
            Self::Backend(err)
        }
    }
}

/// Runs one chat turn per call: summarize when the transcript is long,
/// generate a reply, then persist the user and assistant turns together.
pub struct ChatOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    summarizer: Summarizer,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        store: Arc<dyn SessionStore>,
        settings: ChatSettings,
    ) -> Self {
        let summarizer = Summarizer::new(
            gateway.clone(),
            settings.summary_model.clone(),
            settings.summary_threshold,
            settings.summary_max_words,
        );

        Self {
            gateway,
            store,
            locks: SessionLocks::new(),
            summarizer,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn chat(&self, request: ChatTurnRequest) -> Result<ChatOutcome, ChatError> {
        // Session ids are opaque keys; whitespace only matters for the emptiness check.
        let session_id = request.session_id.as_str();
        if session_id.trim().is_empty() {
            return Err(ChatError::InvalidRequest {
                field: "session_id",
                message: "must not be empty",
            });
        }
        if request.message.trim().is_empty() {
            return Err(ChatError::InvalidRequest {
                field: "message",
                message: "must not be empty",
            });
        }
        if request.max_output_tokens == Some(0) {
            return Err(ChatError::InvalidRequest {
                field: "max_output_tokens",
                message: "must be positive",
            });
        }

        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(&self.settings.default_model)
            .to_string();
        let max_output_tokens = request
            .max_output_tokens
            .unwrap_or(self.settings.max_output_tokens);

        let _session_guard = self.locks.acquire(session_id).await?;
        let mut history = self.store.get_history(session_id).await?;

        let summary = if self.summarizer.needs_summary(&history) {
            match self.summarizer.summarize(session_id, &history).await {
                Ok(summary_turn) => {
                    history = vec![summary_turn];
                    SummaryOutcome::Applied
                }
                Err(err) => {
                    warn!(
                        session_id,
                        turns = history.len(),
                        error = %err,
                        "history summary failed, continuing with full history"
                    );
                    SummaryOutcome::Failed(err.to_string())
                }
            }
        } else {
            SummaryOutcome::NotNeeded
        };

        let user_turn = Turn::user(request.message.as_str());
        let mut input = history.clone();
        input.push(user_turn.clone());

        let response = self
            .gateway
            .generate(
                LlmGatewayRequest::new(&model, input)
                    .with_requester_id(session_id)
                    .with_max_output_tokens(max_output_tokens),
            )
            .await
            .inspect_err(|err| {
                warn!(session_id, model = %model, error = %err, "chat generation failed");
            })?;

        let reply = response.text.trim().to_string();
        if reply.is_empty() {
            warn!(session_id, model = %model, "chat generation returned no text");
            return Err(ChatError::EmptyResponse);
        }

        let new_turns = vec![user_turn, Turn::assistant(reply.as_str())];
        if summary == SummaryOutcome::Applied {
            history.extend(new_turns);
            self.store.replace_history(session_id, history).await?;
        } else {
            self.store.append_turns(session_id, new_turns).await?;
        }

        info!(
            session_id,
            model = %model,
            summary = summary.as_str(),
            "chat turn completed"
        );

        Ok(ChatOutcome {
            reply,
            summary,
            model,
        })
    }
}

/// Splits a reply into word chunks that keep their trailing whitespace, so
/// the chunks concatenate back to exactly the reply.
pub fn reply_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut seen_word = false;
    let mut after_word = false;

    for (index, ch) in text.char_indices() {
        if ch.is_whitespace() {
            after_word = seen_word;
            continue;
        }
        if after_word {
            chunks.push(&text[start..index]);
            start = index;
            after_word = false;
        }
        seen_word = true;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{ChatError, ChatOrchestrator, ChatTurnRequest, SummaryOutcome, reply_chunks};
    use crate::config::ChatSettings;
    use crate::conversation::test_support::StubGateway;
    use crate::conversation::{InMemorySessionStore, SessionStore, Turn, TurnRole};
    use crate::llm::gateway::LlmGatewayError;

    fn settings(threshold: usize) -> ChatSettings {
        ChatSettings {
            summary_threshold: threshold,
            ..ChatSettings::default()
        }
    }

    fn orchestrator(gateway: Arc<StubGateway>, threshold: usize) -> ChatOrchestrator {
        ChatOrchestrator::new(
            gateway,
            Arc::new(InMemorySessionStore::new()),
            settings(threshold),
        )
    }

    #[tokio::test]
    async fn appends_user_then_assistant_turn() {
        let gateway = StubGateway::with_texts(&[" Try the Alfama district. "]);
        let orchestrator = orchestrator(gateway.clone(), 20);

        let outcome = orchestrator
            .chat(ChatTurnRequest::new("s1", "Where should I stay in Lisbon?"))
            .await
            .expect("chat should succeed");

        assert_eq!(outcome.reply, "Try the Alfama district.");
        assert_eq!(outcome.summary, SummaryOutcome::NotNeeded);
        assert_eq!(outcome.model, "gpt-4o");

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert_eq!(
            history,
            vec![
                Turn::user("Where should I stay in Lisbon?"),
                Turn::assistant("Try the Alfama district."),
            ]
        );

        let requests = gateway.requests();
        assert_eq!(requests[0].max_output_tokens, Some(3_000));
        assert_eq!(requests[0].input, vec![Turn::user("Where should I stay in Lisbon?")]);
    }

    #[tokio::test]
    async fn request_overrides_model_and_token_limit() {
        let gateway = StubGateway::with_texts(&["ok"]);
        let orchestrator = orchestrator(gateway.clone(), 20);

        let outcome = orchestrator
            .chat(ChatTurnRequest {
                model: Some("gpt-4o-mini".to_string()),
                max_output_tokens: Some(64),
                ..ChatTurnRequest::new("s1", "hi")
            })
            .await
            .expect("chat should succeed");

        assert_eq!(outcome.model, "gpt-4o-mini");
        let requests = gateway.requests();
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].max_output_tokens, Some(64));
    }

    #[tokio::test]
    async fn long_history_is_replaced_by_summary() {
        let gateway = StubGateway::with_texts(&["Traveller likes museums.", "Visit the Prado."]);
        let orchestrator = orchestrator(gateway.clone(), 4);
        let seeded = (0..5)
            .map(|index| Turn::user(format!("turn {index}")))
            .collect::<Vec<_>>();
        orchestrator
            .store()
            .append_turns("s1", seeded)
            .await
            .expect("seed should work");

        let outcome = orchestrator
            .chat(ChatTurnRequest::new("s1", "Any museum tips for Madrid?"))
            .await
            .expect("chat should succeed");
        assert_eq!(outcome.summary, SummaryOutcome::Applied);

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, TurnRole::System);
        assert_eq!(history[0].content, "Summary so far:\nTraveller likes museums.");
        assert_eq!(history[1], Turn::user("Any museum tips for Madrid?"));
        assert_eq!(history[2], Turn::assistant("Visit the Prado."));

        let requests = gateway.requests();
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[1].input.len(), 2);
        assert_eq!(requests[1].input[0].role, TurnRole::System);
    }

    #[tokio::test]
    async fn turns_after_summary_append_normally() {
        let gateway = StubGateway::with_texts(&["summary", "first", "second"]);
        let orchestrator = orchestrator(gateway, 3);
        let seeded = vec![
            Turn::user("a"),
            Turn::assistant("b"),
            Turn::user("c"),
            Turn::assistant("d"),
        ];
        orchestrator
            .store()
            .append_turns("s1", seeded)
            .await
            .expect("seed should work");

        orchestrator
            .chat(ChatTurnRequest::new("s1", "one"))
            .await
            .expect("first chat should succeed");
        let outcome = orchestrator
            .chat(ChatTurnRequest::new("s1", "two"))
            .await
            .expect("second chat should succeed");
        assert_eq!(outcome.summary, SummaryOutcome::NotNeeded);

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert_eq!(history.len(), 5);
        assert_eq!(history[3], Turn::user("two"));
        assert_eq!(history[4], Turn::assistant("second"));
    }

    #[tokio::test]
    async fn failed_summary_keeps_history_and_still_replies() {
        let gateway = Arc::new(StubGateway::new(vec![
            Err(LlmGatewayError::ProviderFailure("status=500 code=server_error".into())),
            Ok(StubGateway::response("Still here.")),
        ]));
        let orchestrator = orchestrator(gateway.clone(), 2);
        let seeded = vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")];
        orchestrator
            .store()
            .append_turns("s1", seeded.clone())
            .await
            .expect("seed should work");

        let outcome = orchestrator
            .chat(ChatTurnRequest::new("s1", "hello?"))
            .await
            .expect("chat should proceed without a summary");
        assert!(matches!(outcome.summary, SummaryOutcome::Failed(_)));

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert_eq!(history.len(), 5);
        assert_eq!(&history[..3], seeded.as_slice());
        assert_eq!(gateway.requests()[1].input.len(), 4);
    }

    #[tokio::test]
    async fn backend_failures_leave_history_untouched() {
        let gateway = Arc::new(StubGateway::new(vec![
            Err(LlmGatewayError::Timeout),
            Err(LlmGatewayError::ProviderFailure("status=401 code=invalid_api_key".into())),
            Ok(StubGateway::response("   ")),
        ]));
        let orchestrator = orchestrator(gateway, 20);

        let err = orchestrator
            .chat(ChatTurnRequest::new("s1", "hi"))
            .await
            .expect_err("timeout must fail");
        assert!(matches!(err, ChatError::BackendTimeout));

        let err = orchestrator
            .chat(ChatTurnRequest::new("s1", "hi"))
            .await
            .expect_err("provider failure must fail");
        assert!(matches!(err, ChatError::Backend(_)));

        let err = orchestrator
            .chat(ChatTurnRequest::new("s1", "hi"))
            .await
            .expect_err("empty text must fail");
        assert!(matches!(err, ChatError::EmptyResponse));

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn summary_is_discarded_when_generation_fails() {
        let gateway = Arc::new(StubGateway::new(vec![
            Ok(StubGateway::response("summary")),
            Err(LlmGatewayError::Timeout),
        ]));
        let orchestrator = orchestrator(gateway, 2);
        let seeded = vec![Turn::user("a"), Turn::assistant("b"), Turn::user("c")];
        orchestrator
            .store()
            .append_turns("s1", seeded.clone())
            .await
            .expect("seed should work");

        orchestrator
            .chat(ChatTurnRequest::new("s1", "hi"))
            .await
            .expect_err("generation failure must fail");

        let history = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        assert_eq!(history, seeded);
    }

    #[tokio::test]
    async fn session_ids_are_kept_verbatim() {
        let gateway = StubGateway::with_texts(&["first", "second"]);
        let orchestrator = orchestrator(gateway, 20);

        orchestrator
            .chat(ChatTurnRequest::new("s1", "hello"))
            .await
            .expect("chat should succeed");
        orchestrator
            .chat(ChatTurnRequest::new(" s1 ", "hello again"))
            .await
            .expect("chat should succeed");

        let plain = orchestrator
            .store()
            .get_history("s1")
            .await
            .expect("history should load");
        let padded = orchestrator
            .store()
            .get_history(" s1 ")
            .await
            .expect("history should load");
        assert_eq!(plain, vec![Turn::user("hello"), Turn::assistant("first")]);
        assert_eq!(padded, vec![Turn::user("hello again"), Turn::assistant("second")]);
    }

    #[tokio::test]
    async fn rejects_blank_fields() {
        let orchestrator = orchestrator(StubGateway::with_texts(&[]), 20);

        let err = orchestrator
            .chat(ChatTurnRequest::new("  ", "hi"))
            .await
            .expect_err("blank session must fail");
        assert!(matches!(err, ChatError::InvalidRequest { field: "session_id", .. }));

        let err = orchestrator
            .chat(ChatTurnRequest::new("s1", "\n"))
            .await
            .expect_err("blank message must fail");
        assert!(matches!(err, ChatError::InvalidRequest { field: "message", .. }));

        let err = orchestrator
            .chat(ChatTurnRequest {
                max_output_tokens: Some(0),
                ..ChatTurnRequest::new("s1", "hi")
            })
            .await
            .expect_err("zero token limit must fail");
        assert!(matches!(
            err,
            ChatError::InvalidRequest {
                field: "max_output_tokens",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_never_interleave() {
        let gateway = Arc::new(StubGateway::echo().with_delay(Duration::from_millis(5)));
        let orchestrator = Arc::new(orchestrator(gateway, 1_000));

        let mut tasks = Vec::new();
        for index in 0..8 {
            let orchestrator = orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .chat(ChatTurnRequest::new("shared", format!("message {index}")))
                    .await
            }));
        }
        for task in tasks {
            task.await
                .expect("task should join")
                .expect("chat should succeed");
        }

        let history = orchestrator
            .store()
            .get_history("shared")
            .await
            .expect("history should load");
        assert_eq!(history.len(), 16);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::User);
            assert_eq!(pair[1].role, TurnRole::Assistant);
            assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        }
    }

    #[test]
    fn reply_chunks_concatenate_to_the_reply() {
        let reply = "  Day 1:\n  Visit   the Louvre. ";
        let chunks = reply_chunks(reply);
        assert_eq!(chunks.concat(), reply);
        assert_eq!(chunks, vec!["  Day ", "1:\n  ", "Visit   ", "the ", "Louvre. "]);

        assert!(reply_chunks("").is_empty());
        assert_eq!(reply_chunks("single"), vec!["single"]);
    }
}
