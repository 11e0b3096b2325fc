use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::turn::Turn;
use crate::llm::gateway::{LlmGateway, LlmGatewayError, LlmGatewayRequest};

const SUMMARY_TURN_PREFIX: &str = "Summary so far:\n";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary request failed: {0}")]
    Backend(#[from] LlmGatewayError),
    #[error("summary request returned no text")]
    Empty,
}

/// Collapses a long transcript into a single system turn.
#[derive(Clone)]
pub struct Summarizer {
    gateway: Arc<dyn LlmGateway>,
    model: String,
    threshold: usize,
    max_words: u32,
}

impl Summarizer {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        model: impl Into<String>,
        threshold: usize,
        max_words: u32,
    ) -> Self {
        Self {
            gateway,
            model: model.into(),
            threshold,
            max_words,
        }
    }

    pub fn needs_summary(&self, history: &[Turn]) -> bool {
        history.len() > self.threshold
    }

    pub fn prompt(&self, history: &[Turn]) -> String {
        format!(
            "Summarize briefly (<={} words) preserving key facts and decisions:\n\n{}",
            self.max_words,
            flatten_history(history)
        )
    }

    pub async fn summarize(
        &self,
        session_id: &str,
        history: &[Turn],
    ) -> Result<Turn, SummaryError> {
        let request = LlmGatewayRequest::new(&self.model, vec![Turn::user(self.prompt(history))])
            .with_requester_id(session_id);
        let response = self.gateway.generate(request).await?;

        let summary = response.text.trim();
        if summary.is_empty() {
            return Err(SummaryError::Empty);
        }
        debug!(
            session_id,
            turns = history.len(),
            model = %response.model,
            "history summarized"
        );

        Ok(Turn::system(format!("{SUMMARY_TURN_PREFIX}{summary}")))
    }
}

pub fn flatten_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}
