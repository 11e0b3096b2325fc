use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslationRequest {
    /// Phrase to translate.
    #[schemars(length(min = 1))]
    pub phrase: String,
    /// Language to translate into, e.g. "Italian".
    #[schemars(length(min = 1))]
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub original: String,
    pub language: String,
    pub translation: String,
}

pub fn get_translation(request: &TranslationRequest) -> Translation {
    Translation {
        original: request.phrase.clone(),
        language: request.target_language.clone(),
        translation: format!(
            "Translated '{}' to {}.",
            request.phrase, request.target_language
        ),
    }
}
