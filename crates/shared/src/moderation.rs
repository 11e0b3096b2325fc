use serde::{Deserialize, Serialize};

const COMPETITOR_TERMS: &[&str] = &[
    "competitor",
    "openai",
    "chatgpt",
    "claude",
    "gemini",
    "bard",
    "pi",
    "meta ai",
    "anthropic",
    "perplexity",
    "mistral",
    "llama",
    "groq",
    "comparison",
    "vs",
    "compare",
    "better than",
    "alternative",
    "benchmark",
    "airalo",
    "holafly",
    "ubigi",
    "nomad esim",
    "saily",
    "yesim",
];

const PROFANITY_TERMS: &[&str] = &[
    "fuck", "shit", "bitch", "ass", "asshole", "bastard", "damn", "crap", "dick", "piss",
    "fucker", "fucking", "retard", "douche", "slut", "whore",
];

const SEXUAL_TERMS: &[&str] = &[
    "sex",
    "porn",
    "nude",
    "naked",
    "boobs",
    "breasts",
    "vagina",
    "penis",
    "dildo",
    "cum",
    "orgasm",
    "anal",
    "blowjob",
    "masturbate",
];

const ACCEPTED_MESSAGE: &str = "Your message is accepted and being processed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationReason {
    CompetitorDetected,
    ProfanityDetected,
    InappropriateContent,
}

impl ModerationReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompetitorDetected => "competitor_detected",
            Self::ProfanityDetected => "profanity_detected",
            Self::InappropriateContent => "inappropriate_content",
        }
    }

    pub const fn refusal_message(self) -> &'static str {
        match self {
            Self::CompetitorDetected => {
                "I'm unable to answer questions about competitors. Let me know how I can help with your travel plans!"
            }
            Self::ProfanityDetected => {
                "Please avoid using offensive language so I can assist you better."
            }
            Self::InappropriateContent => {
                "I'm here to help with travel-related queries. Please keep the conversation respectful."
            }
        }
    }

    const fn blocklist(self) -> &'static [&'static str] {
        match self {
            Self::CompetitorDetected => COMPETITOR_TERMS,
            Self::ProfanityDetected => PROFANITY_TERMS,
            Self::InappropriateContent => SEXUAL_TERMS,
        }
    }
}

// Checked in this order; the first category with a hit decides the reason.
const PRIORITY: [ModerationReason; 3] = [
    ModerationReason::CompetitorDetected,
    ModerationReason::ProfanityDetected,
    ModerationReason::InappropriateContent,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub allowed: bool,
    pub reason: Option<ModerationReason>,
    pub message: String,
}

impl ModerationVerdict {
    fn accepted() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: ACCEPTED_MESSAGE.to_string(),
        }
    }

    fn blocked(reason: ModerationReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            message: reason.refusal_message().to_string(),
        }
    }
}

pub fn classify(message: &str) -> ModerationVerdict {
    let padded = format!(" {} ", normalize(message));

    PRIORITY
        .into_iter()
        .find(|reason| {
            reason
                .blocklist()
                .iter()
                .any(|term| padded.contains(&format!(" {term} ")))
        })
        .map(ModerationVerdict::blocked)
        .unwrap_or_else(ModerationVerdict::accepted)
}

/// Lowercases the message and collapses every run of non-alphanumeric
/// characters into a single space.
pub fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
