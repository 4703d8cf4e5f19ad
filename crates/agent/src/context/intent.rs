//! Cheap calendar-intent detection.
//!
//! Decides whether a turn needs the seller's calendar. The check is
//! synchronous and keyword based: whole-word keyword hits or phrase hits in
//! the current message or in the last few messages of the conversation.
//! Anything else defaults to "no calendar".

use dealdesk_config::IntentConfig;
use dealdesk_core::message::Message;

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    keywords: Vec<String>,
    phrases: Vec<String>,
    recent_window: usize,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::from_config(&IntentConfig::default())
    }
}

impl IntentClassifier {
    pub fn new(keywords: Vec<String>, phrases: Vec<String>, recent_window: usize) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
            phrases: phrases.iter().map(|p| normalize(p)).collect(),
            recent_window,
        }
    }

    pub fn from_config(config: &IntentConfig) -> Self {
        Self::new(
            config.keywords.clone(),
            config.phrases.clone(),
            config.recent_window,
        )
    }

    /// True when `message` or one of the last `recent_window` entries of
    /// `recent` talks about scheduling.
    pub fn needs_calendar(&self, message: &str, recent: &[Message]) -> bool {
        if self.matches(message) {
            return true;
        }
        recent
            .iter()
            .rev()
            .take(self.recent_window)
            .any(|m| self.matches(&m.content))
    }

    /// Keyword or phrase hit in a single text.
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }
        if normalized
            .split(' ')
            .any(|word| self.keywords.iter().any(|k| k == word))
        {
            return true;
        }
        let padded = format!(" {normalized} ");
        self.phrases
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| padded.contains(&format!(" {p} ")))
    }
}

/// Lowercase, replace punctuation with spaces, collapse runs of whitespace.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
