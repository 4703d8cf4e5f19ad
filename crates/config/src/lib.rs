//! Configuration loading, validation, and management for DealDesk.
//!
//! Loads configuration from `~/.dealdesk/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.dealdesk/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Similarity-search limits per source
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Business hours for free-slot computation
    #[serde(default)]
    pub availability: AvailabilityConfig,

    /// Metering
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Calendar-intent detection
    #[serde(default)]
    pub intent: IntentConfig,

    /// Embedding endpoint
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Persistent storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `k` and minimum similarity for one similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchLimit {
    pub limit: usize,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_success_limit")]
    pub success_examples: SearchLimit,

    #[serde(default = "default_failure_limit")]
    pub failure_examples: SearchLimit,

    #[serde(default = "default_knowledge_limit")]
    pub knowledge: SearchLimit,

    /// How far ahead the calendar is fetched
    #[serde(default = "default_days_ahead")]
    pub calendar_days_ahead: u32,
}

fn default_success_limit() -> SearchLimit {
    SearchLimit {
        limit: 3,
        threshold: 0.4,
    }
}
fn default_failure_limit() -> SearchLimit {
    SearchLimit {
        limit: 2,
        threshold: 0.4,
    }
}
fn default_knowledge_limit() -> SearchLimit {
    SearchLimit {
        limit: 3,
        threshold: 0.5,
    }
}
fn default_days_ahead() -> u32 {
    7
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            success_examples: default_success_limit(),
            failure_examples: default_failure_limit(),
            knowledge: default_knowledge_limit(),
            calendar_days_ahead: default_days_ahead(),
        }
    }
}

/// Business hours. Times are `HH:MM`, durations are minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    #[serde(default = "default_day_start")]
    pub day_start: String,

    #[serde(default = "default_day_end")]
    pub day_end: String,

    #[serde(default = "default_thirty")]
    pub granularity_minutes: u32,

    #[serde(default = "default_thirty")]
    pub min_slot_minutes: u32,

    #[serde(default = "default_event_minutes")]
    pub default_event_minutes: u32,

    #[serde(default = "default_days_ahead")]
    pub window_days: u32,
}

fn default_day_start() -> String {
    "08:00".into()
}
fn default_day_end() -> String {
    "18:00".into()
}
fn default_thirty() -> u32 {
    30
}
fn default_event_minutes() -> u32 {
    60
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            granularity_minutes: default_thirty(),
            min_slot_minutes: default_thirty(),
            default_event_minutes: default_event_minutes(),
            window_days: default_days_ahead(),
        }
    }
}

impl AvailabilityConfig {
    /// Opening time as minutes since midnight.
    pub fn day_start_minute(&self) -> Result<u32, ConfigError> {
        parse_hhmm(&self.day_start)
    }

    /// Closing time as minutes since midnight.
    pub fn day_end_minute(&self) -> Result<u32, ConfigError> {
        parse_hhmm(&self.day_end)
    }
}

/// Parse `HH:MM` into minutes since midnight. `24:00` is accepted.
pub fn parse_hhmm(value: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::ValidationError(format!("invalid time '{value}', expected HH:MM"));
    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    let m: u32 = m.parse().map_err(|_| invalid())?;
    if m >= 60 || h > 24 || (h == 24 && m > 0) {
        return Err(invalid());
    }
    Ok(h * 60 + m)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Credits charged for one successful reply
    #[serde(default = "default_credits_per_reply")]
    pub credits_per_reply: f64,

    /// Monthly base limit given to tenants seen for the first time.
    /// Written as `"unlimited"` when there is none.
    #[serde(default = "default_monthly_limit", with = "monthly_limit")]
    pub default_monthly_limit: Option<f64>,
}

/// `Option<f64>` as either a number or the string `"unlimited"`.
/// TOML has no null, so `None` needs a spelling of its own.
mod monthly_limit {
    use serde::{Deserialize, Deserializer, Serializer, de};

    const UNLIMITED: &str = "unlimited";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Credits(f64),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(limit) => serializer.serialize_f64(*limit),
            None => serializer.serialize_str(UNLIMITED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Credits(limit) => Ok(Some(limit)),
            Repr::Word(word) if word.trim().eq_ignore_ascii_case(UNLIMITED) => Ok(None),
            Repr::Word(word) => Err(de::Error::custom(format!(
                "expected a number or \"{UNLIMITED}\", got \"{word}\""
            ))),
        }
    }
}

fn default_credits_per_reply() -> f64 {
    0.2
}
fn default_monthly_limit() -> Option<f64> {
    Some(100.0)
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            credits_per_reply: default_credits_per_reply(),
            default_monthly_limit: default_monthly_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Single words that signal a scheduling request
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Multi-word phrases that signal a scheduling request
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,

    /// How many earlier messages are also inspected
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_keywords() -> Vec<String> {
    [
        "meeting",
        "meet",
        "call",
        "schedule",
        "reschedule",
        "availability",
        "available",
        "calendar",
        "demo",
        "appointment",
        "book",
        "slot",
        "tomorrow",
        "today",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_phrases() -> Vec<String> {
    [
        "next week",
        "this week",
        "free time",
        "set up a time",
        "find a time",
        "when are you free",
        "hop on",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_recent_window() -> usize {
    3
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            phrases: default_phrases(),
            recent_window: default_recent_window(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub api_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: default_embedding_url(),
            model: default_embedding_model(),
            api_key: None,
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. Relative paths resolve against the config dir.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("dealdesk.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.dealdesk/config.toml).
    ///
    /// Environment overrides:
    /// - `DEALDESK_API_KEY` then `OPENAI_API_KEY` (embedding key, if unset in file)
    /// - `DEALDESK_EMBEDDING_MODEL`
    /// - `DEALDESK_DATABASE`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.embedding.api_key.is_none() {
            self.embedding.api_key =
                lookup("DEALDESK_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("DEALDESK_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(database) = lookup("DEALDESK_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dealdesk")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// SQLite path with relative paths resolved against the config dir.
    pub fn database_path(&self) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            Self::config_dir().join(&self.storage.database)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, search) in [
            ("success_examples", &self.retrieval.success_examples),
            ("failure_examples", &self.retrieval.failure_examples),
            ("knowledge", &self.retrieval.knowledge),
        ] {
            if !(-1.0..=1.0).contains(&search.threshold) {
                return Err(ConfigError::ValidationError(format!(
                    "retrieval.{name}.threshold must be between -1.0 and 1.0"
                )));
            }
        }

        let start = self.availability.day_start_minute()?;
        let end = self.availability.day_end_minute()?;
        if start >= end {
            return Err(ConfigError::ValidationError(
                "availability.day_start must be before day_end".into(),
            ));
        }
        if self.availability.min_slot_minutes == 0 || self.availability.granularity_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "availability slot durations must be > 0".into(),
            ));
        }
        if self.availability.window_days == 0 {
            return Err(ConfigError::ValidationError(
                "availability.window_days must be > 0".into(),
            ));
        }

        if !self.quota.credits_per_reply.is_finite() || self.quota.credits_per_reply < 0.0 {
            return Err(ConfigError::ValidationError(
                "quota.credits_per_reply must be a non-negative number".into(),
            ));
        }
        if let Some(limit) = self.quota.default_monthly_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(ConfigError::ValidationError(
                    "quota.default_monthly_limit must be a non-negative number".into(),
                ));
            }
        }

        Ok(())
    }

    /// Check if an embedding API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.embedding.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_retrieval_constants() {
        let config = AppConfig::default();
        assert_eq!(config.retrieval.success_examples.limit, 3);
        assert_eq!(config.retrieval.failure_examples.limit, 2);
        assert_eq!(config.retrieval.knowledge.threshold, 0.5);
        assert_eq!(config.retrieval.calendar_days_ahead, 7);
        assert_eq!(config.availability.day_start_minute().unwrap(), 480);
        assert_eq!(config.availability.day_end_minute().unwrap(), 1080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.quota.credits_per_reply, config.quota.credits_per_reply);
        assert_eq!(parsed.intent.keywords, config.intent.keywords);
    }

    #[test]
    fn unlimited_monthly_limit_survives_roundtrip() {
        let mut config = AppConfig::default();
        config.quota.default_monthly_limit = None;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains(r#"default_monthly_limit = "unlimited""#));

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.quota.default_monthly_limit, None);
    }

    #[test]
    fn monthly_limit_accepts_integer_and_rejects_other_words() {
        let parsed: AppConfig = toml::from_str("[quota]\ndefault_monthly_limit = 250\n").unwrap();
        assert_eq!(parsed.quota.default_monthly_limit, Some(250.0));

        let parsed: AppConfig =
            toml::from_str("[quota]\ndefault_monthly_limit = \"Unlimited\"\n").unwrap();
        assert_eq!(parsed.quota.default_monthly_limit, None);

        let parsed: AppConfig = toml::from_str("[quota]\ncredits_per_reply = 0.5\n").unwrap();
        assert_eq!(parsed.quota.default_monthly_limit, Some(100.0));

        assert!(toml::from_str::<AppConfig>("[quota]\ndefault_monthly_limit = \"lots\"\n").is_err());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[availability]
day_start = "09:00"

[retrieval.knowledge]
limit = 5
threshold = 0.6
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.availability.day_start_minute().unwrap(), 540);
        assert_eq!(config.availability.day_end, "18:00");
        assert_eq!(config.retrieval.knowledge.limit, 5);
        assert_eq!(config.retrieval.success_examples.limit, 3);
    }

    #[test]
    fn inverted_business_hours_rejected() {
        let mut config = AppConfig::default();
        config.availability.day_start = "19:00".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn negative_credits_rejected() {
        let mut config = AppConfig::default();
        config.quota.credits_per_reply = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[quota\ncredits_per_reply = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn hhmm_parsing() {
        assert_eq!(parse_hhmm("00:00").unwrap(), 0);
        assert_eq!(parse_hhmm("17:45").unwrap(), 1065);
        assert_eq!(parse_hhmm("24:00").unwrap(), 1440);
        assert!(parse_hhmm("24:30").is_err());
        assert!(parse_hhmm("9").is_err());
        assert!(parse_hhmm("09:60").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-openai"),
            ("DEALDESK_EMBEDDING_MODEL", "text-embedding-3-large"),
            ("DEALDESK_DATABASE", "/var/lib/dealdesk.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/dealdesk.db"));
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.embedding.api_key = Some("from-file".into());
        config.apply_env(|k| (k == "DEALDESK_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.embedding.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.embedding.api_key = Some("sk-secret-value".into());
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-secret-value"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("credits_per_reply"));
        assert!(toml_str.contains("08:00"));
    }
}
