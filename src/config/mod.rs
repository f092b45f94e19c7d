//! Configuration management for coursebot
//!
//! Configuration is a single TOML file. Every key has a default that mirrors the
//! production chatbot, and a handful of keys can be overridden from the environment.

use crate::chunking::ChunkerConfig;
use crate::error::{CoursebotError, Result};
use crate::llm::{ANSWER_TEMPLATE, STANDALONE_QUESTION_TEMPLATE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Prefix for environment overrides: `COURSEBOT_SECTION__KEY=value`
const ENV_PREFIX: &str = "COURSEBOT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusConfig,
    pub chunking: ChunkerConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub prompts: PromptsConfig,
    pub server: ServerConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Knowledge source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: String, // "local" or "openai"
    pub model: String,
    pub batch_size: usize,
    /// Required for hosted models whose dimension is not built in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            batch_size: 32,
            dimension: None,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout: "60s".to_string(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    /// Environment variable that, when set, replaces `base_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url_env: Option<String>,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            base_url_env: Some("OPENROUTER_BASEURL".to_string()),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "x-ai/grok-4-fast:free".to_string(),
            temperature: 0.0,
            timeout: "60s".to_string(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

/// Prompt templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    pub standalone_question: String,
    pub answer: String,
}

/// HTTP bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory served at `/` next to the API, typically holding the chat widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoursebotError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoursebotError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    /// Env overrides and validation apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'coursebot config init' to create one."
        );
        Self::default_with_overrides(std::env::vars())
    }

    /// Defaults with `COURSEBOT_SECTION__KEY` overrides applied, then validated
    pub fn default_with_overrides<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        config.apply_overrides(vars);
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CoursebotError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `COURSEBOT_SECTION__KEY=value` pairs, ignoring everything else
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        let invalid = |message: String| CoursebotError::InvalidConfigValue {
            path: path.to_string(),
            message,
        };

        match path {
            "CORPUS__PATH" => self.corpus.path = PathBuf::from(value),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            "LLM__TEMPERATURE" => {
                self.llm.temperature = value
                    .parse()
                    .map_err(|_| invalid(format!("Cannot parse '{}' as number", value)))?;
            }
            "EMBEDDING__PROVIDER" => self.embedding.provider = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "RETRIEVAL__TOP_K" => {
                self.retrieval.top_k = value
                    .parse()
                    .map_err(|_| invalid(format!("Cannot parse '{}' as integer", value)))?;
            }
            "SERVER__BIND" => self.server.bind = value.to_string(),
            "SERVER__STATIC_DIR" => self.server.static_dir = Some(PathBuf::from(value)),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CoursebotError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("coursebot").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            corpus: CorpusConfig {
                path: PathBuf::from("scrimba-info.txt"),
            },
            chunking: ChunkerConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig { top_k: 4 },
            prompts: PromptsConfig {
                standalone_question: STANDALONE_QUESTION_TEMPLATE.to_string(),
                answer: ANSWER_TEMPLATE.to_string(),
            },
            server: ServerConfig {
                bind: "127.0.0.1:3001".to_string(),
                static_dir: None,
            },
        }
    }
}

/// Parse duration strings like "500ms", "30s", "2m", "1h". Bare numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || CoursebotError::Config(format!("Invalid duration format: {}", s));

    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = number.parse().map_err(|_| invalid())?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(invalid()),
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| CoursebotError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| CoursebotError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 6;
        config.chunking.chunk_size = 800;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 6);
        assert_eq!(loaded.chunking.chunk_size, 800);
        assert_eq!(loaded.chunking.separators, config.chunking.separators);
        assert_eq!(loaded.prompts.answer, ANSWER_TEMPLATE);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/coursebot.toml")).unwrap_err();
        assert!(matches!(err, CoursebotError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        config.save(&path).unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(CoursebotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vec![
            ("COURSEBOT_LLM__MODEL".to_string(), "gpt-4o-mini".to_string()),
            ("COURSEBOT_RETRIEVAL__TOP_K".to_string(), "8".to_string()),
            ("COURSEBOT_RETRIEVAL__TOP_K".to_string(), "many".to_string()),
            ("COURSEBOT_CORPUS__PATH".to_string(), "/srv/faq.txt".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.corpus.path, PathBuf::from("/srv/faq.txt"));
    }

    #[test]
    fn test_defaults_with_overrides_are_validated() {
        let config = Config::default_with_overrides(vec![(
            "COURSEBOT_RETRIEVAL__TOP_K".to_string(),
            "6".to_string(),
        )])
        .unwrap();
        assert_eq!(config.retrieval.top_k, 6);

        let err = Config::default_with_overrides(vec![(
            "COURSEBOT_RETRIEVAL__TOP_K".to_string(),
            "0".to_string(),
        )])
        .unwrap_err();
        match err {
            CoursebotError::ConfigValidation { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "retrieval.top_k");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_or_default_reads_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.chunking.chunk_size = 300;
        config.save(&path).unwrap();

        assert_eq!(Config::load_or_default(&path).unwrap().chunking.chunk_size, 300);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("").is_err());
    }
}
