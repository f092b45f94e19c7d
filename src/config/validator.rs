use crate::config::{parse_duration, Config};
use crate::error::{CoursebotError, Result, ValidationError};
use crate::llm::PromptTemplate;
use std::net::SocketAddr;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_prompts(config, &mut errors);
        Self::validate_server(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoursebotError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked when the index is built; the file may be mounted later.
        if config.corpus.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.path",
                "Corpus path cannot be empty",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if let Err(e) = config.chunking.validate() {
            errors.push(ValidationError::new("chunking", e.to_string()));
        }

        if config.chunking.separators.is_empty() {
            errors.push(ValidationError::new(
                "chunking.separators",
                "At least one separator is required",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.embedding.provider;
        if provider != "local" && provider != "openai" {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!("Provider must be 'local' or 'openai', got '{}'", provider),
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.dimension == Some(0) {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        Self::validate_timeout("embedding.timeout", &config.embedding.timeout, errors);
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        let url = &config.llm.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ValidationError::new(
                "llm.base_url",
                format!("Base URL must start with http:// or https://, got '{}'", url),
            ));
        }

        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        Self::validate_timeout("llm.timeout", &config.llm.timeout, errors);
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }
    }

    fn validate_prompts(config: &Config, errors: &mut Vec<ValidationError>) {
        let checks = [
            (
                "prompts.standalone_question",
                &config.prompts.standalone_question,
                &["question"][..],
            ),
            (
                "prompts.answer",
                &config.prompts.answer,
                &["context", "question"][..],
            ),
        ];

        for (path, template, required) in checks {
            if let Err(e) = PromptTemplate::new(template.as_str()).require(required) {
                errors.push(ValidationError::new(path, e.to_string()));
            }
        }
    }

    fn validate_server(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "server.bind",
                format!("Invalid socket address: {}", config.server.bind),
            ));
        }

        if let Some(dir) = &config.server.static_dir {
            if dir.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "server.static_dir",
                    "Static directory cannot be empty; omit the key to disable",
                ));
            }
        }
    }

    fn validate_timeout(path: &str, value: &str, errors: &mut Vec<ValidationError>) {
        match parse_duration(value) {
            Ok(d) if d.is_zero() => {
                errors.push(ValidationError::new(path, "Timeout must be greater than 0"));
            }
            Ok(_) => {}
            Err(_) => {
                errors.push(ValidationError::new(
                    path,
                    format!("Invalid duration format: {}", value),
                ));
            }
        }
    }
}
