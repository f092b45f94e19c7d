//! Chat-completion models and prompt plumbing

mod openai;
mod prompt;

pub use openai::OpenAiChatModel;
pub use prompt::{PromptTemplate, ANSWER_TEMPLATE, STANDALONE_QUESTION_TEMPLATE};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Chat backend unavailable: {0}")]
    Unavailable(String),

    #[error("Chat request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Chat backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid chat response: {0}")]
    InvalidResponse(String),

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Prompt template error: {0}")]
    Template(String),
}

/// A language model that turns one prompt into one completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}
