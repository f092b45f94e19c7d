//! Question answering over the knowledge base
//!
//! `Assistant` sequences rewrite → retrieve → generate and always produces a `ChatResponse`,
//! whatever fails along the way.

mod assistant;
mod generator;
mod rewriter;

pub use assistant::{Assistant, SAMPLE_QUESTIONS};
pub use generator::AnswerGenerator;
pub use rewriter::{QuestionRewriter, Rewrite};

use crate::llm::LlmError;
use crate::retrieval::RetrievalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Answer given when retrieval finds nothing relevant
pub const FALLBACK_ANSWER: &str = "I couldn't find relevant information to answer your question. \
Could you try rephrasing it or asking about Scrimba's features, courses, or technical requirements?";

/// Answer given alongside any error
pub const ERROR_ANSWER: &str =
    "Sorry, I encountered an error processing your question. Please try again.";

/// Message for empty or non-string questions
pub const INVALID_QUESTION: &str = "Invalid question provided";

/// Failure classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ProviderUnavailable,
    IndexNotReady,
    GenerationFailure,
}

/// Errors raised inside the pipeline, before they are folded into a response
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid question provided")]
    InvalidInput,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Answer generation failed: {0}")]
    Generation(#[source] LlmError),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput => ErrorKind::InvalidInput,
            Self::Retrieval(RetrievalError::IndexNotReady | RetrievalError::Corpus { .. }) => {
                ErrorKind::IndexNotReady
            }
            Self::Retrieval(RetrievalError::Embedding(_) | RetrievalError::Index(_)) => {
                ErrorKind::ProviderUnavailable
            }
            Self::Generation(LlmError::Unavailable(_) | LlmError::Timeout(_)) => {
                ErrorKind::ProviderUnavailable
            }
            Self::Generation(_) => ErrorKind::GenerationFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// Number of chunks used as context; 0 for the no-results fallback
    pub sources: usize,
    pub standalone_question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// User-facing apology
    pub answer: String,
    pub standalone_question: String,
}

/// Outcome of one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatResponse {
    Answered(ChatAnswer),
    Failed(ChatFailure),
}

impl ChatResponse {
    pub(crate) fn failed(error: &ChatError, standalone_question: impl Into<String>) -> Self {
        Self::Failed(ChatFailure {
            kind: error.kind(),
            message: error.to_string(),
            answer: ERROR_ANSWER.to_string(),
            standalone_question: standalone_question.into(),
        })
    }

    pub fn answer(&self) -> &str {
        match self {
            Self::Answered(a) => &a.answer,
            Self::Failed(f) => &f.answer,
        }
    }

    pub fn sources(&self) -> usize {
        match self {
            Self::Answered(a) => a.sources,
            Self::Failed(_) => 0,
        }
    }

    pub fn standalone_question(&self) -> &str {
        match self {
            Self::Answered(a) => &a.standalone_question,
            Self::Failed(f) => &f.standalone_question,
        }
    }

    /// Error message, if the question failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Answered(_) => None,
            Self::Failed(f) => Some(&f.message),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Answered(_) => None,
            Self::Failed(f) => Some(f.kind),
        }
    }

    /// Flat shape rendered by the chat widget
    pub fn to_wire(&self) -> WireResponse {
        WireResponse {
            answer: self.answer().to_string(),
            sources: self.sources(),
            standalone_question: self.standalone_question().to_string(),
            error: self.error().map(str::to_string),
        }
    }
}

/// `{ answer, sources, standaloneQuestion, error? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    pub answer: String,
    pub sources: usize,
    pub standalone_question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Incoming question as sent by a client; anything but a string is invalid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<Value>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: Some(Value::String(question.into())),
        }
    }

    pub fn question_text(&self) -> Option<&str> {
        self.question.as_ref().and_then(Value::as_str)
    }
}

/// Service status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatus {
    pub model_identifier: String,
    pub chains_ready: bool,
    pub timestamp: String,
}
