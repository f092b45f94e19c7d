use crate::llm::{ChatModel, LlmError, PromptTemplate};
use std::sync::Arc;
use tracing::warn;

/// Result of rewriting a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The model produced a standalone question
    Standalone(String),
    /// The model failed; the original question stands in
    Fallback { original: String, reason: String },
}

impl Rewrite {
    pub fn question(&self) -> &str {
        match self {
            Self::Standalone(q) => q,
            Self::Fallback { original, .. } => original,
        }
    }

    pub fn into_question(self) -> String {
        match self {
            Self::Standalone(q) => q,
            Self::Fallback { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Turns a possibly context-dependent question into a standalone one
pub struct QuestionRewriter {
    model: Arc<dyn ChatModel>,
    template: PromptTemplate,
}

impl QuestionRewriter {
    pub fn new(model: Arc<dyn ChatModel>, template: PromptTemplate) -> Result<Self, LlmError> {
        template.require(&["question"])?;
        Ok(Self { model, template })
    }

    /// Never fails: a model error or blank completion yields `Rewrite::Fallback`.
    /// Any other completion is returned verbatim.
    pub async fn rewrite(&self, question: &str) -> Rewrite {
        let fallback = |reason: String| {
            warn!("Failed to convert to standalone question, using original: {}", reason);
            Rewrite::Fallback {
                original: question.to_string(),
                reason,
            }
        };

        let prompt = match self.template.render(&[("question", question)]) {
            Ok(prompt) => prompt,
            Err(e) => return fallback(e.to_string()),
        };

        match self.model.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => Rewrite::Standalone(text),
            Ok(_) => fallback("empty completion".to_string()),
            Err(e) => fallback(e.to_string()),
        }
    }
}
