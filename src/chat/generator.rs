use crate::llm::{ChatModel, LlmError, PromptTemplate};
use std::sync::Arc;

/// Produces the final answer from retrieved context
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, template: PromptTemplate) -> Result<Self, LlmError> {
        template.require(&["context", "question"])?;
        Ok(Self { model, template })
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub async fn generate(&self, context: &str, question: &str) -> Result<String, LlmError> {
        let prompt = self
            .template
            .render(&[("context", context), ("question", question)])?;
        self.model.complete(&prompt).await
    }
}
