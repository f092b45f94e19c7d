//! Prompt templates with `{name}` placeholders

use super::LlmError;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Instruction used to turn a follow-up question into a standalone one
pub const STANDALONE_QUESTION_TEMPLATE: &str =
    "Given a question, convert it to a standalone question. question: {question} standalone question:";

/// Instruction used to answer from retrieved context
pub const ANSWER_TEMPLATE: &str = "Based on the following context about Scrimba, answer the user's question:\n\n\
Context: {context}\n\n\
Question: {question}\n\n\
Answer:";

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut variables: Vec<String> = Vec::new();
        for caps in placeholder().captures_iter(&template) {
            let name = caps[1].to_string();
            if !variables.contains(&name) {
                variables.push(name);
            }
        }
        Self {
            template,
            variables,
        }
    }

    /// Placeholder names in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Check that the template uses exactly `names`
    pub fn require(&self, names: &[&str]) -> Result<(), LlmError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !self.variables.iter().any(|v| v == n))
            .collect();
        if !missing.is_empty() {
            return Err(LlmError::Template(format!(
                "missing placeholder(s): {}",
                missing.join(", ")
            )));
        }

        let unknown: Vec<&str> = self
            .variables
            .iter()
            .map(String::as_str)
            .filter(|v| !names.contains(v))
            .collect();
        if !unknown.is_empty() {
            return Err(LlmError::Template(format!(
                "unknown placeholder(s): {}",
                unknown.join(", ")
            )));
        }
        Ok(())
    }

    /// Substitute every placeholder. Substituted text is not re-expanded.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, LlmError> {
        let lookup = |name: &str| values.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        if let Some(missing) = self.variables.iter().find(|v| lookup(v.as_str()).is_none()) {
            return Err(LlmError::Template(format!(
                "no value for placeholder {{{}}}",
                missing
            )));
        }

        let rendered = placeholder().replace_all(&self.template, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or(&caps[0]).to_string()
        });
        Ok(rendered.into_owned())
    }
}
