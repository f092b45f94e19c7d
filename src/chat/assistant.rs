use super::{
    AnswerGenerator, ChatAnswer, ChatError, ChatRequest, ChatResponse, ChatStatus,
    QuestionRewriter, FALLBACK_ANSWER,
};
use crate::chunking::TextSplitter;
use crate::config::{expand_path, Config};
use crate::embedding::{provider_from_config, SearchResult};
use crate::error::Result;
use crate::llm::{ChatModel, OpenAiChatModel, PromptTemplate};
use crate::retrieval::{Corpus, KnowledgeBase, RetrievalError, Retriever};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Questions asked by `coursebot ask` when none are given
pub const SAMPLE_QUESTIONS: [&str; 3] = [
    "What are the technical requirements for running Scrimba?",
    "How do I get started with Scrimba?",
    "What programming languages can I learn on Scrimba?",
];

/// Separator placed between retrieved chunks in the answer context
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Owns everything needed to answer a question
pub struct Assistant {
    knowledge: KnowledgeBase,
    retriever: Retriever,
    rewriter: QuestionRewriter,
    generator: AnswerGenerator,
}

impl Assistant {
    pub fn new(
        knowledge: KnowledgeBase,
        retriever: Retriever,
        rewriter: QuestionRewriter,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            knowledge,
            retriever,
            rewriter,
            generator,
        }
    }

    /// Wire up the local or hosted backends named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunking.clone())?;
        let provider = provider_from_config(&config.embedding)?;
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::from_config(&config.llm)?);

        let corpus = Corpus::file(expand_path(&config.corpus.path)?);
        let knowledge = KnowledgeBase::new(
            corpus,
            splitter,
            Arc::clone(&provider),
            config.embedding.batch_size,
        );
        let retriever = Retriever::new(provider, config.retrieval.top_k);
        let rewriter = QuestionRewriter::new(
            Arc::clone(&model),
            PromptTemplate::new(config.prompts.standalone_question.as_str()),
        )?;
        let generator =
            AnswerGenerator::new(model, PromptTemplate::new(config.prompts.answer.as_str()))?;

        info!(
            "Assistant configured: model={}, embeddings={}, corpus={}",
            generator.model_name(),
            config.embedding.model,
            knowledge.corpus()
        );

        Ok(Self::new(knowledge, retriever, rewriter, generator))
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Build the index now instead of on the first question
    pub async fn warm_up(&self) -> std::result::Result<(), RetrievalError> {
        self.knowledge.ensure_ready().await.map(|_| ())
    }

    /// Discard the built index; the next question rebuilds it
    pub fn reset(&mut self) {
        self.knowledge.reset();
    }

    /// Answer one question. Failures come back as `ChatResponse::Failed`.
    pub async fn ask(&self, question: &str) -> ChatResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("ask", request_id = %request_id);
        self.answer(question).instrument(span).await
    }

    /// Answer a request whose question may be missing or not a string
    pub async fn ask_request(&self, request: &ChatRequest) -> ChatResponse {
        match request.question_text() {
            Some(question) => self.ask(question).await,
            None => {
                debug!("Rejecting request without a string question");
                ChatResponse::failed(&ChatError::InvalidInput, "")
            }
        }
    }

    /// Answer questions one after another, keeping their order
    pub async fn ask_many(&self, questions: &[String]) -> Vec<ChatResponse> {
        let mut responses = Vec::with_capacity(questions.len());
        for question in questions {
            responses.push(self.ask(question).await);
        }
        responses
    }

    pub fn status(&self) -> ChatStatus {
        ChatStatus {
            model_identifier: self.generator.model_name().to_string(),
            chains_ready: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn answer(&self, question: &str) -> ChatResponse {
        if question.trim().is_empty() {
            debug!("Rejecting empty question");
            return ChatResponse::failed(&ChatError::InvalidInput, question);
        }

        let start = Instant::now();
        info!("Question: {}", question);

        match self.run(question).await {
            Ok(response) => {
                info!(
                    sources = response.sources(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Answered"
                );
                response
            }
            Err(e) => {
                error!(kind = ?e.kind(), "Error processing question: {}", e);
                ChatResponse::failed(&e, question)
            }
        }
    }

    async fn run(&self, question: &str) -> std::result::Result<ChatResponse, ChatError> {
        // No model is called until the index exists
        self.knowledge.ensure_ready().await?;

        debug!("state: rewriting");
        let standalone = self.rewriter.rewrite(question).await.into_question();
        debug!("Standalone question: {}", standalone);

        debug!("state: retrieving");
        let results = self.retriever.retrieve(&self.knowledge, &standalone).await?;

        if results.is_empty() {
            debug!("state: no results");
            return Ok(ChatResponse::Answered(ChatAnswer {
                answer: FALLBACK_ANSWER.to_string(),
                sources: 0,
                standalone_question: standalone,
            }));
        }

        debug!("state: generating from {} chunks", results.len());
        let context = join_context(&results);
        let answer = self
            .generator
            .generate(&context, question)
            .await
            .map_err(ChatError::Generation)?;

        debug!("state: done");
        Ok(ChatResponse::Answered(ChatAnswer {
            answer,
            sources: results.len(),
            standalone_question: standalone,
        }))
    }
}

fn join_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
