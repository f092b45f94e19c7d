//! Deterministic in-process backends shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use coursebot::chat::{AnswerGenerator, Assistant, QuestionRewriter};
use coursebot::chunking::{ChunkerConfig, TextSplitter};
use coursebot::embedding::{EmbeddingError, EmbeddingProvider};
use coursebot::llm::{ChatModel, LlmError, PromptTemplate, ANSWER_TEMPLATE, STANDALONE_QUESTION_TEMPLATE};
use coursebot::retrieval::{Corpus, KnowledgeBase, Retriever};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMENSION: usize = 8;

/// Three short paragraphs that split into exactly three chunks at size 40
pub const FAQ: &str = "Scrimba has a free plan to start.\n\n\
Pro members get course certificates.\n\n\
Courses run in any modern browser.";

/// Embeds text as letter counts folded into eight buckets
#[derive(Default)]
pub struct MockEmbedder {
    pub embed_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
    last_query: Mutex<Option<String>>,
}

impl MockEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every batch sleeps first, so concurrent first questions overlap the build
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst) + self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSION];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            let bucket = (c.to_ascii_lowercase() as u8 - b'a') as usize % DIMENSION;
            v[bucket] += 1.0;
        }
        v
    }

    fn check(&self) -> Result<(), EmbeddingError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(EmbeddingError::Unavailable("mock embedder is down".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(text.to_string());
        self.check()?;
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "mock-letters"
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// Chat model that answers from a closure and records every prompt
pub struct MockChat {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl MockChat {
    pub fn with<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    pub fn failing(error: fn() -> LlmError) -> Arc<Self> {
        Self::with(move |_| Err(error()))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

pub fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    TextSplitter::new(ChunkerConfig {
        chunk_size,
        chunk_overlap,
        ..ChunkerConfig::default()
    })
    .unwrap()
}

pub fn knowledge_base(corpus: Corpus, embedder: &Arc<MockEmbedder>) -> KnowledgeBase {
    KnowledgeBase::new(corpus, splitter(40, 0), embedder.clone(), 32)
}

/// Assistant over `corpus` with separate rewriter and generator models
pub fn assistant(
    corpus: Corpus,
    embedder: &Arc<MockEmbedder>,
    rewriter: &Arc<MockChat>,
    generator: &Arc<MockChat>,
) -> Assistant {
    let knowledge = knowledge_base(corpus, embedder);
    let retriever = Retriever::new(embedder.clone(), 4);
    let rewriter =
        QuestionRewriter::new(rewriter.clone(), PromptTemplate::new(STANDALONE_QUESTION_TEMPLATE))
            .unwrap();
    let generator =
        AnswerGenerator::new(generator.clone(), PromptTemplate::new(ANSWER_TEMPLATE)).unwrap();
    Assistant::new(knowledge, retriever, rewriter, generator)
}

pub fn faq() -> Corpus {
    Corpus::text("faq", FAQ)
}
