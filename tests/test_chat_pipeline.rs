//! End-to-end question answering against in-process backends

mod common;

use common::{assistant, faq, MockChat, MockEmbedder};
use coursebot::chat::{ChatRequest, ChatResponse, ErrorKind, ERROR_ANSWER, FALLBACK_ANSWER};
use coursebot::llm::LlmError;
use coursebot::retrieval::Corpus;
use std::time::Duration;
use tempfile::TempDir;

const STANDALONE: &str = "Does Scrimba offer a free plan?";

#[tokio::test]
async fn test_answers_from_every_retrieved_chunk() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes, there is a free plan.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("is it free?").await;

    assert!(!response.is_error());
    assert_eq!(response.answer(), "Yes, there is a free plan.");
    assert_eq!(response.sources(), 3);
    assert_eq!(response.standalone_question(), STANDALONE);
    assert_eq!(generator.calls(), 1);

    // All three chunks end up in the context, separated by blank lines
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Scrimba has a free plan to start."));
    assert!(prompt.contains("Pro members get course certificates."));
    assert!(prompt.contains("Courses run in any modern browser."));
}

#[tokio::test]
async fn test_retrieves_with_standalone_and_generates_with_original() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    bot.ask("and is it free?").await;

    assert_eq!(embedder.last_query().as_deref(), Some(STANDALONE));
    assert!(rewriter.prompts()[0].contains("and is it free?"));

    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Question: and is it free?"));
    assert!(!prompt.contains(STANDALONE));
}

#[tokio::test]
async fn test_invalid_questions_make_no_calls() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("unused");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let mut responses = vec![bot.ask("").await, bot.ask("   \n").await];
    for body in [r#"{"question": null}"#, r#"{"question": 7}"#, "{}"] {
        let request: ChatRequest = serde_json::from_str(body).unwrap();
        responses.push(bot.ask_request(&request).await);
    }

    for response in &responses {
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidInput));
        assert_eq!(response.sources(), 0);
        assert_eq!(response.answer(), ERROR_ANSWER);
        assert!(response.error().is_some());
    }

    assert_eq!(embedder.calls(), 0);
    assert_eq!(rewriter.calls(), 0);
    assert_eq!(generator.calls(), 0);
    assert!(!bot.knowledge_base().stats().initialized);
}

#[tokio::test]
async fn test_empty_corpus_skips_generation() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("should not be called");
    let bot = assistant(Corpus::text("empty", ""), &embedder, &rewriter, &generator);

    let response = bot.ask("Is there a free plan?").await;

    match &response {
        ChatResponse::Answered(answer) => {
            assert_eq!(answer.answer, FALLBACK_ANSWER);
            assert_eq!(answer.sources, 0);
            assert_eq!(answer.standalone_question, STANDALONE);
        }
        other => panic!("expected fallback answer, got {:?}", other),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_same_question_same_response() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes, there is a free plan.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let first = bot.ask("is it free?").await;
    let second = bot.ask("is it free?").await;

    assert_eq!(first, second);
    assert_eq!(bot.knowledge_base().stats().builds, 1);
}

#[tokio::test]
async fn test_rewriter_failure_falls_back_to_original() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::failing(|| LlmError::Unavailable("connection refused".to_string()));
    let generator = MockChat::replying("Courses run in the browser.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("What do I need to run courses?").await;

    assert!(!response.is_error());
    assert_eq!(response.standalone_question(), "What do I need to run courses?");
    assert_eq!(
        embedder.last_query().as_deref(),
        Some("What do I need to run courses?")
    );
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_blank_rewrite_falls_back_to_original() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying("  \n");
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("Certificates?").await;
    assert_eq!(response.standalone_question(), "Certificates?");
}

#[tokio::test]
async fn test_rewrite_is_used_verbatim() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(" Do Pro members get certificates?\n");
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("Certificates?").await;

    assert_eq!(
        response.standalone_question(),
        " Do Pro members get certificates?\n"
    );
    assert_eq!(
        embedder.last_query().as_deref(),
        Some(" Do Pro members get certificates?\n")
    );
}

#[tokio::test]
async fn test_generator_failure_is_an_error_response() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::failing(|| LlmError::Api {
        status: 429,
        message: "rate limited".to_string(),
    });
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("is it free?").await;

    assert_eq!(response.error_kind(), Some(ErrorKind::GenerationFailure));
    assert_eq!(response.sources(), 0);
    assert_eq!(response.answer(), ERROR_ANSWER);
    assert_eq!(response.standalone_question(), "is it free?");
    assert!(response.error().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_generator_timeout_is_provider_unavailable() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::failing(|| LlmError::Timeout(Duration::from_secs(60)));
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let response = bot.ask("is it free?").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::ProviderUnavailable));
}

#[tokio::test]
async fn test_embedding_outage_then_recovery() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    embedder.set_failing(true);
    let response = bot.ask("is it free?").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::ProviderUnavailable));
    assert_eq!(response.sources(), 0);
    assert_eq!(rewriter.calls(), 0);
    assert_eq!(generator.calls(), 0);
    assert!(!bot.knowledge_base().stats().initialized);

    // The failed build is retried by the next question
    embedder.set_failing(false);
    let response = bot.ask("is it free?").await;
    assert!(!response.is_error());
    assert_eq!(response.sources(), 3);
    assert_eq!(bot.knowledge_base().stats().builds, 2);
}

#[tokio::test]
async fn test_missing_corpus_is_index_not_ready() {
    let temp = TempDir::new().unwrap();
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(
        Corpus::file(temp.path().join("missing.txt")),
        &embedder,
        &rewriter,
        &generator,
    );

    let response = bot.ask("is it free?").await;

    assert_eq!(response.error_kind(), Some(ErrorKind::IndexNotReady));
    assert_eq!(response.standalone_question(), "is it free?");
    assert_eq!(embedder.calls(), 0);
    assert_eq!(rewriter.calls(), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_corpus_file_is_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("scrimba-info.txt");
    std::fs::write(&path, common::FAQ).unwrap();

    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(Corpus::file(&path), &embedder, &rewriter, &generator);

    assert_eq!(bot.ask("is it free?").await.sources(), 3);
}

#[tokio::test]
async fn test_concurrent_first_questions_build_once() {
    let embedder = MockEmbedder::slow(Duration::from_millis(50));
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let (a, b) = tokio::join!(bot.ask("is it free?"), bot.ask("certificates?"));

    assert_eq!(a.sources(), 3);
    assert_eq!(b.sources(), 3);
    assert_eq!(bot.knowledge_base().stats().builds, 1);
    assert_eq!(
        embedder
            .batch_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_ask_many_keeps_order_and_isolates_errors() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::with(|prompt| Ok(prompt.to_string()));
    let generator = MockChat::with(|prompt| {
        let question = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Question: "))
            .unwrap_or_default();
        Ok(format!("answer to {}", question))
    });
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let questions = vec![
        "first?".to_string(),
        String::new(),
        "third?".to_string(),
    ];
    let responses = bot.ask_many(&questions).await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].answer(), "answer to first?");
    assert_eq!(responses[1].error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(responses[2].answer(), "answer to third?");
}

#[tokio::test]
async fn test_status_has_no_side_effects() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let bot = assistant(faq(), &embedder, &rewriter, &generator);

    let status = bot.status();
    assert_eq!(status.model_identifier, "mock-chat");
    assert!(status.chains_ready);
    assert!(chrono::DateTime::parse_from_rfc3339(&status.timestamp).is_ok());

    assert_eq!(embedder.calls(), 0);
    assert_eq!(bot.knowledge_base().stats().builds, 0);
}

#[tokio::test]
async fn test_warm_up_and_reset() {
    let embedder = MockEmbedder::new();
    let rewriter = MockChat::replying(STANDALONE);
    let generator = MockChat::replying("Yes.");
    let mut bot = assistant(faq(), &embedder, &rewriter, &generator);

    bot.warm_up().await.unwrap();
    assert!(bot.knowledge_base().stats().initialized);
    assert_eq!(rewriter.calls(), 0);

    bot.reset();
    assert!(!bot.knowledge_base().stats().initialized);

    assert_eq!(bot.ask("is it free?").await.sources(), 3);
    assert_eq!(bot.knowledge_base().stats().builds, 2);
}
