//! Coursebot - Retrieval-Augmented Support Assistant
//!
//! Answers customer-support questions from a plain-text knowledge base. Each question is
//! rewritten into a standalone form, matched against embedded chunks of the corpus, and
//! answered by a chat model from the most similar chunks.

pub mod chat;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod server;

pub use error::{CoursebotError, Result};
