//! Recursive character text splitting
//!
//! The corpus is cut into pieces at the highest-priority separator present, recursing into
//! lower-priority separators for pieces that are still too long. Pieces keep their trailing
//! separator so they tile the source exactly, and are then merged greedily into chunks with a
//! character overlap carried over from the previous chunk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Splitter configuration, measured in characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Separators from highest to lowest priority. An empty string splits between characters.
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }
}

/// A bounded substring of the corpus used as a retrieval unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    /// Offset of the first character of `text` in the source, in characters
    pub source_offset: usize,
    pub metadata: BTreeMap<String, Value>,
}

impl DocumentChunk {
    /// Length of the chunk in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset one past the last character covered by this chunk
    pub fn end_offset(&self) -> usize {
        self.source_offset + self.char_len()
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &self.text[..idx]),
            None => self.text.clone(),
        }
    }
}

/// Recursive character splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkerConfig,
    separators: Vec<Vec<char>>,
}

impl TextSplitter {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        let separators = config
            .separators
            .iter()
            .map(|s| s.chars().collect())
            .collect();
        Ok(Self { config, separators })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into chunks. Metadata only carries the covered line range.
    pub fn split(&self, text: &str) -> Vec<DocumentChunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_range(&chars, 0, chars.len(), &self.separators, &mut pieces);

        let newlines: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '\n')
            .map(|(i, _)| i)
            .collect();

        self.merge(&pieces)
            .into_iter()
            .map(|(start, end)| {
                let mut metadata = BTreeMap::new();
                metadata.insert(
                    "lines".to_string(),
                    serde_json::json!({
                        "from": line_of(&newlines, start),
                        "to": line_of(&newlines, end - 1),
                    }),
                );
                DocumentChunk {
                    text: chars[start..end].iter().collect(),
                    source_offset: start,
                    metadata,
                }
            })
            .collect()
    }

    /// Split a named source, tagging every chunk with its origin
    pub fn create_documents(&self, text: &str, source: &str) -> Vec<DocumentChunk> {
        let mut chunks = self.split(text);
        for chunk in &mut chunks {
            chunk
                .metadata
                .insert("source".to_string(), Value::String(source.to_string()));
        }
        chunks
    }

    /// Cut `chars[start..end]` into pieces no longer than `chunk_size`, where possible.
    fn split_range(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        separators: &[Vec<char>],
        out: &mut Vec<(usize, usize)>,
    ) {
        if end - start <= self.config.chunk_size {
            out.push((start, end));
            return;
        }

        let segment = &chars[start..end];
        let Some(position) = separators
            .iter()
            .position(|sep| sep.is_empty() || find(segment, sep, 0).is_some())
        else {
            // No separator left to cut with: the segment is atomic.
            out.push((start, end));
            return;
        };

        let separator = &separators[position];
        let lower = &separators[position + 1..];

        if separator.is_empty() {
            out.extend((start..end).map(|i| (i, i + 1)));
            return;
        }

        let mut part_start = 0;
        let mut cursor = 0;
        while let Some(hit) = find(segment, separator, cursor) {
            let part_end = hit + separator.len();
            self.push_part(chars, start + part_start, start + part_end, lower, out);
            part_start = part_end;
            cursor = part_end;
        }
        if part_start < segment.len() {
            self.push_part(chars, start + part_start, end, lower, out);
        }
    }

    fn push_part(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        lower: &[Vec<char>],
        out: &mut Vec<(usize, usize)>,
    ) {
        if end - start <= self.config.chunk_size {
            out.push((start, end));
        } else {
            self.split_range(chars, start, end, lower, out);
        }
    }

    /// Merge contiguous pieces into chunk ranges with overlap
    fn merge(&self, pieces: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let size = self.config.chunk_size;
        let mut chunks = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for &(piece_start, piece_end) in pieces {
            current = match current {
                None => Some((piece_start, piece_end)),
                Some((start, _)) if piece_end - start <= size => Some((start, piece_end)),
                Some((start, end)) => {
                    chunks.push((start, end));
                    let piece_len = piece_end - piece_start;
                    let overlap = if piece_len >= size {
                        0
                    } else {
                        self.config
                            .chunk_overlap
                            .min(size - piece_len)
                            .min(end - start)
                    };
                    Some((piece_start - overlap, piece_end))
                }
            };
        }

        if let Some(last) = current {
            chunks.push(last);
        }
        chunks
    }
}

/// Find `needle` in `haystack` at or after `from`
fn find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

/// 1-based line number of a character offset
fn line_of(newlines: &[usize], offset: usize) -> usize {
    newlines.partition_point(|&n| n < offset) + 1
}
