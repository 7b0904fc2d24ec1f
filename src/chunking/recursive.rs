//! Recursive character chunking.
//!
//! Text is split on the first separator (in priority order) that occurs in it.
//! Pieces that fit the budget are greedily merged into chunks that keep a
//! tail of the previous chunk as overlap; pieces that are still too long are
//! split again with the remaining, finer separators.

use super::{Chunker, ChunkingConfig, TranscriptChunk};
use crate::error::{Result, VidqaError};
use std::collections::VecDeque;

/// Paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Splits text on a priority list of separators within a character budget.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a chunker with the default separators.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(VidqaError::Chunking("chunk size must be greater than 0".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(VidqaError::Chunking(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator priority list.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let (separator, finer) = pick_separator(text, separators);

        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                // Nothing left to split on.
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying overlap forward.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > size && !current.is_empty() {
                if let Some(chunk) = join_pieces(&current) {
                    chunks.push(chunk);
                }

                // Keep at most `overlap` characters, and make room for the next piece.
                while total > overlap || (total > 0 && total + len > size) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_pieces(&current) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<TranscriptChunk> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(order, content)| TranscriptChunk::new(content, order))
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First separator present in `text`, plus the finer separators after it.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    let none: &'a [String] = &[];

    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", none);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }

    let last = separators.last().map(String::as_str).unwrap_or("");
    (last, none)
}

/// Split on `separator`, attaching each separator to the piece after it.
/// Empty pieces are dropped; an empty separator splits into characters.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Concatenate pieces and trim; whitespace-only results are dropped.
fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
