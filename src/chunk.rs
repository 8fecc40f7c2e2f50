//! Deterministic bounded-size text chunker.
//!
//! Splits extracted document text into natural units (sentences or
//! paragraphs), then packs the units greedily into chunks of at most
//! `max_chars` characters. A unit that alone exceeds the bound is
//! hard-sliced into fixed-size windows so the bound holds for every input.
//! Output depends only on the arguments: no randomness, no locale, no
//! clock.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Unit-splitting strategy for [`chunk_text`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Units end at `.`, `?`, or `!`; merged units are glued with a space.
    #[default]
    Sentence,
    /// Units are non-blank lines; merged units are glued with a newline.
    Paragraph,
}

impl ChunkStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
        }
    }

    /// The glue character reinserted after each unit when packing.
    fn glue(&self) -> char {
        match self {
            Self::Sentence => ' ',
            Self::Paragraph => '\n',
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            other => bail!(
                "unknown chunk strategy: '{}'. Must be sentence or paragraph.",
                other
            ),
        }
    }
}

/// Splits `text` into trimmed, non-empty chunks of at most `max_chars`
/// characters each.
///
/// Chunk boundaries respect unit boundaries whenever a unit fits within
/// the bound; only an oversized single unit is cut mid-unit. Empty or
/// whitespace-only input yields an empty vector, never an empty chunk.
pub fn chunk_text(text: &str, strategy: ChunkStrategy, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let units: Vec<String> = match strategy {
        ChunkStrategy::Paragraph => text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        ChunkStrategy::Sentence => {
            // Without any terminal punctuation there are no sentence
            // boundaries to respect: fall back to fixed-size windows over
            // the raw text.
            if !text.chars().any(|c| matches!(c, '.' | '?' | '!')) {
                return slice_windows(text, max_chars);
            }
            split_sentences(text)
        }
    };

    let glue = strategy.glue();
    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for unit in units {
        let mut item = unit;
        item.push(glue);
        let item_len = item.chars().count();

        // An oversized unit is sliced, never dropped and never emitted
        // over the bound.
        if item_len > max_chars {
            if !buf.is_empty() {
                chunks.push(buf.trim().to_string());
                buf.clear();
                buf_len = 0;
            }
            chunks.extend(slice_windows(&item, max_chars));
            continue;
        }

        if buf_len + item_len <= max_chars {
            buf.push_str(&item);
            buf_len += item_len;
        } else {
            chunks.push(buf.trim().to_string());
            buf = item;
            buf_len = item_len;
        }
    }

    if !buf.is_empty() {
        chunks.push(buf.trim().to_string());
    }

    chunks
}

/// Greedy sentence scan: each terminal mark ends the sentence it follows.
/// Trailing text after the last terminal mark is kept as a final unit so
/// no content is lost.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '?' | '!') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Cuts `text` into consecutive windows of exactly `max_chars` characters
/// (the last may be shorter), trimming each and dropping any that end up
/// empty.
fn slice_windows(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|window| window.iter().collect::<String>().trim().to_string())
        .filter(|window| !window.is_empty())
        .collect()
}
