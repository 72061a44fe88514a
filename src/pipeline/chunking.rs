//! Recursive character chunking.
//!
//! Each unit is split on the coarsest boundary that occurs in its text, in priority order:
//! paragraph break, line break, sentence end, whitespace, and finally single characters.
//! Pieces that still exceed the size budget are split again on the next finer boundary, while
//! pieces that fit are merged back together up to the budget. When a merge window is flushed,
//! its trailing pieces (at most `overlap` characters) are carried into the next chunk.
//!
//! Lengths are counted in `char`s so that multi-byte text never gets cut inside a code point.
//! The output is a pure function of the input text and parameters.

use super::types::{Chunk, ChunkingError, TextUnit};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Separator {
    Paragraph,
    Line,
    Sentence,
    Whitespace,
    Character,
}

const SEPARATORS: [Separator; 5] = [
    Separator::Paragraph,
    Separator::Line,
    Separator::Sentence,
    Separator::Whitespace,
    Separator::Character,
];

impl Separator {
    /// Text reinserted between two pieces that are merged back together.
    fn joiner(self) -> &'static str {
        match self {
            Self::Paragraph => "\n\n",
            Self::Line => "\n",
            Self::Sentence | Self::Whitespace => " ",
            Self::Character => "",
        }
    }

    fn occurs_in(self, text: &str) -> bool {
        match self {
            Self::Paragraph => text.contains("\n\n"),
            Self::Line => text.contains('\n'),
            Self::Sentence => sentence_pieces(text).len() > 1,
            Self::Whitespace => text.contains(char::is_whitespace),
            Self::Character => true,
        }
    }

    fn split(self, text: &str) -> Vec<&str> {
        let pieces: Vec<&str> = match self {
            Self::Paragraph => text.split("\n\n").collect(),
            Self::Line => text.split('\n').collect(),
            Self::Sentence => sentence_pieces(text),
            Self::Whitespace => text.split_whitespace().collect(),
            Self::Character => text
                .char_indices()
                .map(|(idx, ch)| &text[idx..idx + ch.len_utf8()])
                .collect(),
        };
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect()
    }
}

/// Split every unit into chunks, tagging each with its unit and per-unit sequence number.
///
/// Units with empty text contribute nothing; an empty unit list yields an empty result.
pub fn split_units(
    units: &[TextUnit],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    validate(chunk_size, overlap)?;

    let mut chunks = Vec::new();
    for (unit_index, unit) in units.iter().enumerate() {
        let source: Arc<str> = Arc::from(unit.source.as_str());
        let pieces = split_text(&unit.text, chunk_size, overlap);
        tracing::trace!(
            unit_index,
            source = %unit.source,
            chunks = pieces.len(),
            "Split text unit"
        );
        chunks.extend(
            pieces
                .into_iter()
                .enumerate()
                .map(|(sequence, text)| Chunk {
                    text,
                    unit_index,
                    source: Arc::clone(&source),
                    sequence,
                }),
        );
    }
    Ok(chunks)
}

/// Split a single text into chunks of at most `chunk_size` characters.
///
/// Callers must ensure `0 < chunk_size` and `overlap < chunk_size`; [`split_units`] checks this.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    split_recursive(trimmed, &SEPARATORS, chunk_size, overlap, &mut chunks);
    chunks
}

fn validate(chunk_size: usize, overlap: usize) -> Result<(), ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            overlap,
            chunk_size,
        });
    }
    Ok(())
}

fn split_recursive(
    text: &str,
    separators: &[Separator],
    chunk_size: usize,
    overlap: usize,
    out: &mut Vec<String>,
) {
    let (separator, finer) = match separators.iter().position(|sep| sep.occurs_in(text)) {
        Some(position) => (separators[position], &separators[position + 1..]),
        None => (Separator::Character, &[][..]),
    };

    let mut fitting: Vec<&str> = Vec::new();
    for piece in separator.split(text) {
        if char_len(piece) <= chunk_size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            merge_pieces(&fitting, separator.joiner(), chunk_size, overlap, out);
            fitting.clear();
        }
        split_recursive(piece, finer, chunk_size, overlap, out);
    }
    if !fitting.is_empty() {
        merge_pieces(&fitting, separator.joiner(), chunk_size, overlap, out);
    }
}

/// Greedily merge pieces into chunks no longer than `chunk_size`, carrying up to `overlap`
/// characters of trailing pieces into the following chunk.
fn merge_pieces(
    pieces: &[&str],
    joiner: &str,
    chunk_size: usize,
    overlap: usize,
    out: &mut Vec<String>,
) {
    let joiner_len = char_len(joiner);
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);
        if !window.is_empty() && total + len + joiner_len > chunk_size {
            out.push(join_window(&window, joiner));
            while let Some(&(_, first_len)) = window.front() {
                let would_overflow = total + len + joiner_len > chunk_size;
                if total <= overlap && !would_overflow {
                    break;
                }
                window.pop_front();
                total -= first_len + if window.is_empty() { 0 } else { joiner_len };
            }
        }
        if !window.is_empty() {
            total += joiner_len;
        }
        total += len;
        window.push_back((piece, len));
    }

    if !window.is_empty() {
        out.push(join_window(&window, joiner));
    }
}

fn join_window(window: &VecDeque<(&str, usize)>, joiner: &str) -> String {
    window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(joiner)
}

/// Split after `.`, `!` or `?` when followed by whitespace, keeping the punctuation.
fn sentence_pieces(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                pieces.push(&text[start..next_idx]);
                start = next_idx;
            }
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
