//! Recursive text chunker.
//!
//! Splits on a prioritized separator ladder (paragraph, line, sentence,
//! word), merges undersized pieces greedily, then applies overlap by
//! extending each chunk's start back into the tail of its predecessor.
//! Sizes are measured in whitespace tokens. Identical input and parameters
//! always produce identical boundaries.

use crate::core::config::ChunkingSettings;
use crate::core::errors::RagError;

use super::document::{Chunk, Document};

/// Separator ladder, most to least structural. Word-level splitting always
/// terminates under the token measure, so no finer fallback is needed.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `chunk_size` and `overlap` are token counts; `overlap` must be
    /// strictly smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self, RagError> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    /// Split a document into overlapping chunks.
    ///
    /// An empty document yields no chunks; a non-empty document shorter than
    /// `chunk_size` yields exactly one.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.raw_text.as_str();
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_range(text, 0, text.len(), 0, &mut pieces);

        let merged = self.merge_pieces(text, &pieces);
        let ranges = self.apply_overlap(text, merged);

        ranges
            .into_iter()
            .enumerate()
            .map(|(idx, (start, end))| {
                let chunk_text = &text[start..end];
                Chunk {
                    // Deterministic ids keep re-indexing reproducible.
                    id: format!("{}#{:04}", document.id, idx),
                    document_id: document.id.clone(),
                    text: chunk_text.to_string(),
                    start_offset: start,
                    end_offset: end,
                    token_count: token_len(chunk_text),
                }
            })
            .collect()
    }

    /// Recursively split `text[start..end]` until every piece fits.
    ///
    /// Separators stay attached to the preceding piece so the pieces tile
    /// the input exactly and offsets stay contiguous.
    fn split_range(
        &self,
        text: &str,
        start: usize,
        end: usize,
        sep_idx: usize,
        out: &mut Vec<(usize, usize)>,
    ) {
        if token_len(&text[start..end]) <= self.chunk_size {
            out.push((start, end));
            return;
        }

        if sep_idx >= SEPARATORS.len() {
            // A whitespace-free run is a single token; nothing left to split.
            out.push((start, end));
            return;
        }

        let sep = SEPARATORS[sep_idx];
        let mut parts = Vec::new();
        let mut cursor = start;
        while let Some(rel) = text[cursor..end].find(sep) {
            let sep_end = cursor + rel + sep.len();
            parts.push((cursor, sep_end));
            cursor = sep_end;
        }
        if cursor < end {
            parts.push((cursor, end));
        }

        if parts.len() <= 1 {
            // Separator absent in this range; try the next one down.
            self.split_range(text, start, end, sep_idx + 1, out);
            return;
        }

        for (s, e) in parts {
            if token_len(&text[s..e]) <= self.chunk_size {
                out.push((s, e));
            } else {
                self.split_range(text, s, e, sep_idx + 1, out);
            }
        }
    }

    /// Greedily merge adjacent pieces into windows of at most `chunk_size`
    /// tokens. Token counts are recomputed on the merged range rather than
    /// summed so boundary words are never double-counted.
    fn merge_pieces(&self, text: &str, pieces: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let mut merged: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for &(s, e) in pieces {
            current = match current {
                None => Some((s, e)),
                Some((cs, ce)) => {
                    if token_len(&text[cs..e]) <= self.chunk_size {
                        Some((cs, e))
                    } else {
                        merged.push((cs, ce));
                        Some((s, e))
                    }
                }
            };
        }
        if let Some(range) = current {
            merged.push(range);
        }
        merged
    }

    /// Extend each chunk's start back `overlap` tokens, never reaching the
    /// previous chunk's start.
    fn apply_overlap(&self, text: &str, ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
        if self.overlap == 0 || ranges.len() < 2 {
            return ranges;
        }

        let mut result = Vec::with_capacity(ranges.len());
        let mut prev_start = 0;
        for (idx, (start, end)) in ranges.into_iter().enumerate() {
            if idx == 0 {
                prev_start = start;
                result.push((start, end));
                continue;
            }
            let new_start = back_up_tokens(text, start, self.overlap, prev_start);
            prev_start = start;
            result.push((new_start, end));
        }
        result
    }
}

fn token_len(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Byte offset of the start of the `n`-th-from-last word before `pos`,
/// clamped to stay strictly after `floor`.
fn back_up_tokens(text: &str, pos: usize, n: usize, floor: usize) -> usize {
    let slice = &text[floor..pos];
    let mut starts: Vec<usize> = Vec::new();
    let mut in_word = false;
    for (i, c) in slice.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(floor + i);
            in_word = true;
        }
    }
    if starts.is_empty() {
        return pos;
    }

    let mut idx = starts.len().saturating_sub(n);
    while idx < starts.len() && starts[idx] <= floor {
        idx += 1;
    }
    match starts.get(idx) {
        Some(&s) if s < pos => s,
        _ => pos,
    }
}
