//! Recursive character chunking with sliding overlap.
//!
//! Documents are split into segments of at most [`CHUNK_SIZE`] characters
//! using `semchunk-rs`, which prefers paragraph, sentence, and word
//! boundaries before falling back to raw character cuts. Adjacent chunks
//! then receive a [`CHUNK_OVERLAP`]-character tail of their predecessor so
//! spans around boundaries stay visible to retrieval. Both passes count
//! `char`s, so the output is deterministic for a given input.

use semchunk_rs::Chunker;

/// Upper bound on the character count of a single chunk.
pub const CHUNK_SIZE: usize = 800;
/// Characters of the previous chunk replayed at the start of the next one.
pub const CHUNK_OVERLAP: usize = 120;

/// Split `text` into overlapping chunks using the service-wide budget.
///
/// Returns an empty vector when the input is all whitespace; the ingestion
/// pipeline treats that as a hard "no text extracted" failure.
pub fn chunk_text(text: &str) -> Vec<String> {
    chunk_text_with_budget(text, CHUNK_SIZE, CHUNK_OVERLAP)
}

/// Lower-level chunker with an explicit budget, used by tests.
fn chunk_text_with_budget(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunker = Chunker::new(chunk_size, Box::new(|segment: &str| segment.chars().count()));
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, chunk_size, overlap)
}

/// Prepend a character-limited tail of the previous chunk to each chunk.
///
/// The combined chunk is re-trimmed from the front so it never exceeds
/// `chunk_size` characters.
fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunks.is_empty() {
        return chunks;
    }

    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let mut previous = iter
        .next()
        .expect("chunks iterator yielded zero elements despite non-empty guard");
    overlapped.push(previous.clone());

    for current in iter {
        overlapped.push(build_overlapped_chunk(
            &previous,
            &current,
            effective_overlap,
            chunk_size,
        ));
        previous = current;
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
) -> String {
    let tail = tail_chars(previous, overlap);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_to_char_budget(&combined, chunk_size)
}

/// Last `limit` characters of `text`, with leading whitespace stripped.
fn tail_chars(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }

    let total = text.chars().count();
    if total <= limit {
        return text.trim_start();
    }

    let start = text
        .char_indices()
        .nth(total - limit)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].trim_start()
}

/// Drop characters from the front of `text` until it fits `budget`.
fn trim_to_char_budget(text: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }

    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }

    let start = text
        .char_indices()
        .nth(total - budget)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].trim_start().to_string()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars()
        .next_back()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}
