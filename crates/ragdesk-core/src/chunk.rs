//! Line-packing text chunker.
//!
//! Splits document text into chunks of at most `max_chars` characters
//! without ever breaking a line. Lines are packed greedily in order; a
//! line that is longer than `max_chars` on its own becomes a chunk by
//! itself rather than being truncated.
//!
//! # Algorithm
//!
//! 1. Split the text on `\n`.
//! 2. Append each line (plus its `\n`) to a running buffer while the
//!    buffer length plus the line length stays below `max_chars`.
//! 3. Otherwise flush the buffer, trimmed of trailing whitespace, and
//!    start a new buffer with the line.
//! 4. Flush whatever non-blank buffer remains at the end.
//!
//! Lengths are counted in `char`s, not bytes.
//!
//! # Example
//!
//! ```rust
//! use ragdesk_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("first line\nsecond line", 500);
//! assert_eq!(chunks, vec!["first line\nsecond line".to_string()]);
//! ```

use crate::models::Chunk;

/// Default chunk size used by the vector store.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Split `text` into line-aligned chunks of at most `max_chars` characters.
///
/// # Guarantees
///
/// - Empty (or whitespace-only) input yields no chunks.
/// - No chunk boundary falls inside a line.
/// - Every chunk is at most `max_chars` long, except a chunk made of a
///   single line that alone exceeds the limit.
/// - No chunk is empty.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in text.split('\n') {
        let line_chars = line.chars().count();

        if current_chars + line_chars >= max_chars {
            flush(&mut chunks, &current);
            current.clear();
            current_chars = 0;
        }

        current.push_str(line);
        current.push('\n');
        current_chars += line_chars + 1;
    }

    flush(&mut chunks, &current);
    chunks
}

/// Chunk a document and tag every piece with its source and position.
pub fn chunk_document(text: &str, source: &str, max_chars: usize) -> Vec<Chunk> {
    chunk_text(text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            text,
            source: source.to_string(),
            sequence_index: i,
        })
        .collect()
}

fn flush(chunks: &mut Vec<String>, buf: &str) {
    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
