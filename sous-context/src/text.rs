//! Boundary-aware text splitting.
//!
//! [`TextSplitter`] segments text recursively: each delimiter pattern is tried
//! in order, coarsest first, and a segment that still exceeds the size bound
//! is re-split with the next, finer delimiter. The resulting segments are then
//! packed greedily into chunks no larger than `max_chunk_size`, carrying up to
//! `overlap` trailing characters from one chunk into the next so adjacent
//! chunks share context.
//!
//! # Example
//!
//! ```
//! use sous_context::{TextSplitter, RECIPE_DELIMITERS};
//!
//! let splitter = TextSplitter::new(RECIPE_DELIMITERS, 500, 50).unwrap();
//! let content = "Dish: Jollof Rice\n\nOrigin: Nigeria\n\nSteps:\n1. Cook rice\n2. Add tomato";
//! let chunks = splitter.split(content);
//!
//! assert!(!chunks.is_empty());
//! assert!(chunks.iter().all(|c| c.text.len() <= 500));
//! assert_eq!(chunks[0].sequence, 0);
//! ```

use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// Delimiter patterns for prose-like recipe text, ordered coarsest first:
/// paragraph breaks, line breaks, sentence ends, then single spaces.
pub const RECIPE_DELIMITERS: &[&str] = &[
    r"\n\n",    // Paragraphs
    r"\n",      // Line breaks
    r"[.!?] ",  // Sentence ends
    r" ",       // Spaces
];

/// Errors raised when constructing a [`TextSplitter`].
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("max_chunk_size must be positive")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be strictly less than max_chunk_size ({max_chunk_size})")]
    OverlapTooLarge { overlap: usize, max_chunk_size: usize },

    #[error("invalid delimiter pattern: {source}")]
    InvalidDelimiter {
        #[from]
        source: regex::Error,
    },
}

/// A single bounded segment of a larger text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TextChunk {
    /// The order of this chunk within the source text (0-indexed).
    pub sequence: usize,
    /// The text content of this chunk.
    pub text: String,
}

/// Splits text into size-bounded chunks along natural boundaries.
pub struct TextSplitter {
    delimiters: Vec<Regex>,
    max_chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter from delimiter patterns, a maximum chunk size in
    /// characters, and an overlap in characters.
    ///
    /// Fails if `max_chunk_size` is zero, `overlap >= max_chunk_size` (the
    /// split would not converge), or a pattern is not a valid regex.
    pub fn new(
        delimiter_patterns: &[&str],
        max_chunk_size: usize,
        overlap: usize,
    ) -> Result<Self, SplitError> {
        if max_chunk_size == 0 {
            return Err(SplitError::ZeroChunkSize);
        }
        if overlap >= max_chunk_size {
            return Err(SplitError::OverlapTooLarge {
                overlap,
                max_chunk_size,
            });
        }

        let delimiters = delimiter_patterns
            .iter()
            .map(|&pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TextSplitter {
            delimiters,
            max_chunk_size,
            overlap,
        })
    }

    /// Create a splitter with the default recipe delimiters.
    pub fn with_defaults(max_chunk_size: usize, overlap: usize) -> Result<Self, SplitError> {
        Self::new(RECIPE_DELIMITERS, max_chunk_size, overlap)
    }

    /// Split `text` into ordered chunks.
    ///
    /// Every chunk is at most `max_chunk_size` characters, except when a
    /// single run containing no delimiter exceeds the bound; such a run is
    /// passed through as one oversized chunk rather than cut mid-token.
    /// Splitting is deterministic.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let segments = self.split_recursively_into_segments(text, 0, 0);

        let mut chunks: Vec<TextChunk> = Vec::new();
        // Window of adjacent segment ranges forming the chunk under construction.
        let mut window: Vec<Range<usize>> = Vec::new();
        let mut window_len = 0usize;

        for segment in segments {
            let segment_len = segment.len();

            if window_len + segment_len > self.max_chunk_size && !window.is_empty() {
                chunks.push(TextChunk {
                    sequence: chunks.len(),
                    text: text[window[0].start..window[window.len() - 1].end].to_string(),
                });

                // Carry trailing segments into the next chunk, bounded by the
                // overlap and by what still fits alongside the new segment.
                let mut carried: Vec<Range<usize>> = Vec::new();
                let mut carried_len = 0usize;
                for range in window.iter().rev() {
                    let len = range.len();
                    if carried_len + len > self.overlap
                        || carried_len + len + segment_len > self.max_chunk_size
                    {
                        break;
                    }
                    carried_len += len;
                    carried.push(range.clone());
                }
                carried.reverse();
                window = carried;
                window_len = carried_len;
            }

            window_len += segment_len;
            window.push(segment);
        }

        if !window.is_empty() {
            chunks.push(TextChunk {
                sequence: chunks.len(),
                text: text[window[0].start..window[window.len() - 1].end].to_string(),
            });
        }

        chunks
    }

    // Recursively splits the text into byte ranges of the original input.
    // Segments tile the input in order: delimiter matches become their own
    // segments, and any stretch still larger than the bound is re-split with
    // the next, finer delimiter. When all delimiters are exhausted the stretch
    // is returned whole, oversized or not.
    fn split_recursively_into_segments(
        &self,
        text: &str,
        delimiter_idx: usize,
        current_offset: usize,
    ) -> Vec<Range<usize>> {
        let mut result_segments: Vec<Range<usize>> = Vec::new();

        if text.is_empty() {
            return result_segments;
        }

        if text.len() <= self.max_chunk_size || delimiter_idx >= self.delimiters.len() {
            result_segments.push(current_offset..(current_offset + text.len()));
            return result_segments;
        }

        let current_delimiter = &self.delimiters[delimiter_idx];
        let mut local_start = 0;

        for mat in current_delimiter.find_iter(text) {
            if mat.start() > local_start {
                result_segments.extend(self.split_recursively_into_segments(
                    &text[local_start..mat.start()],
                    delimiter_idx + 1,
                    current_offset + local_start,
                ));
            }
            result_segments.push(current_offset + mat.start()..current_offset + mat.end());
            local_start = mat.end();
        }

        if local_start < text.len() {
            result_segments.extend(self.split_recursively_into_segments(
                &text[local_start..],
                delimiter_idx + 1,
                current_offset + local_start,
            ));
        }

        result_segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text_single_chunk() {
        let splitter = TextSplitter::with_defaults(500, 50).unwrap();
        let content = "A very short recipe description.";

        let chunks = splitter.split(content);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[0].text, content);
    }

    #[test]
    fn test_split_empty_text() {
        let splitter = TextSplitter::with_defaults(500, 50).unwrap();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_split_respects_size_bound() {
        let splitter = TextSplitter::with_defaults(100, 20).unwrap();
        let content = (0..50).map(|_| "Stir the pot gently. ").collect::<String>();

        let chunks = splitter.split(&content);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.text.len() <= 100,
                "chunk of {} chars exceeds bound",
                chunk.text.len()
            );
        }
    }

    #[test]
    fn test_split_prefers_paragraph_boundaries() {
        let splitter = TextSplitter::with_defaults(60, 0).unwrap();
        let content = "First paragraph about onions.\n\nSecond paragraph about garlic.";

        let chunks = splitter.split(content);

        assert!(chunks.len() >= 2);
        assert!(chunks[0].text.contains("onions"));
        assert!(chunks.last().unwrap().text.contains("garlic"));
    }

    #[test]
    fn test_split_overlap_carries_trailing_text() {
        let splitter = TextSplitter::with_defaults(40, 15).unwrap();
        let content = "one two three four five six seven eight nine ten eleven twelve";

        let chunks = splitter.split(content);
        assert!(chunks.len() > 1);

        // Each chunk after the first should start with text already present
        // at the tail of its predecessor.
        for pair in chunks.windows(2) {
            let head: String = pair[1].text.chars().take(4).collect();
            assert!(
                pair[0].text.contains(head.trim()),
                "chunk {:?} does not overlap {:?}",
                pair[1].text,
                pair[0].text
            );
        }
    }

    #[test]
    fn test_split_unsplittable_run_passes_through() {
        let splitter = TextSplitter::with_defaults(10, 2).unwrap();
        let content = "supercalifragilisticexpialidocious";

        let chunks = splitter.split(content);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, content);
        assert!(chunks[0].text.len() > 10);
    }

    #[test]
    fn test_split_is_deterministic() {
        let splitter = TextSplitter::with_defaults(80, 10).unwrap();
        let content = "Chop the onions.\nFry until golden.\n\nAdd the tomatoes and simmer. \
                       Season to taste. Serve hot with rice.";

        let first = splitter.split(content);
        let second = splitter.split(content);

        assert_eq!(first, second);
    }

    #[test]
    fn test_new_rejects_overlap_not_less_than_size() {
        assert!(matches!(
            TextSplitter::with_defaults(100, 100),
            Err(SplitError::OverlapTooLarge { .. })
        ));
        assert!(matches!(
            TextSplitter::with_defaults(0, 0),
            Err(SplitError::ZeroChunkSize)
        ));
    }
}
