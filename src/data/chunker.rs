// ============================================================
// Layer 4 — Token Window Chunker
// ============================================================
// Splits a run of context tokens into overlapping windows
// that each fit the model's sequence length.
//
// Example with window=5, overlap=2 over 10 tokens:
//   Window 1:  0..5
//   Window 2:  3..8
//   Window 3:  6..10   (last window, shorter)
//
// stride = window - overlap
//
// Reference: Devlin et al. (2019) BERT paper - sliding window approach

use std::ops::Range;

pub struct Chunker {
    /// Maximum number of tokens per window
    window: usize,
    /// Number of tokens shared between adjacent windows
    overlap: usize,
}

impl Chunker {
    /// Create a new Chunker.
    ///
    /// # Panics
    /// Panics if overlap >= window, because the stride would be zero.
    pub fn new(window: usize, overlap: usize) -> Self {
        assert!(
            overlap < window,
            "overlap ({}) must be less than window ({})",
            overlap,
            window
        );
        Self { window, overlap }
    }

    /// Token index ranges covering `0..token_count`, in order.
    pub fn windows(&self, token_count: usize) -> Vec<Range<usize>> {
        if token_count == 0 {
            return Vec::new();
        }

        let stride = self.window - self.overlap;
        let mut windows = Vec::with_capacity(self.num_windows(token_count));
        let mut start   = 0usize;

        loop {
            let end = (start + self.window).min(token_count);
            windows.push(start..end);
            if end == token_count {
                break;
            }
            start += stride;
        }

        windows
    }

    /// How many windows `windows(token_count)` produces.
    pub fn num_windows(&self, token_count: usize) -> usize {
        if token_count <= self.window {
            return usize::from(token_count > 0);
        }
        let stride = self.window - self.overlap;
        1 + (token_count - self.window).div_ceil(stride)
    }
}
