// ============================================================
// Layer 5 — Span Decoder
// ============================================================
// Reads the model's start/end probabilities for one feature
// and proposes answer spans:
//
//   score(s, e) = P_start(s) × P_end(e)
//   for context tokens s <= e < s + max_answer_len
//
// The best `top_k` spans become AnswerCandidates whose text is
// the passage substring between the span's character offsets.

use crate::domain::answer::AnswerCandidate;
use crate::ml::features::QaFeature;

pub struct SpanDecoder {
    max_answer_len: usize,
    top_k:          usize,
}

impl SpanDecoder {
    pub fn new(max_answer_len: usize, top_k: usize) -> Self {
        Self { max_answer_len, top_k }
    }

    /// Best spans of `feature`, highest score first.
    pub fn decode(
        &self,
        feature:     &QaFeature,
        start_probs: &[f32],
        end_probs:   &[f32],
        content:     &str,
    ) -> Vec<AnswerCandidate> {
        let base = feature.context_start;
        let len  = feature.context_len();
        if len == 0 || start_probs.len() < base + len || end_probs.len() < base + len {
            return Vec::new();
        }

        let mut spans: Vec<(f32, usize, usize)> = Vec::new();
        for s in 0..len {
            let p_start = start_probs[base + s];
            for e in s..(s + self.max_answer_len).min(len) {
                spans.push((p_start * end_probs[base + e], s, e));
            }
        }
        spans.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut out = Vec::with_capacity(self.top_k);
        for (score, s, e) in spans {
            if out.len() == self.top_k {
                break;
            }
            let start = feature.context_offsets[s].0;
            let end   = feature.context_offsets[e].1;
            if let Some(text) = char_slice(content, start, end) {
                tracing::trace!("span [{s},{e}] chars [{start},{end}) p={score:.6} '{text}'");
                out.push(AnswerCandidate::new(text, score, start, end));
            }
        }
        out
    }
}

/// `content[start..end]` in characters.
pub fn char_slice(content: &str, start: usize, end: usize) -> Option<&str> {
    if start >= end {
        return None;
    }
    let mut bounds = content
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(content.len()));
    let from = bounds.nth(start)?;
    let to   = bounds.nth(end - start - 1)?;
    Some(&content[from..to])
}
