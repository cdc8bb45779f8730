// ============================================================
// Layer 3 — Answer Domain Types
// ============================================================
// Extractive Q&A answers are SPANS of the passage, not
// generated text:
//
//   Question: "Where did Super Bowl 50 take place?"
//   Passage:  "... The game was played on February 7, 2016,
//              at Levi's Stadium in the San Francisco Bay Area
//              at Santa Clara, California. ..."
//   Answer:   characters [start_offset..end_offset) of the passage
//
// An AnswerSet is the ranked list an engine returns for one
// QueryRequest. Its constructor sorts by descending score, so
// every AnswerSet in the program satisfies
//   set[i].score >= set[i + 1].score
//
// Reference: Devlin et al. (2019) - BERT paper, §4.2 (SQuAD)

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A scored substring of a passage proposed as an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    /// The answer text, exactly as it appears in the passage
    pub text: String,

    /// Confidence — higher is better
    pub score: f32,

    /// Character offset of the first answer character
    pub start_offset: usize,

    /// Character offset one past the last answer character
    pub end_offset: usize,
}

impl AnswerCandidate {
    pub fn new(
        text:         impl Into<String>,
        score:        f32,
        start_offset: usize,
        end_offset:   usize,
    ) -> Self {
        Self {
            text: text.into(),
            score,
            start_offset,
            end_offset,
        }
    }

    fn span(&self) -> (usize, usize) {
        (self.start_offset, self.end_offset)
    }
}

/// Ranked answers for one query, best first.
///
/// Empty is a valid outcome ("no answer"), not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnswerSet {
    candidates: Vec<AnswerCandidate>,
}

impl AnswerSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rank `candidates` by descending score, keep the best
    /// candidate for each distinct span, and cut to `limit`.
    pub fn ranked(mut candidates: Vec<AnswerCandidate>, limit: usize) -> Self {
        candidates.sort_by(|a, b| descending(a.score, b.score));

        let mut kept: Vec<AnswerCandidate> = Vec::with_capacity(limit.min(candidates.len()));
        for candidate in candidates {
            if kept.len() == limit {
                break;
            }
            if kept.iter().any(|k| k.span() == candidate.span()) {
                continue;
            }
            kept.push(candidate);
        }

        Self { candidates: kept }
    }

    /// The answer used for presentation.
    pub fn top(&self) -> Option<&AnswerCandidate> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnswerCandidate> {
        self.candidates.iter()
    }

    pub fn into_vec(self) -> Vec<AnswerCandidate> {
        self.candidates
    }
}

impl<'a> IntoIterator for &'a AnswerSet {
    type Item     = &'a AnswerCandidate;
    type IntoIter = std::slice::Iter<'a, AnswerCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

// NaN scores sink to the bottom instead of poisoning the sort.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true)   => Ordering::Equal,
        (true, false)  => Ordering::Greater,
        (false, true)  => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// One question over one passage, built per user action.
///
/// The passage is carried by value (shared, not borrowed), so a
/// request outlives whatever view created it.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub passage_content: Arc<str>,
    pub question_text:   String,
}

impl QueryRequest {
    pub fn new(passage_content: Arc<str>, question_text: impl Into<String>) -> Self {
        Self {
            passage_content,
            question_text: question_text.into(),
        }
    }
}

/// Byte range of the passage to emphasise for a presented answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end:   usize,
}

impl Highlight {
    /// First occurrence of `answer` in `content`, searching forward
    /// from the beginning. `None` when the text does not occur
    /// verbatim (the model may return a normalised span).
    pub fn locate(content: &str, answer: &str) -> Option<Self> {
        if answer.is_empty() {
            return None;
        }
        content.find(answer).map(|start| Self {
            start,
            end: start + answer.len(),
        })
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}
