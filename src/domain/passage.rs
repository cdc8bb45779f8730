// ============================================================
// Layer 3 — Passage Domain Type
// ============================================================
// A fixed block of text plus its title and the questions the
// dataset suggests for it. Created once when the dataset is
// loaded and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// One dataset entry: the text questions are asked over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Display title, e.g. "Super_Bowl_50"
    pub title: String,

    /// Full passage text; answers are substrings of this
    pub content: String,

    /// Suggested questions, in dataset order
    pub questions: Vec<String>,
}

impl Passage {
    pub fn new(
        title:     impl Into<String>,
        content:   impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            title:   title.into(),
            content: content.into(),
            questions,
        }
    }

    /// The question the equivalence check asks for this passage.
    pub fn first_question(&self) -> Option<&str> {
        self.questions.first().map(String::as_str)
    }
}
