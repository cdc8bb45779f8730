// ============================================================
// Layer 2 — Dual-Path Equivalence Check
// ============================================================
// Two independently written engines must agree on the TOP
// answer for identical input:
//
//   for entry in dataset[0 .. min(N, len)]:
//       q     = entry.questions[0]
//       left  = engine_a.answer(entry.content, q).top()
//       right = engine_b.answer(entry.content, q).top()
//       matched ⇔ left.text == right.text   (both present)
//
// An entry where either engine finds nothing is a mismatch.
// Entries with no questions are skipped. Engine errors abort
// the whole check; they are not a disagreement.
//
// The canonical scenario pins the expected answer for one
// well-known SQuAD passage and only holds with a pretrained
// SQuAD model.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::domain::answer::AnswerSet;
use crate::domain::traits::{AnswerEngine, DatasetProvider};

pub const DEFAULT_ENTRIES: usize = 3;

pub const CANONICAL_TITLE:    &str = "Super_Bowl_50";
pub const CANONICAL_QUESTION: &str = "Where did Super Bowl 50 take place?";
pub const CANONICAL_ANSWER:   &str =
    "Levi's Stadium in the San Francisco Bay Area at Santa Clara, California.";

/// One compared entry; also a row of the CSV report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryOutcome {
    pub index:        usize,
    pub title:        String,
    pub question:     String,
    pub left_answer:  Option<String>,
    pub right_answer: Option<String>,
    pub matched:      bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceReport {
    pub left:     &'static str,
    pub right:    &'static str,
    pub outcomes: Vec<EntryOutcome>,
    /// Indices with no question to ask
    pub skipped:  Vec<usize>,
}

impl EquivalenceReport {
    pub fn all_match(&self) -> bool {
        self.outcomes.iter().all(|o| o.matched)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| !o.matched)
    }
}

pub struct EquivalenceCheck {
    entries: usize,
}

impl Default for EquivalenceCheck {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRIES)
    }
}

impl EquivalenceCheck {
    pub fn new(entries: usize) -> Self {
        Self { entries }
    }

    /// Compare two loaded engines over the first entries of `dataset`.
    pub fn run(
        &self,
        left:    &dyn AnswerEngine,
        right:   &dyn AnswerEngine,
        dataset: &dyn DatasetProvider,
    ) -> Result<EquivalenceReport> {
        let count = self.entries.min(dataset.len());
        let mut outcomes = Vec::with_capacity(count);
        let mut skipped  = Vec::new();

        for index in 0..count {
            let passage = dataset.passage(index)?;
            let Some(question) = passage.first_question() else {
                tracing::warn!("Entry {index} '{}' has no questions; skipped", passage.title);
                skipped.push(index);
                continue;
            };

            let left_answer  = top_text(left, &passage.content, question, index)?;
            let right_answer = top_text(right, &passage.content, question, index)?;
            let matched = matches!((&left_answer, &right_answer), (Some(l), Some(r)) if l == r);

            if matched {
                tracing::info!("Entry {index} '{}': both engines answered {:?}", passage.title, left_answer);
            } else {
                tracing::warn!(
                    "Entry {index} '{}' MISMATCH: {}={:?} {}={:?}",
                    passage.title, left.name(), left_answer, right.name(), right_answer
                );
            }

            outcomes.push(EntryOutcome {
                index,
                title: passage.title.clone(),
                question: question.to_string(),
                left_answer,
                right_answer,
                matched,
            });
        }

        Ok(EquivalenceReport { left: left.name(), right: right.name(), outcomes, skipped })
    }

    /// Both engines must give the pinned Super Bowl 50 answer.
    pub fn canonical(
        left:    &dyn AnswerEngine,
        right:   &dyn AnswerEngine,
        dataset: &dyn DatasetProvider,
    ) -> Result<EntryOutcome> {
        let index = dataset
            .titles()
            .iter()
            .position(|t| *t == CANONICAL_TITLE)
            .ok_or_else(|| anyhow!("Dataset has no '{CANONICAL_TITLE}' entry"))?;
        let content = dataset.content(index)?;

        let left_answer  = top_text(left, content, CANONICAL_QUESTION, index)?;
        let right_answer = top_text(right, content, CANONICAL_QUESTION, index)?;
        let matched = left_answer.as_deref() == Some(CANONICAL_ANSWER)
            && right_answer.as_deref() == Some(CANONICAL_ANSWER);

        Ok(EntryOutcome {
            index,
            title: CANONICAL_TITLE.to_string(),
            question: CANONICAL_QUESTION.to_string(),
            left_answer,
            right_answer,
            matched,
        })
    }
}

fn top_text(
    engine:   &dyn AnswerEngine,
    content:  &str,
    question: &str,
    index:    usize,
) -> Result<Option<String>> {
    let set: AnswerSet = engine
        .answer(content, question)
        .with_context(|| format!("{} engine failed on entry {index}", engine.name()))?;
    Ok(set.top().map(|c| c.text.clone()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::JsonDataset;
    use crate::domain::answer::AnswerCandidate;
    use crate::domain::errors::EngineError;
    use crate::domain::passage::Passage;
    use crate::ml::EngineKind;
    use crate::infra::checkpoint::AnswerOptions;
    use crate::test_support::{fixture_model, imported_tiny_bert};
    use pretty_assertions::assert_eq;

    /// Echoes the question back, or gives a fixed reply.
    struct FixedEngine {
        name:  &'static str,
        reply: Result<Option<&'static str>, EngineError>,
    }

    impl FixedEngine {
        fn says(name: &'static str, text: &'static str) -> Self {
            Self { name, reply: Ok(Some(text)) }
        }
    }

    impl AnswerEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.name
        }
        fn load(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn unload(&mut self) {}
        fn is_loaded(&self) -> bool {
            true
        }
        fn answer(&self, _content: &str, question: &str) -> Result<AnswerSet, EngineError> {
            match &self.reply {
                Ok(Some("<echo>")) => Ok(AnswerSet::ranked(
                    vec![AnswerCandidate::new(question, 1.0, 0, 1)],
                    1,
                )),
                Ok(Some(text)) => Ok(AnswerSet::ranked(vec![AnswerCandidate::new(*text, 1.0, 0, 1)], 1)),
                Ok(None) => Ok(AnswerSet::empty()),
                Err(e) => Err(e.clone()),
            }
        }
    }

    fn dataset() -> JsonDataset {
        JsonDataset::from_passages(vec![
            Passage::new("A", "alpha", vec!["Q1?".into()]),
            Passage::new("B", "beta", vec![]),
            Passage::new("C", "gamma", vec!["Q3?".into(), "unused?".into()]),
            Passage::new("D", "delta", vec!["Q4?".into()]),
        ])
    }

    #[test]
    fn test_agreeing_engines_match_and_skip_entries_without_questions() {
        let left  = FixedEngine::says("left", "<echo>");
        let right = FixedEngine::says("right", "<echo>");
        let report = EquivalenceCheck::default().run(&left, &right, &dataset()).unwrap();

        assert!(report.all_match());
        assert_eq!(report.skipped, vec![1]);
        let asked: Vec<&str> = report.outcomes.iter().map(|o| o.question.as_str()).collect();
        assert_eq!(asked, vec!["Q1?", "Q3?"]);
        assert_eq!((report.left, report.right), ("left", "right"));
    }

    #[test]
    fn test_entry_count_is_capped_by_dataset() {
        let left  = FixedEngine::says("left", "<echo>");
        let right = FixedEngine::says("right", "<echo>");
        let report = EquivalenceCheck::new(50).run(&left, &right, &dataset()).unwrap();
        assert_eq!(report.outcomes.len(), 3);
    }

    #[test]
    fn test_different_answers_are_mismatches() {
        let left  = FixedEngine::says("left", "Denver Broncos");
        let right = FixedEngine::says("right", "Carolina Panthers");
        let report = EquivalenceCheck::new(1).run(&left, &right, &dataset()).unwrap();

        assert!(!report.all_match());
        let miss: Vec<&EntryOutcome> = report.mismatches().collect();
        assert_eq!(miss.len(), 1);
        assert_eq!(miss[0].left_answer.as_deref(), Some("Denver Broncos"));
        assert_eq!(miss[0].right_answer.as_deref(), Some("Carolina Panthers"));
    }

    #[test]
    fn test_empty_answers_are_mismatches() {
        let left  = FixedEngine { name: "left", reply: Ok(None) };
        let right = FixedEngine { name: "right", reply: Ok(None) };
        let report = EquivalenceCheck::new(1).run(&left, &right, &dataset()).unwrap();
        assert!(!report.all_match());
        assert_eq!(report.outcomes[0].left_answer, None);
    }

    #[test]
    fn test_engine_error_aborts_check() {
        let left  = FixedEngine::says("left", "<echo>");
        let right = FixedEngine { name: "right", reply: Err(EngineError::Inference("boom".into())) };
        let err = EquivalenceCheck::default().run(&left, &right, &dataset()).unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
    }

    #[test]
    fn test_canonical_needs_both_engines_on_the_pinned_answer() {
        let dataset = JsonDataset::bundled().unwrap();
        let good = FixedEngine::says("good", CANONICAL_ANSWER);
        let bad  = FixedEngine::says("bad", "Santa Clara");

        assert!(EquivalenceCheck::canonical(&good, &good, &dataset).unwrap().matched);
        let outcome = EquivalenceCheck::canonical(&good, &bad, &dataset).unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.title, CANONICAL_TITLE);
    }

    #[test]
    fn test_canonical_passage_contains_pinned_answer() {
        let dataset = JsonDataset::bundled().unwrap();
        let index = dataset.titles().iter().position(|t| *t == CANONICAL_TITLE).unwrap();
        assert!(dataset.content(index).unwrap().contains(CANONICAL_ANSWER));
        assert!(dataset.questions(index).unwrap().iter().any(|q| q == CANONICAL_QUESTION));
    }

    #[test]
    fn test_both_engines_agree_on_bundled_entries() {
        let fixture = fixture_model();
        let dataset = JsonDataset::bundled().unwrap();
        let mut interpreter = EngineKind::Interpreter.build(fixture.dir());
        let mut task        = EngineKind::Task.build(fixture.dir());
        interpreter.load().unwrap();
        task.load().unwrap();

        let report = EquivalenceCheck::default()
            .run(interpreter.as_ref(), task.as_ref(), &dataset)
            .unwrap();

        assert_eq!(report.outcomes.len(), DEFAULT_ENTRIES);
        for outcome in &report.outcomes {
            assert!(outcome.matched, "{outcome:?}");
        }
        interpreter.unload();
        task.unload();
    }

    #[test]
    fn test_check_reports_windowed_disagreement() {
        // Window of 5 context tokens, no overlap: the long passage
        // splits 0..5 | 5..7 and only the task engine sees 5..7.
        let long  = "one two three four five six seven";
        let short = "one two three";
        let options = AnswerOptions {
            max_query_len: 2,
            doc_overlap:   Some(0),
            ..AnswerOptions::default()
        };
        let fixture = imported_tiny_bert(long, options);
        assert_eq!(fixture.manifest.context_window(), 5);

        let dataset = JsonDataset::from_passages(vec![
            Passage::new("Short", short, vec!["one?".into()]),
            Passage::new("Long", long, vec!["one?".into()]),
        ]);
        let mut interpreter = EngineKind::Interpreter.build(fixture.dir());
        let mut task        = EngineKind::Task.build(fixture.dir());
        interpreter.load().unwrap();
        task.load().unwrap();

        let report = EquivalenceCheck::new(2)
            .run(interpreter.as_ref(), task.as_ref(), &dataset)
            .unwrap();

        assert!(report.outcomes[0].matched, "{:?}", report.outcomes[0]);
        assert!(!report.all_match());
        let miss: Vec<&EntryOutcome> = report.mismatches().collect();
        assert_eq!(miss.len(), 1);
        assert_eq!(miss[0].title, "Long");

        // The shorter last window has the larger uniform softmax,
        // so the task engine's top span comes from text the
        // interpreter never reads.
        let seen_by_interpreter = ["one", "two", "three", "four", "five"];
        let left  = miss[0].left_answer.as_deref().unwrap();
        let right = miss[0].right_answer.as_deref().unwrap();
        assert!(left.split(' ').all(|w| seen_by_interpreter.contains(&w)), "{left}");
        assert!(right.split(' ').all(|w| ["six", "seven"].contains(&w)), "{right}");
    }

    /// Needs a pretrained SQuAD artifact written by `bertqa import`
    /// (e.g. from bert-large-uncased-whole-word-masking-finetuned-squad):
    /// BERTQA_MODEL_DIR=/path/to/model cargo test -- --ignored
    #[test]
    #[ignore]
    fn test_canonical_with_pretrained_model() {
        let dir = std::env::var("BERTQA_MODEL_DIR").expect("set BERTQA_MODEL_DIR");
        let dir = std::path::Path::new(&dir);
        let mut interpreter = EngineKind::Interpreter.build(dir);
        let mut task        = EngineKind::Task.build(dir);
        interpreter.load().unwrap();
        task.load().unwrap();

        let outcome = EquivalenceCheck::canonical(
            interpreter.as_ref(),
            task.as_ref(),
            &JsonDataset::bundled().unwrap(),
        )
        .unwrap();
        assert_eq!(outcome.left_answer.as_deref(), Some(CANONICAL_ANSWER));
        assert_eq!(outcome.right_answer.as_deref(), Some(CANONICAL_ANSWER));
    }
}
