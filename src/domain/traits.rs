// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams of the system:
//
//   AnswerEngine    — black-box extractive Q&A capability.
//                     Implementations:
//                       - InterpreterEngine (ml/interpreter.rs)
//                       - TaskEngine        (ml/task.rs)
//
//   DatasetProvider — read-only passages keyed by index.
//                     Implementations:
//                       - JsonDataset       (data/loader.rs)
//
// The controller and the equivalence check only ever hold
// `dyn AnswerEngine`, so either engine can be swapped in at
// construction time.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Trait Objects)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::answer::AnswerSet;
use crate::domain::errors::{DatasetError, EngineError};
use crate::domain::passage::Passage;

// ─── CancelFlag ───────────────────────────────────────────────────────────────
/// Shared flag a running query can poll to stop early.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── AnswerEngine ─────────────────────────────────────────────────────────────
/// Answers a question over a passage with a ranked AnswerSet.
///
/// Lifecycle: `load()` acquires the model, `unload()` releases it.
/// `unload()` is idempotent and safe to call without a prior
/// successful `load()`. Calls are issued serially from a single
/// thread; engines do not need to be `Sync`.
pub trait AnswerEngine: Send {
    /// Short backend name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Load the model and any inference context.
    fn load(&mut self) -> Result<(), EngineError>;

    /// Release everything `load()` acquired.
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    /// Rank answers to `question` within `content`.
    fn answer(&self, content: &str, question: &str) -> Result<AnswerSet, EngineError>;

    /// Same as `answer`, but may stop early with
    /// `EngineError::Cancelled` once `cancel` is raised.
    /// Engines that cannot stop mid-query keep this default.
    fn answer_cancellable(
        &self,
        content:  &str,
        question: &str,
        _cancel:  &CancelFlag,
    ) -> Result<AnswerSet, EngineError> {
        self.answer(content, question)
    }
}

// ─── DatasetProvider ──────────────────────────────────────────────────────────
/// Read-only passages. The same index refers to the same passage
/// across `titles()`, `content()` and `questions()` for the whole
/// session.
pub trait DatasetProvider {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn titles(&self) -> Vec<&str>;

    fn content(&self, index: usize) -> Result<&str, DatasetError>;

    fn questions(&self, index: usize) -> Result<&[String], DatasetError>;

    /// The whole entry at `index`.
    fn passage(&self, index: usize) -> Result<Passage, DatasetError> {
        let title = self
            .titles()
            .get(index)
            .map(|t| t.to_string())
            .ok_or(DatasetError::IndexOutOfRange { index, len: self.len() })?;
        Ok(Passage::new(
            title,
            self.content(index)?,
            self.questions(index)?.to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag  = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
