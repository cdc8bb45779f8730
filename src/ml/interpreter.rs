// ============================================================
// Layer 5 — Interpreter Engine
// ============================================================
// The direct path: tokenise, build ONE feature from the start
// of the passage, run one forward pass, decode.
//
//   [CLS] question [SEP] passage[0..window] [SEP] [PAD]...
//
// Passages longer than the context window are truncated; the
// answer can only come from the first window. TaskEngine
// (task.rs) covers the whole passage instead.

use crate::domain::answer::AnswerSet;
use crate::domain::errors::EngineError;
use crate::domain::traits::AnswerEngine;
use crate::infra::checkpoint::ModelStore;
use crate::ml::runtime::LoadedModel;

pub struct InterpreterEngine {
    store:  ModelStore,
    loaded: Option<LoadedModel>,
}

impl InterpreterEngine {
    pub fn new(store: ModelStore) -> Self {
        Self { store, loaded: None }
    }
}

impl AnswerEngine for InterpreterEngine {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn load(&mut self) -> Result<(), EngineError> {
        if self.loaded.is_none() {
            self.loaded = Some(LoadedModel::load(&self.store)?);
        }
        Ok(())
    }

    fn unload(&mut self) {
        if self.loaded.take().is_some() {
            tracing::debug!("interpreter: model released");
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn answer(&self, content: &str, question: &str) -> Result<AnswerSet, EngineError> {
        let model = self
            .loaded
            .as_ref()
            .ok_or_else(|| EngineError::Unavailable("interpreter engine is not loaded".into()))?;

        let context = model.encode_context(content)?;
        if context.is_empty() {
            return Ok(AnswerSet::empty());
        }
        let question_ids = model.question_ids(question)?;

        let window  = 0..context.len().min(model.manifest().context_window());
        if window.end < context.len() {
            tracing::debug!(
                "interpreter: passage truncated to {} of {} tokens",
                window.end,
                context.len()
            );
        }
        let feature = model.feature(&question_ids, &context, window);

        let probs = model.probabilities(std::slice::from_ref(&feature))?;
        let candidates = probs
            .first()
            .map(|p| model.decode(&feature, p, content))
            .unwrap_or_default();

        Ok(AnswerSet::ranked(candidates, model.manifest().answer.top_k))
    }
}
