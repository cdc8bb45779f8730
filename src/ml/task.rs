// ============================================================
// Layer 5 — Task Engine
// ============================================================
// The high-level path: the whole passage is covered by
// overlapping token windows, the windows are run through the
// model in batches, and the per-window spans are merged into
// one ranking.
//
//   passage tokens: |---------------------------------|
//   window 1:       |-----------|
//   window 2:              |-----------|
//   window 3:                     |------------|
//
// A span found in two overlapping windows keeps its better
// score (AnswerSet::ranked dedups by character span).
//
// The cancel flag is checked before every batch, so an
// abandoned query stops after at most one forward pass.

use crate::data::chunker::Chunker;
use crate::domain::answer::{AnswerCandidate, AnswerSet};
use crate::domain::errors::EngineError;
use crate::domain::traits::{AnswerEngine, CancelFlag};
use crate::infra::checkpoint::ModelStore;
use crate::ml::features::QaFeature;
use crate::ml::runtime::LoadedModel;

pub struct TaskEngine {
    store:  ModelStore,
    loaded: Option<LoadedModel>,
}

impl TaskEngine {
    pub fn new(store: ModelStore) -> Self {
        Self { store, loaded: None }
    }

    fn model(&self) -> Result<&LoadedModel, EngineError> {
        self.loaded
            .as_ref()
            .ok_or_else(|| EngineError::Unavailable("task engine is not loaded".into()))
    }
}

impl AnswerEngine for TaskEngine {
    fn name(&self) -> &'static str {
        "task"
    }

    fn load(&mut self) -> Result<(), EngineError> {
        if self.loaded.is_none() {
            self.loaded = Some(LoadedModel::load(&self.store)?);
        }
        Ok(())
    }

    fn unload(&mut self) {
        if self.loaded.take().is_some() {
            tracing::debug!("task: model released");
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn answer(&self, content: &str, question: &str) -> Result<AnswerSet, EngineError> {
        self.answer_cancellable(content, question, &CancelFlag::new())
    }

    fn answer_cancellable(
        &self,
        content:  &str,
        question: &str,
        cancel:   &CancelFlag,
    ) -> Result<AnswerSet, EngineError> {
        let model   = self.model()?;
        let options = &model.manifest().answer;

        let context = model.encode_context(content)?;
        if context.is_empty() {
            return Ok(AnswerSet::empty());
        }
        let question_ids = model.question_ids(question)?;

        let chunker = Chunker::new(model.manifest().context_window(), model.manifest().doc_overlap());
        let features: Vec<QaFeature> = chunker
            .windows(context.len())
            .into_iter()
            .map(|w| model.feature(&question_ids, &context, w))
            .collect();
        tracing::debug!(
            "task: {} context tokens in {} window(s)",
            context.len(),
            features.len()
        );

        let mut candidates: Vec<AnswerCandidate> = Vec::new();
        for batch in features.chunks(options.batch_size) {
            if cancel.is_cancelled() {
                tracing::debug!("task: cancelled with {} candidate(s) so far", candidates.len());
                return Err(EngineError::Cancelled);
            }
            let probs = model.probabilities(batch)?;
            for (feature, p) in batch.iter().zip(&probs) {
                candidates.extend(model.decode(feature, p, content));
            }
        }

        Ok(AnswerSet::ranked(candidates, options.top_k))
    }
}
