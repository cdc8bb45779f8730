// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor math and tokenisation happens here (infra only
// persists weights and tokenizer files). Everything above this
// layer sees only `dyn AnswerEngine` and AnswerSets.
//
// What's in this layer:
//
//   model.rs       — BERT-shaped encoder with a span head
//   features.rs    — [CLS] q [SEP] ctx [SEP] input layout with
//                    character offsets per context token
//   decode.rs      — P_start × P_end span search
//   runtime.rs     — A loaded model on the CPU device; batched
//                    masked forward pass → probabilities
//
//   interpreter.rs — Engine 1: one truncated window, one pass
//   task.rs        — Engine 2: overlapping windows, batched,
//                    cancellable, merged ranking
//
// Reference: Burn Book §3 (Building Blocks)
//            Devlin et al. (2019) BERT

use std::path::Path;

use crate::domain::traits::AnswerEngine;
use crate::infra::checkpoint::ModelStore;

pub mod model;
pub mod features;
pub mod decode;
pub mod runtime;

/// Direct single-window engine
pub mod interpreter;

/// Windowed, batched engine
pub mod task;

/// Which AnswerEngine implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Interpreter,
    Task,
}

impl EngineKind {
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Interpreter => "interpreter",
            EngineKind::Task        => "task",
        }
    }

    /// An unloaded engine over the artifact in `model_dir`.
    pub fn build(self, model_dir: &Path) -> Box<dyn AnswerEngine> {
        let store = ModelStore::new(model_dir);
        match self {
            EngineKind::Interpreter => Box::new(interpreter::InterpreterEngine::new(store)),
            EngineKind::Task        => Box::new(task::TaskEngine::new(store)),
        }
    }
}
