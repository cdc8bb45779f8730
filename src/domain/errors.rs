//! Error taxonomy for the question-answering workflow.

use thiserror::Error;

/// Failures of an answer engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The model or its resources could not be loaded, or the
    /// engine was asked to answer before `load()` succeeded.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// A single query failed while tokenising or running the model.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The caller raised the cancel flag while the query ran.
    #[error("inference cancelled")]
    Cancelled,
}

/// A submission that is empty after trimming. Not a failure:
/// the controller rejects it before any engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("question is empty")]
pub struct EmptyQuestion;

/// Failures of the dataset provider.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read dataset '{path}': {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("inconsistent dataset: {0}")]
    Inconsistent(String),

    #[error("dataset index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
