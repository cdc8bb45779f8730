// ============================================================
// Layer 6 — Model Store
// ============================================================
// A model artifact is a directory:
//
//   model_dir/
//     model_config.json  ← ModelManifest (architecture + answer options)
//     model.mpk          ← encoder weights (Burn CompactRecorder)
//     tokenizer.json     ← HuggingFace tokenizer
//
// The store hands these files to Burn and tokenizers without
// interpreting the weights; the manifest is the only file it
// reads itself, to rebuild the architecture before loading.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//     at half precision
//   - Type-safe: loading fails if architecture doesn't match
//
// Pretrained HuggingFace checkpoints enter through
// `import_safetensors`, which renames BERT's tensors onto the
// encoder (see BERT_KEY_MAP) before they are saved as a record.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use burn_store::{KeyRemapper, ModuleSnapshot, PyTorchToBurnAdapter, SafetensorsStore};
use serde::{Deserialize, Serialize};

use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{QaEncoderConfig, QaEncoder};

const MANIFEST_FILE: &str = "model_config.json";
const WEIGHTS_STEM:  &str = "model";
/// What CompactRecorder writes for WEIGHTS_STEM
pub const WEIGHTS_FILE: &str = "model.mpk";

/// Overlap used when the manifest names none, capped at half
/// the context window.
pub const DEFAULT_DOC_OVERLAP: usize = 64;

/// HuggingFace `BertForQuestionAnswering` tensor names → encoder paths.
/// Linear weights are transposed and LayerNorm weight/bias become
/// gamma/beta by `PyTorchToBurnAdapter`.
pub const BERT_KEY_MAP: [(&str, &str); 11] = [
    (r"^bert\.embeddings\.word_embeddings\.",       "embeddings.word."),
    (r"^bert\.embeddings\.position_embeddings\.",   "embeddings.position."),
    (r"^bert\.embeddings\.token_type_embeddings\.", "embeddings.segment."),
    (r"^bert\.embeddings\.LayerNorm\.",             "embeddings.norm."),
    (r"^bert\.encoder\.layer\.(\d+)\.attention\.self\.(query|key|value)\.",
                                                    "layers.$1.attention.$2."),
    (r"^bert\.encoder\.layer\.(\d+)\.attention\.output\.dense\.",
                                                    "layers.$1.attention.output."),
    (r"^bert\.encoder\.layer\.(\d+)\.attention\.output\.LayerNorm\.",
                                                    "layers.$1.attention_norm."),
    (r"^bert\.encoder\.layer\.(\d+)\.intermediate\.dense\.",
                                                    "layers.$1.feed_forward.expand."),
    (r"^bert\.encoder\.layer\.(\d+)\.output\.dense\.",
                                                    "layers.$1.feed_forward.contract."),
    (r"^bert\.encoder\.layer\.(\d+)\.output\.LayerNorm\.",
                                                    "layers.$1.output_norm."),
    (r"^qa_outputs\.",                               "span_head."),
];

// ─── Manifest ─────────────────────────────────────────────────────────────────
/// Encoder architecture. Must match the stored weights exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelShape {
    pub vocab_size:  usize,
    /// Length of every input sequence
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    /// Rows of the position table; `max_seq_len` when absent.
    /// BERT checkpoints carry 512.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position_embeddings: Option<usize>,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

impl ModelShape {
    pub fn position_table(&self) -> usize {
        self.max_position_embeddings.unwrap_or(self.max_seq_len)
    }

    pub fn encoder_config(&self) -> QaEncoderConfig {
        QaEncoderConfig::new(
            self.vocab_size,
            self.position_table(),
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
        )
        .with_layer_norm_eps(self.layer_norm_eps)
    }
}

/// How spans are searched and ranked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerOptions {
    /// Candidates kept per AnswerSet
    pub top_k: usize,
    /// Longest answer span, in tokens
    pub max_answer_len: usize,
    /// Question tokens kept before truncation
    pub max_query_len: usize,
    /// Context tokens shared by adjacent windows; see
    /// `ModelManifest::doc_overlap` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_overlap: Option<usize>,
    /// Windows per forward pass
    pub batch_size: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k:          5,
            max_answer_len: 32,
            max_query_len:  64,
            doc_overlap:    None,
            batch_size:     4,
        }
    }
}

/// Contents of `model_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model: ModelShape,
    #[serde(default)]
    pub answer: AnswerOptions,
}

impl ModelManifest {
    /// Context tokens that fit next to a full-length question:
    /// [CLS] question [SEP] context [SEP]
    pub fn context_window(&self) -> usize {
        self.model
            .max_seq_len
            .saturating_sub(self.answer.max_query_len + 3)
    }

    /// Context tokens shared by adjacent windows.
    pub fn doc_overlap(&self) -> usize {
        self.answer
            .doc_overlap
            .unwrap_or_else(|| DEFAULT_DOC_OVERLAP.min(self.context_window() / 2))
    }

    pub fn validate(&self) -> Result<()> {
        let m = &self.model;
        let a = &self.answer;
        ensure!(m.num_heads > 0 && m.d_model % m.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})", m.d_model, m.num_heads);
        ensure!(m.vocab_size > 0, "vocab_size must be positive");
        ensure!(self.context_window() > 0,
            "max_seq_len ({}) leaves no room for context after max_query_len ({})",
            m.max_seq_len, a.max_query_len);
        ensure!(m.max_seq_len <= m.position_table(),
            "max_seq_len ({}) exceeds the position table ({})",
            m.max_seq_len, m.position_table());
        ensure!(m.layer_norm_eps > 0.0, "layer_norm_eps must be positive");
        ensure!(self.doc_overlap() < self.context_window(),
            "doc_overlap ({}) must be less than the context window ({})",
            self.doc_overlap(), self.context_window());
        ensure!(a.top_k > 0, "top_k must be at least 1");
        ensure!(a.max_answer_len > 0, "max_answer_len must be at least 1");
        ensure!(a.batch_size > 0, "batch_size must be at least 1");
        Ok(())
    }
}

// ─── ModelStore ───────────────────────────────────────────────────────────────
/// Reads and writes one model artifact directory.
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tokenizers(&self) -> TokenizerStore {
        TokenizerStore::new(self.dir.clone())
    }

    /// Read and validate `model_config.json`.
    pub fn load_manifest(&self) -> Result<ModelManifest> {
        let path = self.dir.join(MANIFEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model manifest '{}'", path.display()))?;
        let manifest: ModelManifest = serde_json::from_str(&json)
            .with_context(|| format!("Malformed model manifest '{}'", path.display()))?;
        manifest.validate()
            .with_context(|| format!("Invalid model manifest '{}'", path.display()))?;
        Ok(manifest)
    }

    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(manifest)?)
            .with_context(|| format!("Cannot write model manifest '{}'", path.display()))?;
        tracing::debug!("Saved model manifest to '{}'", path.display());
        Ok(())
    }

    /// File the weights live in.
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(WEIGHTS_FILE)
    }

    /// Load the stored weights into `model`, which must have been
    /// built from this artifact's manifest.
    pub fn load_weights<B: Backend>(
        &self,
        model:  QaEncoder<B>,
        device: &B::Device,
    ) -> Result<QaEncoder<B>> {
        let path = self.dir.join(WEIGHTS_STEM);
        let record = CompactRecorder::new()
            .load(path, device)
            .with_context(|| format!("Cannot load weights '{}'", self.weights_path().display()))?;
        Ok(model.load_record(record))
    }

    pub fn save_weights<B: Backend>(&self, model: &QaEncoder<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(WEIGHTS_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Cannot save weights to '{}'", path.display()))?;
        tracing::debug!("Saved weights to '{}'", self.weights_path().display());
        Ok(())
    }
}

// ─── Pretrained import ────────────────────────────────────────────────────────
/// Copy HuggingFace `BertForQuestionAnswering` weights from a
/// safetensors file into `model`. Every encoder tensor must be
/// present; extra tensors (pooler, position ids) are ignored.
pub fn import_safetensors<B: Backend>(
    mut model: QaEncoder<B>,
    path:      &Path,
) -> Result<QaEncoder<B>> {
    let remapper = KeyRemapper::from_patterns(BERT_KEY_MAP.to_vec())
        .context("Invalid BERT key map")?;
    let mut store = SafetensorsStore::from_file(path)
        .with_from_adapter(PyTorchToBurnAdapter)
        .remap(remapper)
        .allow_partial(false);

    let result = model
        .load_from(&mut store)
        .map_err(|e| anyhow::anyhow!("Cannot import '{}': {}", path.display(), e))?;
    tracing::info!(
        "Imported {} tensors from '{}' ({} unused)",
        result.applied.len(),
        path.display(),
        result.unused.len()
    );
    tracing::debug!("Unused tensors: {:?}", result.unused);
    Ok(model)
}
