// ============================================================
// Layer 2 — ScaffoldUseCase
// ============================================================
// Writes a complete, loadable model artifact directory without
// a pretrained checkpoint:
//
//   Step 1: Collect dataset text       (Layer 4 - data)
//   Step 2: Build word-level tokenizer (Layer 6 - infra)
//   Step 3: Validate the manifest      (Layer 6 - infra)
//   Step 4: Save manifest              (Layer 6 - infra)
//   Step 5: Random-init + save weights (Layer 5 - ml)
//
// The weights are untrained, so answers are arbitrary spans.
// What the artifact does prove is that the whole pipeline
// (tokenise → features → forward → decode → present) runs end
// to end, and that both engines agree on identical input.

use anyhow::Result;
use std::path::PathBuf;

use crate::domain::traits::DatasetProvider;
use crate::infra::checkpoint::{AnswerOptions, ModelManifest, ModelShape, ModelStore};
use crate::ml::runtime::write_initial_weights;

// ─── Scaffold Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub out_dir:     PathBuf,
    /// Upper bound on tokenizer ids; the manifest records the ids in use
    pub max_vocab:   usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub answer:      AnswerOptions,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            out_dir:     PathBuf::from("model"),
            max_vocab:   8000,
            max_seq_len: 256,
            d_model:     64,
            num_heads:   4,
            num_layers:  2,
            d_ff:        128,
            answer:      AnswerOptions::default(),
        }
    }
}

// ─── ScaffoldUseCase ──────────────────────────────────────────────────────────
pub struct ScaffoldUseCase {
    config: ScaffoldConfig,
}

impl ScaffoldUseCase {
    pub fn new(config: ScaffoldConfig) -> Self {
        Self { config }
    }

    /// Write the artifact and return its manifest.
    pub fn execute(&self, dataset: &dyn DatasetProvider) -> Result<ModelManifest> {
        let cfg   = &self.config;
        let store = ModelStore::new(cfg.out_dir.clone());

        // ── Step 1: Every text the tokenizer will see ────────────────────────
        let mut texts: Vec<&str> = dataset.titles();
        for index in 0..dataset.len() {
            texts.push(dataset.content(index)?);
            texts.extend(dataset.questions(index)?.iter().map(String::as_str));
        }
        tracing::info!("Scaffolding from {} passages ({} texts)", dataset.len(), texts.len());

        // ── Step 2: Tokenizer ────────────────────────────────────────────────
        let vocab_size = store.tokenizers().build_and_save(&texts, cfg.max_vocab)?;

        // ── Step 3: Manifest ─────────────────────────────────────────────────
        let manifest = ModelManifest {
            model: ModelShape {
                vocab_size,
                max_seq_len: cfg.max_seq_len,
                d_model:     cfg.d_model,
                num_heads:   cfg.num_heads,
                num_layers:  cfg.num_layers,
                d_ff:        cfg.d_ff,
                max_position_embeddings: None,
                layer_norm_eps: 1e-5,
            },
            answer: cfg.answer.clone(),
        };
        manifest.validate()?;

        // ── Step 4 + 5: Persist ──────────────────────────────────────────────
        store.save_manifest(&manifest)?;
        write_initial_weights(&store, &manifest.model)?;

        tracing::info!("Model artifact written to '{}'", store.dir().display());
        Ok(manifest)
    }
}
