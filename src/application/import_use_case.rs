// ============================================================
// Layer 2 — ImportUseCase
// ============================================================
// Turns a downloaded HuggingFace `BertForQuestionAnswering`
// checkpoint into a model artifact directory:
//
//   Step 1: Read config.json           (architecture)
//   Step 2: Build + validate manifest  (Layer 6 - infra)
//   Step 3: Copy + check tokenizer     (Layer 6 - infra)
//   Step 4: Import weights             (Layer 5 - ml)
//   Step 5: Save manifest              (Layer 6 - infra)
//
// The source directory holds what the model hub serves:
//
//   source/
//     config.json
//     model.safetensors
//     tokenizer.json      ← WordPiece, with [CLS] [SEP] [PAD]

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::infra::checkpoint::{AnswerOptions, ModelManifest, ModelShape, ModelStore};
use crate::infra::tokenizer_store::{TokenizerStore, TOKENIZER_FILE};
use crate::ml::features::SpecialTokens;
use crate::ml::runtime::write_imported_weights;

const HF_CONFIG_FILE:  &str = "config.json";
const HF_WEIGHTS_FILE: &str = "model.safetensors";

/// The fields of a HuggingFace BERT `config.json` the encoder needs.
#[derive(Debug, Clone, Deserialize)]
struct BertConfig {
    vocab_size:              usize,
    hidden_size:             usize,
    num_hidden_layers:       usize,
    num_attention_heads:     usize,
    intermediate_size:       usize,
    max_position_embeddings: usize,
    #[serde(default = "two")]
    type_vocab_size:         usize,
    #[serde(default = "bert_layer_norm_eps")]
    layer_norm_eps:          f64,
    #[serde(default = "gelu")]
    hidden_act:              String,
}

fn two() -> usize {
    2
}

fn bert_layer_norm_eps() -> f64 {
    1e-12
}

fn gelu() -> String {
    "gelu".to_string()
}

// ─── Import Configuration ────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub source:      PathBuf,
    pub out_dir:     PathBuf,
    /// Sequence length fed to the encoder, at most the checkpoint's
    /// position table
    pub max_seq_len: usize,
    pub answer:      AnswerOptions,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source:      PathBuf::from("bert-squad"),
            out_dir:     PathBuf::from("model"),
            max_seq_len: 384,
            answer:      AnswerOptions::default(),
        }
    }
}

// ─── ImportUseCase ────────────────────────────────────────────────────────────
pub struct ImportUseCase {
    config: ImportConfig,
}

impl ImportUseCase {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    /// Write the artifact and return its manifest.
    pub fn execute(&self) -> Result<ModelManifest> {
        let cfg   = &self.config;
        let store = ModelStore::new(cfg.out_dir.clone());

        // ── Step 1: Architecture ─────────────────────────────────────────────
        let config_path = cfg.source.join(HF_CONFIG_FILE);
        let json = fs::read_to_string(&config_path)
            .with_context(|| format!("Cannot read '{}'", config_path.display()))?;
        let bert: BertConfig = serde_json::from_str(&json)
            .with_context(|| format!("Not a BERT config: '{}'", config_path.display()))?;
        ensure!(bert.hidden_act == "gelu",
            "Unsupported activation '{}', expected gelu", bert.hidden_act);
        ensure!(bert.type_vocab_size == 2,
            "Unsupported type_vocab_size {}, expected 2", bert.type_vocab_size);

        // ── Step 2: Manifest ─────────────────────────────────────────────────
        let manifest = ModelManifest {
            model: ModelShape {
                vocab_size:  bert.vocab_size,
                max_seq_len: cfg.max_seq_len,
                d_model:     bert.hidden_size,
                num_heads:   bert.num_attention_heads,
                num_layers:  bert.num_hidden_layers,
                d_ff:        bert.intermediate_size,
                max_position_embeddings: Some(bert.max_position_embeddings),
                layer_norm_eps: bert.layer_norm_eps,
            },
            answer: cfg.answer.clone(),
        };
        manifest.validate()?;

        // ── Step 3: Tokenizer ────────────────────────────────────────────────
        fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.out_dir.display()))?;
        let tokenizers = store.tokenizers();
        let source_tokenizer = cfg.source.join(TOKENIZER_FILE);
        fs::copy(&source_tokenizer, tokenizers.path())
            .with_context(|| format!("Cannot copy '{}'", source_tokenizer.display()))?;
        let tokenizer = tokenizers.load()?;
        SpecialTokens::from_tokenizer(&tokenizer)?;
        ensure!(tokenizer.get_vocab_size(true) <= bert.vocab_size,
            "Tokenizer has {} ids but the checkpoint only {}",
            tokenizer.get_vocab_size(true), bert.vocab_size);

        // ── Step 4 + 5: Weights, then manifest ───────────────────────────────
        write_imported_weights(&store, &manifest.model, &cfg.source.join(HF_WEIGHTS_FILE))?;
        store.save_manifest(&manifest)?;

        tracing::info!(
            "Imported {} layers (d_model={}) into '{}'",
            manifest.model.num_layers,
            manifest.model.d_model,
            store.dir().display()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::AnswerEngine;
    use crate::ml::EngineKind;
    use crate::test_support::{tiny_bert_config, tiny_bert_source, TINY_BERT};

    const CORPUS: &str = "the game was played in santa clara";

    fn config(source: &tempfile::TempDir, out: &tempfile::TempDir) -> ImportConfig {
        ImportConfig {
            source:      source.path().to_path_buf(),
            out_dir:     out.path().to_path_buf(),
            max_seq_len: TINY_BERT.positions,
            answer: AnswerOptions {
                max_query_len: 2,
                ..AnswerOptions::default()
            },
        }
    }

    #[test]
    fn test_import_writes_loadable_artifact() {
        let source = tiny_bert_source(CORPUS);
        let out    = tempfile::tempdir().unwrap();
        let manifest = ImportUseCase::new(config(&source, &out)).execute().unwrap();

        assert_eq!(manifest.model.max_position_embeddings, Some(TINY_BERT.positions));
        assert_eq!(manifest.model.layer_norm_eps, 1e-12);
        let store = ModelStore::new(out.path());
        assert_eq!(store.load_manifest().unwrap(), manifest);
        assert!(store.weights_path().exists());

        for kind in [EngineKind::Interpreter, EngineKind::Task] {
            let mut engine = kind.build(out.path());
            engine.load().unwrap();
            let answers = engine.answer(CORPUS, "where").unwrap();
            assert!(answers.top().is_some(), "{} found no span", kind.name());
        }
    }

    #[test]
    fn test_unsupported_activation_is_rejected() {
        let source = tiny_bert_source(CORPUS);
        let mut bert = tiny_bert_config();
        bert["hidden_act"] = serde_json::json!("relu");
        fs::write(source.path().join(HF_CONFIG_FILE), bert.to_string()).unwrap();

        let out = tempfile::tempdir().unwrap();
        assert!(ImportUseCase::new(config(&source, &out)).execute().is_err());
        assert!(ModelStore::new(out.path()).load_manifest().is_err());
    }

    #[test]
    fn test_sequence_longer_than_position_table_is_rejected() {
        let source = tiny_bert_source(CORPUS);
        let out    = tempfile::tempdir().unwrap();
        let config = ImportConfig {
            max_seq_len: TINY_BERT.positions + 1,
            ..config(&source, &out)
        };
        assert!(ImportUseCase::new(config).execute().is_err());
    }

    #[test]
    fn test_tokenizer_larger_than_checkpoint_is_rejected() {
        let source = tiny_bert_source(CORPUS);
        TokenizerStore::new(source.path())
            .build_and_save(&["a b c d e f g h i j k l m n"], 100)
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        assert!(ImportUseCase::new(config(&source, &out)).execute().is_err());
    }
}
