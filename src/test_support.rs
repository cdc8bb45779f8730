// Shared fixtures for unit tests.
//
// The fixture model is a scaffolded artifact: a word-level
// tokenizer over the bundled dataset and a small randomly
// initialised encoder. Its answers are arbitrary but
// deterministic for a given artifact, which is all the engine
// and equivalence tests need.

use std::path::Path;

use safetensors::{tensor::TensorView, Dtype};
use tempfile::TempDir;

use crate::application::import_use_case::{ImportConfig, ImportUseCase};
use crate::application::scaffold_use_case::{ScaffoldConfig, ScaffoldUseCase};
use crate::data::loader::JsonDataset;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::infra::checkpoint::{AnswerOptions, ModelManifest};

pub struct FixtureModel {
    dir:          TempDir,
    pub manifest: ModelManifest,
}

impl FixtureModel {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// 256-token encoder; every bundled passage fits one window.
pub fn fixture_model() -> FixtureModel {
    build(256, AnswerOptions::default())
}

/// Fixture with a custom sequence length and answer options.
pub fn fixture_model_with(max_seq_len: usize, answer: AnswerOptions) -> FixtureModel {
    build(max_seq_len, answer)
}

fn build(max_seq_len: usize, answer: AnswerOptions) -> FixtureModel {
    let dir    = tempfile::tempdir().unwrap();
    let config = ScaffoldConfig {
        out_dir: dir.path().to_path_buf(),
        max_vocab: 4000,
        max_seq_len,
        d_model: 32,
        num_heads: 2,
        num_layers: 2,
        d_ff: 64,
        answer,
    };
    let manifest = ScaffoldUseCase::new(config)
        .execute(&JsonDataset::bundled().unwrap())
        .unwrap();
    FixtureModel { dir, manifest }
}

// ─── HuggingFace BERT checkpoint ──────────────────────────────────────────────
/// Dimensions of a tiny `BertForQuestionAnswering` checkpoint.
pub const TINY_BERT: TinyBert = TinyBert {
    vocab: 12, positions: 10, hidden: 8, heads: 2, layers: 1, ff: 16,
};

#[derive(Debug, Clone, Copy)]
pub struct TinyBert {
    pub vocab:     usize,
    pub positions: usize,
    pub hidden:    usize,
    pub heads:     usize,
    pub layers:    usize,
    pub ff:        usize,
}

/// Span logits every position of the tiny checkpoint produces.
pub const TINY_BERT_LOGITS: (f32, f32) = (2.5, -2.75);

/// Write a safetensors file with HuggingFace tensor names and
/// PyTorch layouts, leaving out `skip`.
///
/// Every LayerNorm has weight 0 and bias e0, so each position's
/// hidden state is e0 whatever the other weights are, and the
/// span head turns e0 into `TINY_BERT_LOGITS`.
pub fn write_bert_checkpoint(path: &Path, skip: Option<&str>) {
    let b = TINY_BERT;
    let mut e0 = vec![0.0; b.hidden];
    e0[0] = 1.0;
    let fill = |n: usize| vec![0.1_f32; n];

    let mut tensors: Vec<(String, Vec<usize>, Vec<f32>)> = vec![
        ("bert.embeddings.word_embeddings.weight".into(), vec![b.vocab, b.hidden], fill(b.vocab * b.hidden)),
        ("bert.embeddings.position_embeddings.weight".into(), vec![b.positions, b.hidden], fill(b.positions * b.hidden)),
        ("bert.embeddings.token_type_embeddings.weight".into(), vec![2, b.hidden], fill(2 * b.hidden)),
        ("bert.embeddings.LayerNorm.weight".into(), vec![b.hidden], vec![0.0; b.hidden]),
        ("bert.embeddings.LayerNorm.bias".into(), vec![b.hidden], e0.clone()),
        ("bert.pooler.dense.weight".into(), vec![b.hidden, b.hidden], fill(b.hidden * b.hidden)),
    ];
    for i in 0..b.layers {
        let p = format!("bert.encoder.layer.{i}");
        let linear = |name: String, out: usize, inp: usize| {
            [
                (format!("{name}.weight"), vec![out, inp], fill(out * inp)),
                (format!("{name}.bias"), vec![out], fill(out)),
            ]
        };
        let norm = |name: String| {
            [
                (format!("{name}.weight"), vec![b.hidden], vec![0.0; b.hidden]),
                (format!("{name}.bias"), vec![b.hidden], e0.clone()),
            ]
        };
        for qkv in ["query", "key", "value"] {
            tensors.extend(linear(format!("{p}.attention.self.{qkv}"), b.hidden, b.hidden));
        }
        tensors.extend(linear(format!("{p}.attention.output.dense"), b.hidden, b.hidden));
        tensors.extend(norm(format!("{p}.attention.output.LayerNorm")));
        tensors.extend(linear(format!("{p}.intermediate.dense"), b.ff, b.hidden));
        tensors.extend(linear(format!("{p}.output.dense"), b.hidden, b.ff));
        tensors.extend(norm(format!("{p}.output.LayerNorm")));
    }
    let mut head = vec![0.0; 2 * b.hidden];
    head[0]        = 2.0;
    head[b.hidden] = -3.0;
    tensors.push(("qa_outputs.weight".into(), vec![2, b.hidden], head));
    tensors.push(("qa_outputs.bias".into(), vec![2], vec![0.5, 0.25]));

    tensors.retain(|(name, _, _)| Some(name.as_str()) != skip);

    let bytes: Vec<(String, Vec<usize>, Vec<u8>)> = tensors
        .into_iter()
        .map(|(name, shape, values)| {
            (name, shape, values.iter().flat_map(|v| v.to_le_bytes()).collect())
        })
        .collect();
    let views: Vec<(String, TensorView)> = bytes
        .iter()
        .map(|(name, shape, data)| {
            (name.clone(), TensorView::new(Dtype::F32, shape.clone(), data).unwrap())
        })
        .collect();
    safetensors::serialize_to_file(views, None, path).unwrap();
}

/// HuggingFace `config.json` matching `TINY_BERT`.
pub fn tiny_bert_config() -> serde_json::Value {
    let b = TINY_BERT;
    serde_json::json!({
        "architectures": ["BertForQuestionAnswering"],
        "model_type": "bert",
        "vocab_size": b.vocab,
        "hidden_size": b.hidden,
        "num_hidden_layers": b.layers,
        "num_attention_heads": b.heads,
        "intermediate_size": b.ff,
        "max_position_embeddings": b.positions,
        "type_vocab_size": 2,
        "layer_norm_eps": 1e-12,
        "hidden_act": "gelu",
        "pad_token_id": 0
    })
}

/// A hub-style source directory (config.json, model.safetensors,
/// tokenizer.json) around the tiny checkpoint. The tokenizer is a
/// word-level stand-in for WordPiece built from `corpus`.
pub fn tiny_bert_source(corpus: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_bert_checkpoint(&dir.path().join("model.safetensors"), None);
    std::fs::write(
        dir.path().join("config.json"),
        serde_json::to_string(&tiny_bert_config()).unwrap(),
    )
    .unwrap();
    TokenizerStore::new(dir.path())
        .build_and_save(&[corpus], TINY_BERT.vocab)
        .unwrap();
    dir
}

/// The tiny checkpoint imported with full-length sequences.
///
/// Every real position gets the same logits, so each window's
/// softmax is uniform and shorter windows score higher.
pub fn imported_tiny_bert(corpus: &str, answer: AnswerOptions) -> FixtureModel {
    let source = tiny_bert_source(corpus);
    let dir    = tempfile::tempdir().unwrap();
    let config = ImportConfig {
        source:      source.path().to_path_buf(),
        out_dir:     dir.path().to_path_buf(),
        max_seq_len: TINY_BERT.positions,
        answer,
    };
    let manifest = ImportUseCase::new(config).execute().unwrap();
    FixtureModel { dir, manifest }
}
