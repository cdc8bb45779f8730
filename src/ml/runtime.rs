// ============================================================
// Layer 5 — Loaded Model Runtime
// ============================================================
// Everything an engine holds between load() and unload():
// the encoder on the CPU device, the tokenizer, the manifest
// and the special token ids. Both engines drive the model
// through this type; they differ only in how they split the
// passage into features and how they batch them.

use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::domain::answer::AnswerCandidate;
use crate::domain::errors::EngineError;
use crate::infra::checkpoint::{import_safetensors, ModelManifest, ModelShape, ModelStore};
use crate::ml::decode::SpanDecoder;
use crate::ml::features::{self, EncodedContext, QaFeature, SpecialTokens};
use crate::ml::model::QaEncoder;

pub type InferBackend = burn::backend::NdArray;
pub type InferDevice  = burn::backend::ndarray::NdArrayDevice;

/// Logit mask value for padding before the softmax.
const PAD_LOGIT: f32 = -1.0e4;

/// Softmax outputs for one feature, indexed by sequence position.
#[derive(Debug, Clone)]
pub struct SpanProbabilities {
    pub start: Vec<f32>,
    pub end:   Vec<f32>,
}

pub struct LoadedModel {
    model:     QaEncoder<InferBackend>,
    tokenizer: Tokenizer,
    manifest:  ModelManifest,
    specials:  SpecialTokens,
    decoder:   SpanDecoder,
    device:    InferDevice,
}

impl LoadedModel {
    /// Read the artifact directory and build the model on the CPU.
    pub fn load(store: &ModelStore) -> Result<Self, EngineError> {
        let unavailable = |e: anyhow::Error| EngineError::Unavailable(format!("{e:#}"));

        let manifest  = store.load_manifest().map_err(unavailable)?;
        let tokenizer = store.tokenizers().load().map_err(unavailable)?;
        let specials  = SpecialTokens::from_tokenizer(&tokenizer)?;

        let device = InferDevice::default();
        let model: QaEncoder<InferBackend> =
            manifest.model.encoder_config().init(&device);
        let model = store.load_weights(model, &device).map_err(unavailable)?;

        let decoder = SpanDecoder::new(manifest.answer.max_answer_len, manifest.answer.top_k);

        tracing::info!(
            "Model loaded from '{}' ({} layers, d_model={}, max_seq_len={})",
            store.dir().display(),
            manifest.model.num_layers,
            manifest.model.d_model,
            manifest.model.max_seq_len,
        );

        Ok(Self { model, tokenizer, manifest, specials, decoder, device })
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn question_ids(&self, question: &str) -> Result<Vec<u32>, EngineError> {
        let ids = features::encode_question(
            &self.tokenizer,
            question,
            self.manifest.answer.max_query_len,
        )?;
        self.check_vocab(&ids)?;
        Ok(ids)
    }

    pub fn encode_context(&self, content: &str) -> Result<EncodedContext, EngineError> {
        let ctx = features::encode_context(&self.tokenizer, content)?;
        self.check_vocab(&ctx.ids)?;
        Ok(ctx)
    }

    pub fn feature(
        &self,
        question_ids: &[u32],
        context:      &EncodedContext,
        window:       std::ops::Range<usize>,
    ) -> QaFeature {
        QaFeature::build(
            self.specials,
            question_ids,
            context,
            window,
            self.manifest.model.max_seq_len,
        )
    }

    /// One forward pass over `batch`, softmaxed over the real
    /// (non-padding) positions of each row.
    pub fn probabilities(&self, batch: &[QaFeature]) -> Result<Vec<SpanProbabilities>, EngineError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let batch_size = batch.len();
        let seq_len    = self.manifest.model.max_seq_len;

        let ids: Vec<i32> = batch
            .iter()
            .flat_map(|f| f.input_ids.iter().map(|&x| x as i32))
            .collect();
        let segments: Vec<i32> = batch
            .iter()
            .flat_map(|f| f.segment_ids.iter().map(|&x| x as i32))
            .collect();
        let mask: Vec<i32> = batch
            .iter()
            .flat_map(|f| (0..seq_len).map(move |i| i32::from(i < f.real_len)))
            .collect();

        let input_ids = Tensor::<InferBackend, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let segment_ids = Tensor::<InferBackend, 1, Int>::from_ints(segments.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let pad_mask = Tensor::<InferBackend, 1, Int>::from_ints(mask.as_slice(), &self.device)
            .reshape([batch_size, seq_len])
            .equal_elem(0);

        let output = self.model.forward(input_ids, segment_ids, pad_mask.clone());

        let start = burn::tensor::activation::softmax(
            output.start.mask_fill(pad_mask.clone(), PAD_LOGIT), 1,
        );
        let end = burn::tensor::activation::softmax(
            output.end.mask_fill(pad_mask, PAD_LOGIT), 1,
        );

        let start: Vec<f32> = start
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| EngineError::Inference(format!("read start probabilities: {e:?}")))?;
        let end: Vec<f32> = end
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| EngineError::Inference(format!("read end probabilities: {e:?}")))?;

        Ok(start
            .chunks(seq_len)
            .zip(end.chunks(seq_len))
            .map(|(s, e)| SpanProbabilities { start: s.to_vec(), end: e.to_vec() })
            .collect())
    }

    pub fn decode(
        &self,
        feature: &QaFeature,
        probs:   &SpanProbabilities,
        content: &str,
    ) -> Vec<AnswerCandidate> {
        self.decoder.decode(feature, &probs.start, &probs.end, content)
    }

    // Embedding lookups past the table would abort inside the backend.
    fn check_vocab(&self, ids: &[u32]) -> Result<(), EngineError> {
        let vocab = self.manifest.model.vocab_size;
        match ids.iter().find(|&&id| id as usize >= vocab) {
            Some(id) => Err(EngineError::Inference(format!(
                "token id {id} outside model vocabulary ({vocab})"
            ))),
            None => Ok(()),
        }
    }
}

/// Randomly initialise an encoder of `shape` and write its
/// weights into `store`.
pub fn write_initial_weights(store: &ModelStore, shape: &ModelShape) -> anyhow::Result<()> {
    let device = InferDevice::default();
    let model: QaEncoder<InferBackend> = shape.encoder_config().init(&device);
    store.save_weights(&model)
}

/// Build an encoder of `shape`, fill it from a HuggingFace
/// safetensors checkpoint and write it into `store`.
pub fn write_imported_weights(
    store:  &ModelStore,
    shape:  &ModelShape,
    source: &std::path::Path,
) -> anyhow::Result<()> {
    let device = InferDevice::default();
    let model: QaEncoder<InferBackend> = shape.encoder_config().init(&device);
    let model = import_safetensors(model, source)?;
    store.save_weights(&model)
}
