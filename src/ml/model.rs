// ============================================================
// Layer 5 — Span Encoder (Burn)
// ============================================================
// BERT-shaped encoder with a two-logit span head:
//
//   Embeddings:  word + position + segment  → LayerNorm
//   N × EncoderLayer:
//       x = norm(x + SelfAttention(x, pad_mask))
//       x = norm(x + FeedForward(x))          (GELU)
//   SpanHead:    Linear(d_model → 2)  → start_logits, end_logits
//
// Padding positions are masked out of attention as keys, so a
// real token's logits do not depend on what padding follows.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT, §3

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Gelu, LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::Bool,
};

// #[derive(Config)] provides Clone, new() and with_*() builders.
#[derive(Config, Debug)]
pub struct QaEncoderConfig {
    pub vocab_size:    usize,
    /// Rows of the position table
    pub max_positions: usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    /// Question = 0, context = 1
    #[config(default = 2)]
    pub type_vocab_size: usize,
    /// BERT checkpoints use 1e-12
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
    /// Inference only, so off by default
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl QaEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QaEncoder<B> {
        QaEncoder {
            embeddings: Embeddings {
                word:     EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
                position: EmbeddingConfig::new(self.max_positions, self.d_model).init(device),
                segment:  EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
                norm:     self.layer_norm().init(device),
                dropout:  DropoutConfig::new(self.dropout).init(),
            },
            layers: (0..self.num_layers).map(|_| self.init_layer(device)).collect(),
            span_head: LinearConfig::new(self.d_model, 2).init(device),
        }
    }

    fn layer_norm(&self) -> LayerNormConfig {
        LayerNormConfig::new(self.d_model).with_epsilon(self.layer_norm_eps)
    }

    fn init_layer<B: Backend>(&self, device: &B::Device) -> EncoderLayer<B> {
        EncoderLayer {
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            attention_norm: self.layer_norm().init(device),
            feed_forward: FeedForward {
                expand:     LinearConfig::new(self.d_model, self.d_ff).init(device),
                contract:   LinearConfig::new(self.d_ff, self.d_model).init(device),
                activation: Gelu::new(),
            },
            output_norm: self.layer_norm().init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Embeddings ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    word:     Embedding<B>,
    position: Embedding<B>,
    segment:  Embedding<B>,
    norm:     LayerNorm<B>,
    dropout:  Dropout,
}

impl<B: Backend> Embeddings<B> {
    /// [batch, seq] ids → [batch, seq, d_model]
    fn forward(&self, input_ids: Tensor<B, 2, Int>, segment_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch, seq] = input_ids.dims();
        let positions = Tensor::<B, 1, Int>::arange(0..seq as i64, &input_ids.device())
            .reshape([1, seq])
            .repeat_dim(0, batch);

        let summed = self.word.forward(input_ids)
            + self.position.forward(positions)
            + self.segment.forward(segment_ids);
        self.dropout.forward(self.norm.forward(summed))
    }
}

// ─── Encoder layer ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    expand:     Linear<B>,
    contract:   Linear<B>,
    activation: Gelu,
}

impl<B: Backend> FeedForward<B> {
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.contract.forward(self.activation.forward(self.expand.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    attention:      MultiHeadAttention<B>,
    attention_norm: LayerNorm<B>,
    feed_forward:   FeedForward<B>,
    output_norm:    LayerNorm<B>,
    dropout:        Dropout,
}

impl<B: Backend> EncoderLayer<B> {
    /// pad_mask: [batch, seq], true at padding
    fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attended = self
            .attention
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.attention_norm.forward(x + self.dropout.forward(attended));

        let transformed = self.feed_forward.forward(x.clone());
        self.output_norm.forward(x + self.dropout.forward(transformed))
    }
}

// ─── QaEncoder ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct QaEncoder<B: Backend> {
    embeddings: Embeddings<B>,
    layers:     Vec<EncoderLayer<B>>,
    span_head:  Linear<B>,
}

/// Unnormalised span scores, [batch, seq] each.
pub struct SpanLogits<B: Backend> {
    pub start: Tensor<B, 2>,
    pub end:   Tensor<B, 2>,
}

impl<B: Backend> QaEncoder<B> {
    pub fn forward(
        &self,
        input_ids:   Tensor<B, 2, Int>,
        segment_ids: Tensor<B, 2, Int>,
        pad_mask:    Tensor<B, 2, Bool>,
    ) -> SpanLogits<B> {
        let [batch, seq] = input_ids.dims();

        let hidden = self
            .layers
            .iter()
            .fold(self.embeddings.forward(input_ids, segment_ids), |x, layer| {
                layer.forward(x, pad_mask.clone())
            });

        let logits = self.span_head.forward(hidden); // [batch, seq, 2]
        let start = logits.clone().slice([0..batch, 0..seq, 0..1]).reshape([batch, seq]);
        let end   = logits.slice([0..batch, 0..seq, 1..2]).reshape([batch, seq]);

        SpanLogits { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn ids(values: &[i32], device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, device).reshape([1, values.len()])
    }

    #[test]
    fn test_logits_shape() {
        let device  = Default::default();
        let encoder = QaEncoderConfig::new(20, 8, 16, 2, 1, 32).init::<TestBackend>(&device);

        let input   = Tensor::<TestBackend, 2, Int>::ones([3, 8], &device);
        let segment = Tensor::<TestBackend, 2, Int>::zeros([3, 8], &device);
        let mask    = Tensor::<TestBackend, 2, Int>::zeros([3, 8], &device).equal_elem(1);

        let out = encoder.forward(input, segment, mask);
        assert_eq!(out.start.dims(), [3, 8]);
        assert_eq!(out.end.dims(), [3, 8]);
    }

    #[test]
    fn test_padding_content_does_not_change_real_logits() {
        let device  = Default::default();
        let encoder = QaEncoderConfig::new(20, 6, 16, 2, 2, 32).init::<TestBackend>(&device);
        let segment = ids(&[0, 0, 1, 1, 0, 0], &device);
        let mask    = ids(&[1, 1, 1, 1, 0, 0], &device).equal_elem(0);

        let a = encoder.forward(ids(&[2, 5, 3, 7, 0, 0], &device), segment.clone(), mask.clone());
        let b = encoder.forward(ids(&[2, 5, 3, 7, 9, 11], &device), segment, mask);

        let a: Vec<f32> = a.start.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.start.into_data().to_vec().unwrap();
        for i in 0..4 {
            assert!((a[i] - b[i]).abs() < 1e-5, "position {i}: {} vs {}", a[i], b[i]);
        }
    }
}
