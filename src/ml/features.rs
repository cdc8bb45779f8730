// ============================================================
// Layer 5 — Input Features
// ============================================================
// Turns (question, passage) into the model's input layout:
//
//   [CLS] question [SEP] context-window [SEP] [PAD] ...
//   segment:  0 ... 0     1 ... 1      1     0 ...
//
// Context tokens carry their CHARACTER offsets into the
// passage, so a decoded token span maps straight back to a
// substring of the passage.
//
// Tokenisation itself is delegated to `tokenizers`.

use std::ops::Range;

use tokenizers::Tokenizer;

use crate::domain::errors::EngineError;

/// Ids of the special tokens the input layout needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

impl SpecialTokens {
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self, EngineError> {
        let id = |token: &str| {
            tokenizer.token_to_id(token).ok_or_else(|| {
                EngineError::Unavailable(format!("tokenizer has no {token} token"))
            })
        };
        Ok(Self {
            cls: id("[CLS]")?,
            sep: id("[SEP]")?,
            pad: id("[PAD]")?,
        })
    }
}

/// A tokenised passage.
#[derive(Debug, Clone, Default)]
pub struct EncodedContext {
    pub ids:     Vec<u32>,
    /// (start, end) character offsets of each token
    pub offsets: Vec<(usize, usize)>,
}

impl EncodedContext {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn encode_question(
    tokenizer:     &Tokenizer,
    question:      &str,
    max_query_len: usize,
) -> Result<Vec<u32>, EngineError> {
    let enc = tokenizer
        .encode(question, false)
        .map_err(|e| EngineError::Inference(format!("question tokenise: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    ids.truncate(max_query_len);
    Ok(ids)
}

pub fn encode_context(tokenizer: &Tokenizer, content: &str) -> Result<EncodedContext, EngineError> {
    let enc = tokenizer
        .encode_char_offsets(content, false)
        .map_err(|e| EngineError::Inference(format!("context tokenise: {e}")))?;
    Ok(EncodedContext {
        ids:     enc.get_ids().to_vec(),
        offsets: enc.get_offsets().to_vec(),
    })
}

/// One padded model input plus what is needed to map its
/// token positions back to the passage.
#[derive(Debug, Clone, PartialEq)]
pub struct QaFeature {
    pub input_ids:   Vec<u32>,
    pub segment_ids: Vec<u32>,
    /// Non-padding tokens at the front of `input_ids`
    pub real_len: usize,
    /// Position of the first context token in `input_ids`
    pub context_start: usize,
    /// Character offsets of the context tokens in this window
    pub context_offsets: Vec<(usize, usize)>,
}

impl QaFeature {
    /// Lay out `question_ids` and `context[window]`, padded to
    /// `max_seq_len`. The caller sizes the window so the result fits.
    pub fn build(
        specials:     SpecialTokens,
        question_ids: &[u32],
        context:      &EncodedContext,
        window:       Range<usize>,
        max_seq_len:  usize,
    ) -> Self {
        let mut input_ids   = Vec::with_capacity(max_seq_len);
        let mut segment_ids = Vec::with_capacity(max_seq_len);

        input_ids.push(specials.cls);
        input_ids.extend_from_slice(question_ids);
        input_ids.push(specials.sep);
        segment_ids.resize(input_ids.len(), 0);

        let context_start = input_ids.len();
        input_ids.extend_from_slice(&context.ids[window.clone()]);
        input_ids.push(specials.sep);
        segment_ids.resize(input_ids.len(), 1);

        debug_assert!(input_ids.len() <= max_seq_len);
        let real_len = input_ids.len();
        input_ids.resize(max_seq_len, specials.pad);
        segment_ids.resize(max_seq_len, 0);

        Self {
            input_ids,
            segment_ids,
            real_len,
            context_start,
            context_offsets: context.offsets[window].to_vec(),
        }
    }

    pub fn context_len(&self) -> usize {
        self.context_offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SPECIALS: SpecialTokens = SpecialTokens { cls: 2, sep: 3, pad: 0 };

    fn context() -> EncodedContext {
        EncodedContext {
            ids:     vec![10, 11, 12, 13],
            offsets: vec![(0, 3), (4, 7), (8, 11), (12, 15)],
        }
    }

    #[test]
    fn test_layout_and_padding() {
        let f = QaFeature::build(SPECIALS, &[20, 21], &context(), 1..3, 12);
        assert_eq!(f.input_ids,   vec![2, 20, 21, 3, 11, 12, 3, 0, 0, 0, 0, 0]);
        assert_eq!(f.segment_ids, vec![0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(f.real_len, 7);
        assert_eq!(f.context_start, 4);
        assert_eq!(f.context_offsets, vec![(4, 7), (8, 11)]);
        assert_eq!(f.context_len(), 2);
    }

    #[test]
    fn test_exact_fit_has_no_padding() {
        let f = QaFeature::build(SPECIALS, &[20], &context(), 0..4, 8);
        assert_eq!(f.real_len, 8);
        assert!(!f.input_ids.contains(&SPECIALS.pad));
    }

    #[test]
    fn test_encode_with_built_tokenizer() {
        let dir   = tempfile::tempdir().unwrap();
        let store = crate::infra::tokenizer_store::TokenizerStore::new(dir.path());
        store.build_and_save(&["Where did the game take place? At Levi's Stadium."], 100).unwrap();
        let tok = store.load().unwrap();

        let specials = SpecialTokens::from_tokenizer(&tok).unwrap();
        assert_eq!(specials, SpecialTokens { cls: 2, sep: 3, pad: 0 });

        let q = encode_question(&tok, "Where did the game take place?", 3).unwrap();
        assert_eq!(q.len(), 3);

        let content = "At Levi's Stadium.";
        let ctx = encode_context(&tok, content).unwrap();
        let pieces: Vec<String> = ctx
            .offsets
            .iter()
            .map(|&(s, e)| content.chars().skip(s).take(e - s).collect())
            .collect();
        assert_eq!(pieces, vec!["At", "Levi", "'", "s", "Stadium", "."]);
    }
}
