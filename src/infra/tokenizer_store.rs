// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the tokenizer that ships with a model artifact (a
// pretrained WordPiece tokenizer.json for imported models), and
// builds a word-level one for demo artifacts (`scaffold`).
//
// The built tokenizer is a HuggingFace tokenizer JSON:
//   normalizer    — BertNormalizer (lowercase, strip accents, clean text)
//   pre-tokenizer — Whitespace (\w+ | [^\w\s]+)
//   model         — WordLevel over the corpus vocabulary
//
// Special tokens take the first ids:
//   [PAD]=0  [UNK]=1  [CLS]=2  [SEP]=3  [MASK]=4
//
// Reference: HuggingFace tokenizers documentation

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::{
    models::wordlevel::WordLevel,
    normalizers::BertNormalizer,
    pre_tokenizers::whitespace::Whitespace,
    AddedToken, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer,
    Tokenizer,
};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the tokenizer JSON from the artifact directory.
    ///
    /// Truncation and padding are switched off: features lay out
    /// and pad the sequence themselves.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        let mut tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Cannot reset truncation of '{}': {}", path.display(), e))?;
        tokenizer.with_padding(None);
        Ok(tokenizer)
    }

    /// Build a word-level vocabulary from `texts`, keep the
    /// `vocab_size - 5` most frequent words, and write the
    /// tokenizer JSON. Returns the number of ids in use.
    pub fn build_and_save(&self, texts: &[&str], vocab_size: usize) -> Result<usize> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let normalizer    = BertNormalizer::new(true, true, None, true);
        let pre_tokenizer = Whitespace;

        // ── Step 1: Word frequencies ─────────────────────────────────────────
        // Counted on the pipeline's own output, so every corpus
        // word encodes to an in-vocabulary id.
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in words(&normalizer, &pre_tokenizer, text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken alphabetically so the
        // same corpus always yields the same ids.
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

        // ── Step 2: Vocabulary ───────────────────────────────────────────────
        let mut vocab: HashMap<String, u32> = HashMap::new();
        for token in SPECIAL_TOKENS.iter().map(|t| t.to_string()).chain(words.into_iter().map(|(w, _)| w)) {
            let id = vocab.len() as u32;
            vocab.entry(token).or_insert(id);
        }
        let ids_in_use = vocab.len();

        // ── Step 3: Tokenizer ────────────────────────────────────────────────
        let model = WordLevel::builder()
            .vocab(vocab)
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| anyhow!("Cannot build word-level model: {e}"))?;

        let mut tokenizer = Tokenizer::new(model);
        tokenizer
            .with_normalizer(normalizer)
            .with_pre_tokenizer(pre_tokenizer);
        let specials: Vec<AddedToken> = SPECIAL_TOKENS
            .iter()
            .map(|t| AddedToken::from(*t, true))
            .collect();
        tokenizer.add_special_tokens(&specials);

        let tok_path = self.path();
        tokenizer
            .save(&tok_path, true)
            .map_err(|e| anyhow!("Cannot write '{}': {}", tok_path.display(), e))?;

        tracing::info!(
            "Tokenizer built with {} ids, saved to '{}'",
            ids_in_use,
            tok_path.display()
        );
        Ok(ids_in_use)
    }
}

/// Normalised words of `text`, split exactly as the saved
/// tokenizer will split them.
fn words(
    normalizer:    &BertNormalizer,
    pre_tokenizer: &Whitespace,
    text:          &str,
) -> Result<Vec<String>> {
    let mut pre = PreTokenizedString::from(text);
    pre.normalize(|n| normalizer.normalize(n))
        .map_err(|e| anyhow!("Cannot normalise text: {e}"))?;
    pre_tokenizer
        .pre_tokenize(&mut pre)
        .map_err(|e| anyhow!("Cannot split text: {e}"))?;
    Ok(pre
        .get_splits(OffsetReferential::Normalized, OffsetType::Char)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(text: &str) -> Vec<String> {
        words(&BertNormalizer::new(true, true, None, true), &Whitespace, text).unwrap()
    }

    #[test]
    fn test_words_split_punctuation_and_lowercase() {
        assert_eq!(
            split("Levi's Stadium, (NFL) 24\u{2013}10."),
            vec!["levi", "'", "s", "stadium", ",", "(", "nfl", ")", "24", "\u{2013}", "10", "."]
        );
        assert!(split("   ").is_empty());
    }

    #[test]
    fn test_accented_words_stay_in_vocabulary() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.build_and_save(&["Beyoncé sang at the café"], 100).unwrap();

        let tok = store.load().unwrap();
        let enc = tok.encode("Beyoncé sang at the café", false).unwrap();
        assert_eq!(enc.get_tokens(), &["beyonce", "sang", "at", "the", "cafe"]);
    }

    #[test]
    fn test_build_and_load_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let ids   = store.build_and_save(&["The game was played at Levi's Stadium."], 100).unwrap();
        assert!(ids > SPECIAL_TOKENS.len());

        let tok = store.load().unwrap();
        assert_eq!(tok.token_to_id("[PAD]"), Some(0));
        assert_eq!(tok.token_to_id("[CLS]"), Some(2));
        assert_eq!(tok.token_to_id("[SEP]"), Some(3));

        let enc = tok.encode("Levi's stadium", false).unwrap();
        let unk = tok.token_to_id("[UNK]").unwrap();
        assert!(enc.get_ids().iter().all(|&id| id != unk));
    }

    #[test]
    fn test_vocab_is_capped() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let ids   = store.build_and_save(&["a b c d e f g h i j"], 8).unwrap();
        assert_eq!(ids, 8);
    }

    #[test]
    fn test_missing_tokenizer_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load().is_err());
    }
}
