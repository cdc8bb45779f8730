// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands and all their configurable flags:
//
//   list      — passages in the dataset
//   ask       — one question over one passage
//   session   — interactive questions over one passage
//   verify    — dual-path equivalence check
//   scaffold  — write a demo model artifact
//   import    — model artifact from a pretrained BERT-SQuAD checkpoint
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::controller::InFlightPolicy;
use crate::application::equivalence::DEFAULT_ENTRIES;
use crate::application::import_use_case::ImportConfig;
use crate::application::scaffold_use_case::ScaffoldConfig;
use crate::infra::checkpoint::AnswerOptions;
use crate::ml::EngineKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List dataset passages with their question counts
    List,

    /// Answer one question over a passage
    Ask(AskArgs),

    /// Ask questions interactively over one passage
    Session(SessionArgs),

    /// Check that both engines agree on the top answer
    Verify(VerifyArgs),

    /// Write a randomly initialised model artifact for demos
    Scaffold(ScaffoldArgs),

    /// Convert a HuggingFace BERT-SQuAD checkpoint into a model artifact
    Import(ImportArgs),
}

// ─── Shared value types ───────────────────────────────────────────────────────
/// Which engine answers the question
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// One truncated window, one forward pass
    Interpreter,
    /// Overlapping windows over the whole passage
    Task,
}

impl From<Backend> for EngineKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Interpreter => EngineKind::Interpreter,
            Backend::Task        => EngineKind::Task,
        }
    }
}

/// What to do with a running question when a new one arrives
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Let it finish and discard the result
    Finish,
    /// Cancel it
    Abandon,
}

impl From<Policy> for InFlightPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Finish  => InFlightPolicy::Finish,
            Policy::Abandon => InFlightPolicy::Abandon,
        }
    }
}

// ─── ask ──────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The natural language question to answer
    #[arg(long, short)]
    pub question: String,

    /// Dataset entry to ask about
    #[arg(long, short, conflicts_with = "passage_file")]
    pub index: Option<usize>,

    /// Plain text file to use as the passage instead of a dataset entry
    #[arg(long)]
    pub passage_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Backend::Interpreter)]
    pub backend: Backend,

    /// Seconds to wait for the answer
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
}

// ─── session ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Dataset entry to ask about
    #[arg(long, short, default_value_t = 0)]
    pub index: usize,

    #[arg(long, value_enum, default_value_t = Backend::Interpreter)]
    pub backend: Backend,

    #[arg(long, value_enum, default_value_t = Policy::Finish)]
    pub in_flight: Policy,

    /// Seconds to wait for each answer
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
}

// ─── verify ───────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Number of leading dataset entries to compare
    #[arg(long, default_value_t = DEFAULT_ENTRIES)]
    pub entries: usize,

    /// Also require the pinned Super Bowl 50 answer (pretrained SQuAD models only)
    #[arg(long)]
    pub canonical: bool,

    /// Write per-entry outcomes to this CSV file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

// ─── scaffold ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ScaffoldArgs {
    /// Directory to write the artifact into
    #[arg(long, default_value = "model")]
    pub out: PathBuf,

    /// Upper bound on the tokenizer vocabulary
    #[arg(long, default_value_t = 8000)]
    pub max_vocab: usize,

    /// Maximum tokens per input sequence
    /// Format: [CLS] question [SEP] context [SEP] + padding
    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,

    /// Hidden dimension of the encoder
    #[arg(long, default_value_t = 64)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 128)]
    pub d_ff: usize,

    /// Question tokens kept before truncation
    #[arg(long, default_value_t = 64)]
    pub max_query_len: usize,

    /// Context tokens shared by adjacent windows
    /// [default: half the context window, at most 64]
    #[arg(long)]
    pub doc_overlap: Option<usize>,
}

// ─── import ───────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Directory with config.json, model.safetensors and tokenizer.json
    #[arg(long)]
    pub from: PathBuf,

    /// Directory to write the artifact into
    #[arg(long, default_value = "model")]
    pub out: PathBuf,

    /// Tokens per input sequence, at most the checkpoint's position table
    #[arg(long, default_value_t = 384)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 64)]
    pub max_query_len: usize,

    /// [default: half the context window, at most 64]
    #[arg(long)]
    pub doc_overlap: Option<usize>,

    /// Longest answer span, in tokens
    #[arg(long, default_value_t = 32)]
    pub max_answer_len: usize,
}

impl From<ImportArgs> for ImportConfig {
    fn from(a: ImportArgs) -> Self {
        ImportConfig {
            source:      a.from,
            out_dir:     a.out,
            max_seq_len: a.max_seq_len,
            answer: AnswerOptions {
                max_query_len:  a.max_query_len,
                doc_overlap:    a.doc_overlap,
                max_answer_len: a.max_answer_len,
                ..AnswerOptions::default()
            },
        }
    }
}

/// The application layer never sees clap types.
impl From<ScaffoldArgs> for ScaffoldConfig {
    fn from(a: ScaffoldArgs) -> Self {
        ScaffoldConfig {
            out_dir:     a.out,
            max_vocab:   a.max_vocab,
            max_seq_len: a.max_seq_len,
            d_model:     a.d_model,
            num_heads:   a.num_heads,
            num_layers:  a.num_layers,
            d_ff:        a.d_ff,
            answer: AnswerOptions {
                max_query_len: a.max_query_len,
                doc_overlap:   a.doc_overlap,
                ..AnswerOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ask_defaults() {
        let cli = Cli::try_parse_from(["bertqa", "ask", "-q", "Who won"]).unwrap();
        let Commands::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "Who won");
        assert_eq!(args.index, None);
        assert_eq!(EngineKind::from(args.backend), EngineKind::Interpreter);
    }

    #[test]
    fn test_index_conflicts_with_passage_file() {
        let parsed = Cli::try_parse_from([
            "bertqa", "ask", "-q", "Who?", "--index", "1", "--passage-file", "p.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_session_policy_converts() {
        let cli = Cli::try_parse_from([
            "bertqa", "session", "--backend", "task", "--in-flight", "abandon",
        ])
        .unwrap();
        let Commands::Session(args) = cli.command else {
            panic!("expected session");
        };
        assert_eq!(EngineKind::from(args.backend), EngineKind::Task);
        assert_eq!(InFlightPolicy::from(args.in_flight), InFlightPolicy::Abandon);
    }

    #[test]
    fn test_scaffold_args_become_config() {
        let cli = Cli::try_parse_from([
            "bertqa", "scaffold", "--out", "demo", "--doc-overlap", "16",
        ])
        .unwrap();
        let Commands::Scaffold(args) = cli.command else {
            panic!("expected scaffold");
        };
        let config = ScaffoldConfig::from(args);
        assert_eq!(config.out_dir, PathBuf::from("demo"));
        assert_eq!(config.answer.doc_overlap, Some(16));
        assert_eq!(config.answer.top_k, AnswerOptions::default().top_k);
    }

    #[test]
    fn test_import_args_become_config() {
        let cli = Cli::try_parse_from(["bertqa", "import", "--from", "hf/bert-squad"]).unwrap();
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        let config = ImportConfig::from(args);
        assert_eq!(config.source, PathBuf::from("hf/bert-squad"));
        assert_eq!(config.out_dir, PathBuf::from("model"));
        assert_eq!(config.max_seq_len, 384);
        assert_eq!(config.answer.doc_overlap, None);
        assert_eq!(config.answer.max_query_len, 64);
    }
}
