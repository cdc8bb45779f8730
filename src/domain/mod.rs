// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// system works with: passages, answer candidates, queries,
// and the two seams the rest of the crate programs against
// (AnswerEngine and DatasetProvider).
//
// Rules for this layer:
//   - NO Burn or tokenizers types
//   - NO file I/O
//   - NO threads
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A titled passage with its suggested questions
pub mod passage;

// AnswerCandidate, AnswerSet, QueryRequest, Highlight
pub mod answer;

// Error taxonomy shared by engines, dataset and controller
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;
