// ============================================================
// Layer 4 — Data
// ============================================================
// Everything between resources on disk and the engines:
//
//   loader.rs        — JsonDataset: passages, titles, questions
//   preprocessor.rs  — cleans passage text read from plain files
//   chunker.rs       — overlapping token windows for long passages
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Loads the dataset bundle (bundled or from disk)
pub mod loader;

/// Cleans and normalises raw passage text
pub mod preprocessor;

/// Splits long token runs into overlapping windows
pub mod chunker;
