// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files on disk that other layers read or write:
//
//   checkpoint.rs      — Model artifact directory
//                        (manifest JSON + Burn weights)
//
//   tokenizer_store.rs — tokenizer.json: load, or build a
//                        word-level one for scaffolded models
//
//   report.rs          — CSV output for `verify --report`
//
// Everything here returns anyhow::Result with context naming
// the file involved; engines convert failures into
// EngineError::Unavailable at their boundary.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model artifact directory (manifest + weights)
pub mod checkpoint;

/// Tokenizer loading and building
pub mod tokenizer_store;

/// CSV report writer
pub mod report;
