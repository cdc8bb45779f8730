// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers. No model math and no printing
// here: engines come in as `dyn AnswerEngine`, results go out
// through the Presenter trait or as plain report values.
//
//   question.rs          — question normalisation
//   session.rs           — Idle / Pending / Answered
//   controller.rs        — single-slot worker, generations,
//                          presentation of the latest answer
//   equivalence.rs       — dual-path top-answer comparison
//   scaffold_use_case.rs — demo model artifact
//   import_use_case.rs   — artifact from a pretrained checkpoint
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

pub mod question;
pub mod session;

/// Request lifecycle between the view and the engine worker
pub mod controller;

/// Both engines must agree on the top answer
pub mod equivalence;

/// Writes a loadable, untrained model artifact
pub mod scaffold_use_case;

/// Pretrained BERT-SQuAD checkpoint → model artifact
pub mod import_use_case;
