//! medley-rag — Retrieval-augmented question answering over uploaded text.
//! Provides:
//!   - Overlapping character-window chunking
//!   - Pluggable embedders (local feature hashing or a remote endpoint)
//!   - A flat inner-product index over normalised vectors
//!   - `/upload`, `/ask` and `/status` routes

pub mod chunker;
pub mod embed;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod index;
pub mod router;

pub use embed::{Embedder, HashingEmbedder, LlmEmbedder};
pub use engine::{RagEngine, RagStatus};
pub use error::RagError;
pub use router::build_router;
