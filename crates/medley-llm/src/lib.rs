//! medley-llm — LLM backend abstraction layer.
//! One trait for chat completions and embeddings, one implementation for any
//! OpenAI-compatible endpoint (Groq, OpenAI, Ollama's /v1, vLLM, ...).

pub mod backend;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OpenAiCompatibleBackend, Role};
