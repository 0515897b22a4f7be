//! Upload store, index lifecycle and answer generation.

use std::path::Path;
use std::sync::Arc;

use medley_config::{EmbedderKind, LlmConfig, RagConfig};
use medley_llm::{LlmBackend, LlmError, LlmRequest, Message, OpenAiCompatibleBackend};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::embed::{Embedder, HashingEmbedder, LlmEmbedder};
use crate::error::RagError;
use crate::index::FlatIpIndex;

pub const INVALID_REQUEST: &str = "Invalid request.";
pub const EMPTY_QUESTION: &str = "Type a question.";
pub const NO_INDEX: &str = "Upload TXT files first.";
pub const NOT_FOUND: &str = "Not found in document.";

const SYSTEM_PROMPT: &str = "You are a strict RAG assistant.";

fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Use ONLY the context below to answer the question.\n\
         If the answer is not present, say: {NOT_FOUND}\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}"
    )
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RagStatus {
    pub files: usize,
    pub chunks: usize,
    pub indexed: bool,
}

#[derive(Default)]
struct Corpus {
    chunks: Vec<String>,
    index: Option<FlatIpIndex>,
}

pub struct RagEngine {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmBackend>,
    corpus: RwLock<Corpus>,
    rebuilding: Mutex<()>,
}

impl RagEngine {
    pub fn new(config: RagConfig, embedder: Arc<dyn Embedder>, llm: Arc<dyn LlmBackend>) -> Self {
        Self {
            config,
            embedder,
            llm,
            corpus: RwLock::new(Corpus::default()),
            rebuilding: Mutex::new(()),
        }
    }

    /// Wire up the OpenAI-compatible backend and the configured embedder.
    pub fn from_config(config: RagConfig, llm: &LlmConfig) -> Self {
        let mut backend = OpenAiCompatibleBackend::new(&llm.base_url, &llm.model, llm.api_key());
        if let Some(model) = &config.embedding_model {
            backend = backend.with_embedding_model(model);
        }
        let backend: Arc<dyn LlmBackend> = Arc::new(backend);
        let embedder: Arc<dyn Embedder> = match config.embedder {
            EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.embedding_dim)),
            EmbedderKind::Remote => Arc::new(LlmEmbedder::new(backend.clone())),
        };
        Self::new(config, embedder, backend)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig {
            size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
            min_chars: self.config.min_chunk_chars,
        }
    }

    /// Persist one uploaded file. Returns the stored name, or `None` when the
    /// file is not a `.txt` upload.
    pub async fn save_upload(&self, filename: &str, contents: &[u8]) -> Result<Option<String>, RagError> {
        let Some(name) = sanitize_filename(filename) else {
            warn!(filename, "upload skipped");
            return Ok(None);
        };
        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        tokio::fs::write(self.config.upload_dir.join(&name), contents).await?;
        info!(file = %name, bytes = contents.len(), "upload saved");
        Ok(Some(name))
    }

    /// Re-read every `.txt` upload, re-chunk, re-embed and swap in a fresh
    /// index. An empty corpus leaves no index.
    pub async fn rebuild(&self) -> Result<(), RagError> {
        let _guard = self.rebuilding.lock().await;

        let text = self.read_corpus().await?;
        let chunks = if text.trim().is_empty() { Vec::new() } else { chunk_text(&text, &self.chunker()) };

        let index = if chunks.is_empty() {
            None
        } else {
            let vectors = self.embedder.embed(&chunks).await?;
            let dim = vectors.first().map(Vec::len).unwrap_or(0);
            let mut index = FlatIpIndex::new(dim);
            index.add(vectors)?;
            Some(index)
        };

        info!(chunks = chunks.len(), indexed = index.is_some(), embedder = self.embedder.name(), "vector index rebuilt");
        *self.corpus.write().await = Corpus { chunks, index };
        Ok(())
    }

    async fn read_corpus(&self) -> Result<String, RagError> {
        let mut names = Vec::new();
        match tokio::fs::read_dir(&self.config.upload_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.ends_with(".txt") && entry.file_type().await?.is_file() {
                        names.push(name);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        }
        names.sort();

        let mut text = String::new();
        for name in names {
            let bytes = tokio::fs::read(self.config.upload_dir.join(&name)).await?;
            text.push_str(&String::from_utf8_lossy(&bytes));
            text.push('\n');
        }
        Ok(text)
    }

    /// Top-k chunks for `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>, RagError> {
        if self.corpus.read().await.index.is_none() {
            return Ok(Vec::new());
        }
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let Some(query_vec) = vectors.pop() else {
            return Ok(Vec::new());
        };

        let corpus = self.corpus.read().await;
        let Some(index) = &corpus.index else {
            return Ok(Vec::new());
        };
        let hits = index.search(&query_vec, self.config.top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| corpus.chunks.get(hit.id).cloned())
            .collect())
    }

    pub async fn is_indexed(&self) -> bool {
        self.corpus.read().await.index.is_some()
    }

    /// Answer text for `question`. Backend HTTP failures become an answer
    /// string; transport failures are errors.
    pub async fn ask(&self, question: &str) -> Result<String, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(EMPTY_QUESTION.to_string());
        }
        if !self.is_indexed().await {
            return Ok(NO_INDEX.to_string());
        }

        let docs = self.retrieve(question).await?;
        if docs.is_empty() {
            return Ok(NOT_FOUND.to_string());
        }
        let context = docs.join("\n");

        let request = LlmRequest {
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(&context, question))],
            model: None,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };
        match self.llm.complete(request).await {
            Ok(response) => Ok(response.content.trim().to_string()),
            Err(LlmError::ApiError { status, message }) => {
                warn!(status, %message, "completion rejected");
                Ok(format!("LLM API Error: {status}"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of entries in the upload directory and the live index size.
    pub async fn status(&self) -> RagStatus {
        let files = count_entries(&self.config.upload_dir).await;
        let corpus = self.corpus.read().await;
        RagStatus { files, chunks: corpus.chunks.len(), indexed: corpus.index.is_some() }
    }
}

async fn count_entries(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}

/// Final path component with spaces replaced by underscores. Only `.txt`
/// names are accepted.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = base.replace(' ', "_");
    if !name.ends_with(".txt") || name == ".txt" || name.starts_with("..") {
        return None;
    }
    Some(name)
}
