//! Capability traits the application layer depends on. Adapters in
//! `infrastructure` implement them; tests substitute stubs.

use crate::error::CollaboratorResult;
use crate::models::{IndexedDocument, RetrievedDocument};
use async_trait::async_trait;

/// Text-to-vector embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>>;

    fn name(&self) -> &str;
}

/// Nearest-neighbour retrieval over a pre-built index.
///
/// `text` is the raw question for backends that support hybrid lexical and
/// vector ranking; it may be ignored. Results are in rank order and bounded
/// by `k`.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn query(
        &self,
        vector: &[f32],
        text: Option<&str>,
        k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDocument>>;

    fn name(&self) -> &str;
}

/// Single-turn instruction-following completion.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> CollaboratorResult<String>;

    fn name(&self) -> &str;
}

/// Write side of a search index, used by ingestion.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Make sure the index exists; drop and recreate it when `recreate` is set.
    async fn prepare(&self, recreate: bool) -> CollaboratorResult<()>;

    /// Fingerprint recorded for `source` by the last ingest, if tracked.
    async fn fingerprint(&self, source: &str) -> CollaboratorResult<Option<String>>;

    /// Replace every document of `source` with `documents`.
    async fn replace_source(
        &self,
        source: &str,
        fingerprint: &str,
        documents: Vec<IndexedDocument>,
    ) -> CollaboratorResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Named tool invocation, e.g. over an MCP subprocess.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call(&self, tool: &str, args: serde_json::Value) -> CollaboratorResult<String>;

    async fn list_tools(&self) -> CollaboratorResult<Vec<ToolDescriptor>>;
}
