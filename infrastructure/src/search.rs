use crate::embedding_storage::EmbeddingStorage;
use async_trait::async_trait;
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::models::{IndexedDocument, RetrievedDocument};
use domain::ports::{DocumentIndex, DocumentSearch};
use std::sync::Arc;

pub struct SearchEngine;

impl SearchEngine {
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }

    /// Top `top_k` documents by cosine similarity, best first. Ties keep
    /// storage order.
    pub fn find_relevant(
        query_embedding: &[f32],
        documents: &[IndexedDocument],
        top_k: usize,
    ) -> Vec<RetrievedDocument> {
        let mut similarities: Vec<(f32, &IndexedDocument)> = documents
            .iter()
            .map(|doc| (Self::cosine_similarity(query_embedding, &doc.vector), doc))
            .collect();

        similarities.sort_by(|a, b| b.0.total_cmp(&a.0));
        similarities
            .into_iter()
            .take(top_k)
            .map(|(_, doc)| RetrievedDocument::new(doc.content.clone(), doc.source.clone()))
            .collect()
    }
}

/// Brute-force vector index over the local SQLite store.
#[derive(Clone)]
pub struct LocalVectorIndex {
    storage: Arc<EmbeddingStorage>,
}

impl LocalVectorIndex {
    pub fn new(storage: Arc<EmbeddingStorage>) -> Self {
        Self { storage }
    }

    async fn blocking<T, F>(&self, op: F) -> CollaboratorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&EmbeddingStorage) -> shared::types::Result<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || op(storage.as_ref()))
            .await
            .map_err(|e| CollaboratorError::Storage(e.to_string()))?
            .map_err(|e| CollaboratorError::Storage(format!("{e:#}")))
    }
}

#[async_trait]
impl DocumentSearch for LocalVectorIndex {
    async fn query(
        &self,
        vector: &[f32],
        _text: Option<&str>,
        k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDocument>> {
        let query = vector.to_vec();
        self.blocking(move |storage| {
            let documents = storage.get_all_documents()?;
            Ok(SearchEngine::find_relevant(&query, &documents, k))
        })
        .await
    }

    fn name(&self) -> &str {
        "local-sqlite"
    }
}

#[async_trait]
impl DocumentIndex for LocalVectorIndex {
    async fn prepare(&self, recreate: bool) -> CollaboratorResult<()> {
        if recreate {
            self.blocking(|storage| storage.clear()).await?;
        }
        Ok(())
    }

    async fn fingerprint(&self, source: &str) -> CollaboratorResult<Option<String>> {
        let source = source.to_string();
        self.blocking(move |storage| storage.get_source_hash(&source))
            .await
    }

    async fn replace_source(
        &self,
        source: &str,
        fingerprint: &str,
        documents: Vec<IndexedDocument>,
    ) -> CollaboratorResult<()> {
        let source = source.to_string();
        let fingerprint = fingerprint.to_string();
        self.blocking(move |storage| {
            storage.delete_documents_for_source(&source)?;
            storage.insert_documents(&documents)?;
            storage.upsert_source_hash(&source, &fingerprint)
        })
        .await
    }
}
