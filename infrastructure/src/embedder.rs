use domain::error::{CollaboratorError, CollaboratorResult};
use domain::models::{DocumentChunk, IndexedDocument};
use domain::ports::Embedder;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

const BATCH_SIZE: usize = 16;
const CONCURRENCY: usize = 8;

/// Embeds ingestion chunks through any `Embedder`, a batch at a time.
pub struct BatchEmbedder {
    embedder: Arc<dyn Embedder>,
}

impl BatchEmbedder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Output order matches input order.
    pub async fn embed_chunks(&self, chunks: &[DocumentChunk]) -> CollaboratorResult<Vec<IndexedDocument>> {
        let mut documents = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(BATCH_SIZE) {
            tracing::debug!(chunks = batch.len(), embedder = self.embedder.name(), "embedding batch");
            let embedded = self.embed_batch(batch).await?;
            documents.extend(embedded);
        }
        Ok(documents)
    }

    async fn embed_batch(&self, chunks: &[DocumentChunk]) -> CollaboratorResult<Vec<IndexedDocument>> {
        stream::iter(chunks)
            .map(|chunk| {
                let embedder = &self.embedder;
                async move {
                    let vector = embedder.embed(&chunk.content).await?;
                    Ok::<_, CollaboratorError>(IndexedDocument {
                        id: chunk.id.clone(),
                        source: chunk.source.clone(),
                        content: chunk.content.clone(),
                        vector,
                    })
                }
            })
            .buffered(CONCURRENCY)
            .try_collect()
            .await
    }
}
