use crate::config::AzureSearchConfig;
use crate::http::{ensure_success, join_url, read_json, transport_error};
use async_trait::async_trait;
use domain::error::CollaboratorResult;
use domain::models::{IndexedDocument, RetrievedDocument};
use domain::ports::{DocumentIndex, DocumentSearch};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const UPLOAD_BATCH_SIZE: usize = 100;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    select: &'a str,
    top: usize,
    vector_queries: [VectorQuery<'a>; 1],
}

#[derive(Serialize)]
struct VectorQuery<'a> {
    kind: &'static str,
    vector: &'a [f32],
    k: usize,
    fields: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
struct UploadDocument<'a> {
    #[serde(rename = "@search.action")]
    action: &'static str,
    id: &'a str,
    source: &'a str,
    content: &'a str,
    #[serde(flatten)]
    vector: serde_json::Map<String, serde_json::Value>,
}

/// Azure AI Search REST client: hybrid vector queries and document upload.
#[derive(Clone)]
pub struct AzureSearchClient {
    client: Arc<Client>,
    config: AzureSearchConfig,
}

impl AzureSearchClient {
    pub fn new(client: Arc<Client>, config: AzureSearchConfig) -> Self {
        Self { client, config }
    }

    fn index_url(&self, suffix: &str) -> String {
        let path = format!(
            "indexes/{}{}?api-version={}",
            self.config.index_name, suffix, self.config.api_version
        );
        join_url(&self.config.endpoint, &path)
    }

    fn index_definition(&self) -> serde_json::Value {
        json!({
            "name": self.config.index_name,
            "fields": [
                { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
                { "name": "source", "type": "Edm.String", "searchable": true, "filterable": true, "sortable": true },
                { "name": "content", "type": "Edm.String", "searchable": true },
                {
                    "name": self.config.vector_field,
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": self.config.dimensions,
                    "vectorSearchProfile": "default-hnsw-profile"
                }
            ],
            "vectorSearch": {
                "algorithms": [{ "name": "default-hnsw", "kind": "hnsw" }],
                "profiles": [{ "name": "default-hnsw-profile", "algorithm": "default-hnsw" }]
            }
        })
    }

    async fn delete_index(&self) -> CollaboratorResult<()> {
        let response = self
            .client
            .delete(self.index_url(""))
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn upload(&self, documents: &[IndexedDocument]) -> CollaboratorResult<()> {
        for batch in documents.chunks(UPLOAD_BATCH_SIZE) {
            let value: Vec<UploadDocument<'_>> = batch
                .iter()
                .map(|doc| {
                    let mut vector = serde_json::Map::new();
                    vector.insert(self.config.vector_field.clone(), json!(doc.vector));
                    UploadDocument {
                        action: "mergeOrUpload",
                        id: &doc.id,
                        source: &doc.source,
                        content: &doc.content,
                        vector,
                    }
                })
                .collect();
            let response = self
                .client
                .post(self.index_url("/docs/index"))
                .header("api-key", &self.config.api_key)
                .json(&json!({ "value": value }))
                .send()
                .await
                .map_err(transport_error)?;
            ensure_success(response).await?;
            tracing::debug!(count = batch.len(), "uploaded batch to search index");
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSearch for AzureSearchClient {
    async fn query(
        &self,
        vector: &[f32],
        text: Option<&str>,
        k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDocument>> {
        let request = SearchRequest {
            search: text,
            select: "content,source",
            top: k,
            vector_queries: [VectorQuery {
                kind: "vector",
                vector,
                k,
                fields: &self.config.vector_field,
            }],
        };
        let response = self
            .client
            .post(self.index_url("/docs/search"))
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let body: SearchResponse = read_json(response).await?;
        Ok(body
            .value
            .into_iter()
            .take(k)
            .map(|hit| RetrievedDocument {
                content: hit.content.unwrap_or_default(),
                source: hit.source.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "azure-search"
    }
}

#[async_trait]
impl DocumentIndex for AzureSearchClient {
    async fn prepare(&self, recreate: bool) -> CollaboratorResult<()> {
        if recreate {
            tracing::info!(index = %self.config.index_name, "deleting search index before recreate");
            self.delete_index().await?;
        }
        let response = self
            .client
            .put(self.index_url(""))
            .header("api-key", &self.config.api_key)
            .json(&self.index_definition())
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fingerprint(&self, _source: &str) -> CollaboratorResult<Option<String>> {
        // Fingerprints are not stored in the remote index; every ingest re-uploads.
        Ok(None)
    }

    async fn replace_source(
        &self,
        _source: &str,
        _fingerprint: &str,
        documents: Vec<IndexedDocument>,
    ) -> CollaboratorResult<()> {
        self.upload(&documents).await
    }
}
