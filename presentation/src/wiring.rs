//! Composition root: turns a `Config` into ready-to-use services.

use anyhow::Context;
use application::answer_orchestrator::{AnswerOptions, AnswerOrchestrator};
use application::ingest_service::IngestService;
use application::tool_service::ToolService;
use domain::ports::{ChatCompleter, DocumentIndex, DocumentSearch, Embedder};
use infrastructure::azure_openai_client::AzureOpenAiClient;
use infrastructure::azure_search_client::AzureSearchClient;
use infrastructure::config::{Config, Provider, WikiConfig};
use infrastructure::embedding_storage::EmbeddingStorage;
use infrastructure::http::shared_client;
use infrastructure::mcp_client::StdioToolExecutor;
use infrastructure::ollama_client::OllamaClient;
use infrastructure::search::LocalVectorIndex;
use infrastructure::wiki_source::WikiSource;
use reqwest::Client;
use shared::types::Result;
use std::sync::Arc;

pub struct Services {
    pub orchestrator: AnswerOrchestrator,
    pub ingest: IngestService,
    pub tools: ToolService,
    /// Human label for the index `ingest --recreate` drops.
    pub index_label: String,
    tool_bridge: Arc<StdioToolExecutor>,
    client: Arc<Client>,
    wiki: WikiConfig,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = shared_client().context("Failed to build HTTP client")?;

        let (embedder, completer, search, index): (
            Arc<dyn Embedder>,
            Arc<dyn ChatCompleter>,
            Arc<dyn DocumentSearch>,
            Arc<dyn DocumentIndex>,
        ) = match config.provider {
            Provider::Azure => {
                let openai = Arc::new(AzureOpenAiClient::new(client.clone(), &config.azure_openai));
                let search = Arc::new(AzureSearchClient::new(client.clone(), config.azure_search.clone()));
                (openai.clone(), openai, search.clone(), search)
            }
            Provider::Ollama => {
                let ollama = Arc::new(OllamaClient::new(client.clone(), &config.ollama));
                let storage = EmbeddingStorage::new(&config.db_path).with_context(|| {
                    format!("Failed to open index at {}", config.db_path.display())
                })?;
                let local = Arc::new(LocalVectorIndex::new(Arc::new(storage)));
                (ollama.clone(), ollama, local.clone(), local)
            }
        };
        tracing::info!(
            provider = ?config.provider,
            embedder = embedder.name(),
            search = search.name(),
            completer = completer.name(),
            "services wired"
        );

        let index_label = match config.provider {
            Provider::Azure => format!("search index '{}'", config.azure_search.index_name),
            Provider::Ollama => format!("local index {}", config.db_path.display()),
        };
        let tool_bridge = Arc::new(StdioToolExecutor::new(config.mcp.clone()));
        Ok(Self {
            orchestrator: AnswerOrchestrator::new(
                embedder.clone(),
                search,
                completer,
                AnswerOptions::from(&config.retrieval),
            ),
            ingest: IngestService::new(embedder, index),
            tools: ToolService::new(tool_bridge.clone()),
            index_label,
            tool_bridge,
            client,
            wiki: config.wiki.clone(),
        })
    }

    /// The configured Azure DevOps Wiki; fails when its settings are missing.
    pub fn wiki_source(&self) -> Result<WikiSource> {
        self.wiki.validate()?;
        Ok(WikiSource::new(self.client.clone(), self.wiki.clone()))
    }

    /// Stop the tool subprocess if it was started.
    pub async fn shutdown(&self) {
        self.tool_bridge.shutdown().await;
    }
}
