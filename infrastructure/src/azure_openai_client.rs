use crate::config::AzureOpenAiConfig;
use crate::http::{join_url, read_json, transport_error};
use async_trait::async_trait;
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::ports::{ChatCompleter, Embedder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Clone)]
struct Deployment {
    endpoint: String,
    api_key: String,
    name: String,
}

/// Azure OpenAI REST client covering the embedding and chat deployments.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    client: Arc<Client>,
    api_version: String,
    embedding: Deployment,
    chat: Deployment,
}

impl AzureOpenAiClient {
    pub fn new(client: Arc<Client>, config: &AzureOpenAiConfig) -> Self {
        let embedding = Deployment {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            name: config.embedding_deployment.clone(),
        };
        let chat = Deployment {
            endpoint: config
                .chat_endpoint
                .clone()
                .unwrap_or_else(|| config.endpoint.clone()),
            api_key: config
                .chat_api_key
                .clone()
                .unwrap_or_else(|| config.api_key.clone()),
            name: config.chat_deployment.clone(),
        };
        Self {
            client,
            api_version: config.api_version.clone(),
            embedding,
            chat,
        }
    }

    fn deployment_url(&self, deployment: &Deployment, operation: &str) -> String {
        let path = format!(
            "openai/deployments/{}/{}?api-version={}",
            deployment.name, operation, self.api_version
        );
        join_url(&deployment.endpoint, &path)
    }
}

#[async_trait]
impl Embedder for AzureOpenAiClient {
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        let url = self.deployment_url(&self.embedding, "embeddings");
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.embedding.api_key)
            .json(&EmbeddingRequest { input: [text] })
            .send()
            .await
            .map_err(transport_error)?;
        let body: EmbeddingResponse = read_json(response).await?;
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(CollaboratorError::EmptyResponse)?;
        if vector.is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}

#[async_trait]
impl ChatCompleter for AzureOpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> CollaboratorResult<String> {
        let url = self.deployment_url(&self.chat, "chat/completions");
        let request = ChatRequest {
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: Some(system_prompt.to_string()),
                },
                Message {
                    role: "user".to_string(),
                    content: Some(user_message.to_string()),
                },
            ],
            max_tokens,
            temperature,
        };
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.chat.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let body: ChatResponse = read_json(response).await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CollaboratorError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}
