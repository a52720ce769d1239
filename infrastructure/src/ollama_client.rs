use crate::config::OllamaConfig;
use crate::http::{ensure_success, join_url, read_json, transport_error};
use async_trait::async_trait;
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::ports::{ChatCompleter, Embedder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
    done: bool,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OllamaClient {
    pub fn new(client: Arc<Client>, config: &OllamaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        let url = join_url(&self.base_url, "api/embeddings");
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let embedding_response: EmbeddingResponse = read_json(response).await?;
        if embedding_response.embedding.is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(embedding_response.embedding)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[async_trait]
impl ChatCompleter for OllamaClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> CollaboratorResult<String> {
        let url = join_url(&self.base_url, "api/chat");
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions {
                num_predict: max_tokens,
                temperature,
            },
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let text = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        // Some Ollama builds stream NDJSON even with stream=false.
        let mut full_content = String::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatResponse>(line) {
                Ok(chat_resp) => {
                    full_content.push_str(&chat_resp.message.content);
                    if chat_resp.done {
                        break;
                    }
                }
                Err(e) => tracing::debug!(error = %e, "skipping undecodable chat line"),
            }
        }
        if full_content.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(full_content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::shared_client;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(url: &str) -> OllamaClient {
        let config = OllamaConfig {
            base_url: url.to_string(),
            chat_model: "qwen".to_string(),
            embedding_model: "nomic".to_string(),
        };
        OllamaClient::new(shared_client().unwrap(), &config)
    }

    #[tokio::test]
    async fn embeds_with_the_embedding_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(Matcher::Json(json!({ "model": "nomic", "prompt": "vpn" })))
            .with_body(json!({ "embedding": [0.5, 0.5] }).to_string())
            .create_async()
            .await;

        let vector = client_for(&server.url()).embed("vpn").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chat_concatenates_streamed_lines() {
        let mut server = mockito::Server::new_async().await;
        let body = [
            json!({ "message": { "role": "assistant", "content": "Open " }, "done": false }),
            json!({ "message": { "role": "assistant", "content": "Settings." }, "done": true }),
        ]
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n");
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "qwen",
                "stream": false,
                "options": { "num_predict": 200 }
            })))
            .with_body(body)
            .create_async()
            .await;

        let answer = client_for(&server.url())
            .complete("system", "user", 200, 0.1)
            .await
            .unwrap();
        assert_eq!(answer, "Open Settings.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_completion_is_a_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_body(json!({ "message": { "role": "assistant", "content": "  " }, "done": true }).to_string())
            .create_async()
            .await;

        let err = client_for(&server.url())
            .complete("system", "user", 10, 0.1)
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::EmptyResponse));
    }
}
