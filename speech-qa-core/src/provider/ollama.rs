//! Ollama provider implementation.
//!
//! This module provides an Ollama HTTP API client that implements the Provider trait.

use super::types::*;
use async_trait::async_trait;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider talking to `base_url`
    /// (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turns a non-success response into the matching [`ProviderError`].
    async fn error_from(response: reqwest::Response, model: &str) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OllamaErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND && message.contains("not found") {
            ProviderError::ModelNotFound(model.to_string())
        } else {
            ProviderError::Api(format!("{}: {}", status, message))
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat<'a>(
        &'a self,
        request: ChatRequest,
        mut callback: Box<dyn FnMut(ChatResponse) + Send + 'a>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.base_url);

        // Convert to Ollama-specific request format
        let ollama_request = OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            options: {
                let mut opts = HashMap::new();
                opts.insert("temperature".to_string(), serde_json::json!(request.temperature));
                Some(opts)
            },
            stream: true,
        };

        let response = self.http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, &request.model).await);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();
                handle_chat_line(&line[..line.len() - 1], &mut callback)?;
            }
        }

        // Last line may arrive without a trailing newline
        if !buffer.is_empty() {
            handle_chat_line(&buffer, &mut callback)?;
        }

        Ok(())
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text], model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No embeddings returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        let embed_request = EmbedRequest {
            model: model.to_string(),
            input: texts.iter().map(|t| t.to_string()).collect(),
        };

        let response = self.http_client
            .post(&url)
            .json(&embed_request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, model).await);
        }

        let embed_response = response.json::<EmbedResponse>().await?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(ProviderError::Other(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }

    /// Checks `/api/show` and pulls the model if the server does not have it.
    async fn ensure_model(&self, model: &str) -> Result<()> {
        let response = self.http_client
            .post(format!("{}/api/show", self.base_url))
            .json(&OllamaModelRequest { model: model.to_string(), stream: None })
            .send()
            .await?;

        if response.status().is_success() {
            debug!(model, "Model already available");
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(Self::error_from(response, model).await);
        }

        info!(model, "Model not present on the server, pulling it (first run only)");
        let response = self.http_client
            .post(format!("{}/api/pull", self.base_url))
            .json(&OllamaModelRequest { model: model.to_string(), stream: Some(false) })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, model).await);
        }

        let status = response.json::<OllamaPullStatus>().await?;
        if status.status != "success" {
            return Err(ProviderError::Api(format!("Pulling '{}' ended with '{}'", model, status.status)));
        }

        info!(model, "Model pulled");
        Ok(())
    }
}

/// Parses one NDJSON line of a streamed chat response and forwards it.
fn handle_chat_line(line: &[u8], callback: &mut dyn FnMut(ChatResponse)) -> Result<()> {
    let line_str = String::from_utf8_lossy(line);
    let line_str = line_str.trim();
    if line_str.is_empty() {
        return Ok(());
    }

    let chunk: OllamaChatChunk = serde_json::from_str(line_str)?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Api(error));
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    callback(ChatResponse {
        model: chunk.model,
        content,
        done: chunk.done,
    });
    Ok(())
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<String, serde_json::Value>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: Role,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaModelRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaPullStatus {
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_batch_sends_all_inputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({ "model": "all-minilm", "input": ["a", "b"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "all-minilm",
                "embeddings": [[1.0, 0.0], [0.0, 1.0]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        let embeddings = provider.embed_batch(&["a", "b"], "all-minilm").await.unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [] })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        let result = provider.embed("hello", "all-minilm").await;
        assert!(matches!(result, Err(ProviderError::Other(_))));
    }

    #[tokio::test]
    async fn test_chat_streams_chunks_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"model\":\"mistral\",\"message\":{\"role\":\"assistant\",\"content\":\"Equal\"},\"done\":false}\n",
            "{\"model\":\"mistral\",\"message\":{\"role\":\"assistant\",\"content\":\"ity.\"},\"done\":false}\n",
            "{\"model\":\"mistral\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}"
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "options": { "temperature": 0.2 }, "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        let request = ChatRequest::new("mistral", vec![Message::user("hi")]).with_temperature(0.2);

        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        provider
            .chat(request, Box::new(move |r: ChatResponse| sink.lock().unwrap().push((r.content, r.done))))
            .await
            .unwrap();

        let collected = collected.lock().unwrap();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].0, "Equal");
        assert_eq!(collected[1].0, "ity.");
        assert!(collected[2].1);
    }

    #[tokio::test]
    async fn test_chat_unknown_model_maps_to_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "model \"nope\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        let request = ChatRequest::new("nope", vec![Message::user("hi")]);
        let result = provider.chat(request, Box::new(|_| {})).await;
        assert!(matches!(result, Err(ProviderError::ModelNotFound(m)) if m == "nope"));
    }

    #[tokio::test]
    async fn test_chat_error_line_mid_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\":\"out of memory\"}\n"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        let request = ChatRequest::new("mistral", vec![Message::user("hi")]);
        let result = provider.chat(request, Box::new(|_| {})).await;
        assert!(matches!(result, Err(ProviderError::Api(e)) if e == "out of memory"));
    }

    #[tokio::test]
    async fn test_ensure_model_skips_pull_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "details": {} })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        provider.ensure_model("all-minilm").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_model_pulls_missing_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "model 'all-minilm' not found"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_partial_json(json!({ "model": "all-minilm", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri());
        provider.ensure_model("all-minilm").await.unwrap();
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let provider = OllamaProvider::new("http://localhost:11434/");
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }
}
