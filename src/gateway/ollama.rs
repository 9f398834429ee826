//! Ollama-compatible HTTP gateway client.
//!
//! Talks to an Ollama server's `/api/generate` endpoint in both one-shot
//! and NDJSON-streaming modes, plus the `/api/tags` listing used for
//! availability checks before a harness run.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

use super::{CompletionOptions, Gateway, TextStream};

/// HTTP client for an Ollama-compatible backend.
#[derive(Debug, Clone)]
pub struct OllamaGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaGateway {
    /// Create a client for the given base URL (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Whether the server answers at all.
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    /// Names of the models the server has pulled locally.
    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(connection_error)?;
        let tags: TagsResponse = resp.json().await.map_err(|e| GatewayError::Unparseable {
            message: e.to_string(),
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn request<'a>(
        &self,
        prompt: &'a str,
        options: &'a CompletionOptions,
        stream: bool,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &options.model,
            prompt,
            stream,
            system: options.system.as_deref(),
            options: options
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        }
    }
}

fn parse_ndjson_line(line: &[u8]) -> Option<Result<GenerateResponse, GatewayError>> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<GenerateResponse>(line).map_err(|e| GatewayError::Unparseable {
            message: e.to_string(),
        }),
    )
}

fn connection_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout { seconds: 0 }
    } else {
        GatewayError::Unavailable {
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        let body = self.request(prompt, options, false);
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;

        let resp = resp.error_for_status().map_err(|e| GatewayError::Unavailable {
            message: e.to_string(),
        })?;

        let parsed: GenerateResponse =
            resp.json().await.map_err(|e| GatewayError::Unparseable {
                message: e.to_string(),
            })?;
        Ok(parsed.response)
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<TextStream, GatewayError> {
        let body = self.request(prompt, options, true);
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;

        let resp = resp.error_for_status().map_err(|e| GatewayError::Unavailable {
            message: e.to_string(),
        })?;

        // NDJSON: one JSON object per line, each carrying a `response` chunk
        // until a final object with `done: true`.
        let bytes = resp.bytes_stream().boxed();
        let chunks = futures::stream::unfold(
            (bytes, Vec::new(), false),
            |(mut bytes, mut buffer, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=pos).collect();
                        match parse_ndjson_line(&line) {
                            None => continue,
                            Some(Ok(parsed)) => {
                                let done = parsed.done;
                                return Some((Ok(parsed.response), (bytes, buffer, done)));
                            }
                            Some(Err(e)) => return Some((Err(e), (bytes, buffer, true))),
                        }
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                        Some(Err(e)) => {
                            return Some((Err(connection_error(e)), (bytes, buffer, true)))
                        }
                        None => {
                            // Server closed without a trailing newline; flush
                            // whatever is left as the final line.
                            let line = std::mem::take(&mut buffer);
                            return match parse_ndjson_line(&line) {
                                None => None,
                                Some(Ok(parsed)) => {
                                    Some((Ok(parsed.response), (bytes, buffer, true)))
                                }
                                Some(Err(e)) => Some((Err(e), (bytes, buffer, true))),
                            };
                        }
                    }
                }
            },
        );
        Ok(Box::pin(chunks))
    }
}
