use anyhow::{Context, Result};
use async_trait::async_trait;
use dialogue_types::ChatRequest;
use futures_util::StreamExt;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Text in, text out. The only thing the dialogue needs from a language model.
///
/// An `Ok` result may still be empty; callers decide whether that counts as
/// a failure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl OpenAiChat {
    pub fn new(api_key: SecretString) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: SecretString, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .context("Failed to reach chat completions endpoint")?
            .error_for_status()
            .context("Chat completions endpoint returned an error status")?;

        if !request.stream {
            let body = resp.json::<LlmResponse>().await?;
            let content = body
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
                .message
                .content
                .unwrap_or_default();
            return Ok(content);
        }

        let mut deltas = SseDeltas::default();
        let mut body = std::pin::pin!(resp.bytes_stream());
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("Chat completion stream interrupted")?;
            if deltas.push(&chunk) {
                break;
            }
        }
        Ok(deltas.finish())
    }
}

/// Incremental parser for a server-sent-event completion stream. Collects
/// the `delta.content` of every `data:` line until `[DONE]`.
#[derive(Debug, Default)]
pub struct SseDeltas {
    pending: Vec<u8>,
    text: String,
    done: bool,
}

impl SseDeltas {
    /// Feeds raw bytes; returns `true` once the terminator has been seen.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
            if self.done {
                break;
            }
        }
        self.done
    }

    fn handle_line(&mut self, line: &str) {
        let Some(data) = line.trim().strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return;
        }
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content {
                        self.text.push_str(&content);
                    }
                }
            }
            Err(e) => tracing::debug!("skipping unparseable stream line: {}", e),
        }
    }

    pub fn finish(mut self) -> String {
        if !self.done && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.handle_line(&String::from_utf8_lossy(&rest));
        }
        self.text
    }
}
