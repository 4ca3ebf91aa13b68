//! Ollama API client (http://127.0.0.1:11434 by default).
//! Streams `/api/chat` as NDJSON; content deltas are forwarded as they arrive.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatResponse, LlmBackend, LlmError, ToolCall, ToolDefinition};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Client for the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmBackend for OllamaClient {
    /// POST /api/chat with stream: true.
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: model.to_string(),
            messages,
            stream: true,
            tools,
        };
        log::debug!("ollama: POST {} model={}", url, model);
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let mut stream = res.bytes_stream();
        let mut acc = StreamAccumulator::default();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if acc.push_bytes(&chunk, on_chunk) {
                return Ok(acc.finish());
            }
        }
        acc.flush(on_chunk);
        Ok(acc.finish())
    }
}

/// Reassembles NDJSON lines into one assistant message.
/// Tool calls are taken from the last event that carries them.
#[derive(Debug, Default)]
struct StreamAccumulator {
    buffer: Vec<u8>,
    content: String,
    tool_calls: Option<Vec<ToolCall>>,
}

impl StreamAccumulator {
    /// Feed raw bytes; returns true once an event with `done: true` was seen.
    fn push_bytes(
        &mut self,
        bytes: &[u8],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> bool {
        self.buffer.extend_from_slice(bytes);
        while let Some(i) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=i).collect();
            if self.push_line(&line, on_chunk) {
                return true;
            }
        }
        false
    }

    /// Handle a trailing line that had no newline.
    fn flush(&mut self, on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send)) {
        let rest = std::mem::take(&mut self.buffer);
        self.push_line(&rest, on_chunk);
    }

    fn push_line(
        &mut self,
        line: &[u8],
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> bool {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        let event: ChatStreamEvent = match serde_json::from_str(line) {
            Ok(e) => e,
            Err(e) => {
                log::debug!("ollama: skipping unparsable stream line: {}", e);
                return false;
            }
        };
        if let Some(msg) = event.message {
            if !msg.content.is_empty() {
                on_chunk(&msg.content);
                self.content.push_str(&msg.content);
            }
            if msg.tool_calls.is_some() {
                self.tool_calls = msg.tool_calls;
            }
        }
        event.done
    }

    fn finish(self) -> ChatResponse {
        ChatResponse::from_message(ChatMessage::assistant(
            self.content,
            self.tool_calls.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChatStreamEvent {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
}
