//! LLM abstraction: chat backends the agent turn can drive.
//!
//! [`OllamaClient`] talks to a local Ollama instance; [`ScriptedBackend`] replays
//! canned responses for tests and offline demos.

mod ollama;
mod scripted;
mod types;

pub use ollama::OllamaClient;
pub use scripted::{RecordedCall, ScriptedBackend};
pub use types::{
    ChatMessage, ChatResponse, ToolCall, ToolCallFunction, ToolDefinition, ToolFunctionDefinition,
};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("scripted backend: {0}")]
    Script(String),
}

/// A chat model with function calling. Content deltas go to `on_chunk` as they arrive;
/// the returned response holds the full assistant message.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, LlmError>;
}
