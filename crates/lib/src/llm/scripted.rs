//! Queue-based backend that replays canned assistant messages.
//!
//! Each `chat_stream` call pops the next message, streams its content in
//! word-sized chunks and records the request for later assertion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ChatMessage, ChatResponse, LlmBackend, LlmError, ToolCall, ToolDefinition};

/// A request as the backend received it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    responses: Arc<Mutex<VecDeque<ChatMessage>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply.
    pub fn push_text(&self, content: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(ChatMessage::assistant(content, Vec::new()));
        self
    }

    /// Queue a reply that requests tool calls.
    pub fn push_tool_calls(&self, content: impl Into<String>, calls: Vec<ToolCall>) -> &Self {
        lock(&self.responses).push_back(ChatMessage::assistant(content, calls));
        self
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResponse, LlmError> {
        lock(&self.calls).push(RecordedCall {
            model: model.to_string(),
            messages,
            tools,
        });
        let message = lock(&self.responses)
            .pop_front()
            .ok_or_else(|| LlmError::Script("no responses queued".to_string()))?;
        for chunk in message.content.split_inclusive(' ') {
            on_chunk(chunk);
        }
        Ok(ChatResponse::from_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn streams_words_and_records_request() {
        let backend = ScriptedBackend::new();
        backend.push_text("hello there");
        let mut chunks = Vec::new();
        let res = backend
            .chat_stream("m", vec![ChatMessage::user("hi")], None, &mut |s: &str| {
                chunks.push(s.to_string())
            })
            .await
            .unwrap();
        assert_eq!(res.content(), "hello there");
        assert_eq!(chunks, vec!["hello ".to_string(), "there".to_string()]);
        let calls = backend.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "m");
        assert_eq!(calls[0].messages[0].content, "hi");
    }

    #[tokio::test]
    async fn callback_accepts_chunks_borrowed_from_the_reply() {
        let backend = ScriptedBackend::new();
        backend.push_text("a b c");
        let dyn_backend: &dyn LlmBackend = &backend;
        let mut joined = String::new();
        dyn_backend
            .chat_stream("m", Vec::new(), None, &mut |s: &str| joined.push_str(s))
            .await
            .unwrap();
        assert_eq!(joined, "a b c");
    }

    #[tokio::test]
    async fn empty_queue_is_an_error() {
        let backend = ScriptedBackend::new();
        let err = backend
            .chat_stream("m", Vec::new(), None, &mut |_: &str| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Script(_)));
    }
}
