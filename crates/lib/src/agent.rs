//! Agent turn: call the model, run any tool calls it requests, re-call until done.
//! Every model call and tool call is reported on the turn's [`EventSink`].

use crate::events::{new_run_id, AgentEvent, EventSink, ToolContext};
use crate::llm::{ChatMessage, LlmBackend, LlmError, ToolCall, ToolDefinition};

pub const MAX_TOOL_LOOP: usize = 5;

const FALLBACK_MODEL: &str = "llama3.2:latest";

/// Result of one agent turn: final text, the final message's tool calls, and the full transcript.
#[derive(Debug, Clone)]
pub struct AgentTurnResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub messages: Vec<ChatMessage>,
}

/// Executes tools by name and JSON arguments. Returns output or error string.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions advertised to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    async fn execute(
        &self,
        name: &str,
        args: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, String>;
}

/// Run one agent turn over `messages` (system prompt, history, and the new user message).
/// If the executor is set and the model returns tool_calls, execute them in order and re-call
/// until no more tool_calls or [`MAX_TOOL_LOOP`] model calls.
pub async fn run_turn<B: LlmBackend + ?Sized>(
    backend: &B,
    model: &str,
    mut messages: Vec<ChatMessage>,
    tool_executor: Option<&dyn ToolExecutor>,
    events: &EventSink,
) -> Result<AgentTurnResult, LlmError> {
    let model_name = model.trim();
    let model_name = if model_name.is_empty() {
        log::warn!("agent: configured model was empty, using fallback");
        FALLBACK_MODEL
    } else {
        model_name
    };
    log::info!("agent: using model {}", model_name);

    let tools = tool_executor
        .map(|e| e.definitions())
        .filter(|defs| !defs.is_empty());
    let mut loop_count = 0;

    loop {
        let run_id = new_run_id();
        events.emit(AgentEvent::ChatModelStart {
            run_id: run_id.clone(),
            name: model_name.to_string(),
            message_count: messages.len(),
        });
        let mut on_chunk = |chunk: &str| {
            if events.is_enabled() {
                events.emit(AgentEvent::ChatModelStream {
                    run_id: run_id.clone(),
                    name: model_name.to_string(),
                    chunk: chunk.to_string(),
                })
            }
        };
        let result = backend
            .chat_stream(model_name, messages.clone(), tools.clone(), &mut on_chunk)
            .await;
        let res = match result {
            Ok(res) => res,
            Err(e) => {
                events.emit(AgentEvent::ChatModelError {
                    run_id,
                    name: model_name.to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        let content = res.content().to_string();
        let tool_calls = res.tool_calls().to_vec();
        events.emit(AgentEvent::ChatModelEnd {
            run_id,
            name: model_name.to_string(),
            content: content.clone(),
            tool_calls: tool_calls.len(),
        });
        messages.push(ChatMessage::assistant(content.clone(), tool_calls.clone()));
        loop_count += 1;

        if tool_calls.is_empty() {
            return Ok(AgentTurnResult {
                content,
                tool_calls,
                messages,
            });
        }

        let executor = match tool_executor {
            Some(e) => e,
            None => {
                log::debug!("agent: tool_calls returned but no executor");
                return Ok(AgentTurnResult {
                    content,
                    tool_calls,
                    messages,
                });
            }
        };

        for call in &tool_calls {
            let name = call.function.name.as_str();
            let output = run_tool(executor, call, events).await;
            messages.push(ChatMessage::tool(name, output));
        }

        if loop_count >= MAX_TOOL_LOOP {
            log::warn!(
                "agent: stopped after {} model calls; last tool results not sent to the model",
                MAX_TOOL_LOOP
            );
            return Ok(AgentTurnResult {
                content,
                tool_calls,
                messages,
            });
        }
    }
}

/// Execute one tool call between ToolStart/ToolEnd events. Failures become `error: ...` content.
async fn run_tool(executor: &dyn ToolExecutor, call: &ToolCall, events: &EventSink) -> String {
    let name = call.function.name.as_str();
    let args = call.arguments();
    let ctx = ToolContext::new(events.clone());
    events.emit(AgentEvent::ToolStart {
        run_id: ctx.run_id.clone(),
        name: name.to_string(),
        input: args.clone(),
    });
    let (output, is_error) = match executor.execute(name, &args, &ctx).await {
        Ok(out) => (out, false),
        Err(e) => {
            log::warn!("agent: tool {} failed: {}", name, e);
            (format!("error: {}", e), true)
        }
    };
    events.emit(AgentEvent::ToolEnd {
        run_id: ctx.run_id,
        name: name.to_string(),
        output: output.clone(),
        is_error,
    });
    output
}
