//! Event stream for one agent turn.
//!
//! Every model call and every tool call is a "run" with its own `run_id`. The
//! agent reports start/stream/end for model runs and start/end for tool runs;
//! tools may add `Custom` events in between through their [`ToolContext`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One step in the execution of an agent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A model call is about to be sent. `name` is the model name.
    ChatModelStart {
        run_id: String,
        name: String,
        message_count: usize,
    },
    /// A content delta streamed from the model.
    ChatModelStream {
        run_id: String,
        name: String,
        chunk: String,
    },
    /// The model call finished; `tool_calls` is how many calls it requested.
    ChatModelEnd {
        run_id: String,
        name: String,
        content: String,
        tool_calls: usize,
    },
    /// The model call failed; no `ChatModelEnd` follows for this run.
    ChatModelError {
        run_id: String,
        name: String,
        error: String,
    },
    ToolStart {
        run_id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolEnd {
        run_id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    /// Dispatched by a tool while it runs; `run_id` is the enclosing tool run.
    Custom {
        run_id: String,
        name: String,
        data: serde_json::Value,
    },
}

impl AgentEvent {
    pub fn run_id(&self) -> &str {
        match self {
            AgentEvent::ChatModelStart { run_id, .. }
            | AgentEvent::ChatModelStream { run_id, .. }
            | AgentEvent::ChatModelEnd { run_id, .. }
            | AgentEvent::ChatModelError { run_id, .. }
            | AgentEvent::ToolStart { run_id, .. }
            | AgentEvent::ToolEnd { run_id, .. }
            | AgentEvent::Custom { run_id, .. } => run_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AgentEvent::ChatModelStart { name, .. }
            | AgentEvent::ChatModelStream { name, .. }
            | AgentEvent::ChatModelEnd { name, .. }
            | AgentEvent::ChatModelError { name, .. }
            | AgentEvent::ToolStart { name, .. }
            | AgentEvent::ToolEnd { name, .. }
            | AgentEvent::Custom { name, .. } => name,
        }
    }

    /// Event kind as it appears in the serialized `event` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::ChatModelStart { .. } => "chat_model_start",
            AgentEvent::ChatModelStream { .. } => "chat_model_stream",
            AgentEvent::ChatModelEnd { .. } => "chat_model_end",
            AgentEvent::ChatModelError { .. } => "chat_model_error",
            AgentEvent::ToolStart { .. } => "tool_start",
            AgentEvent::ToolEnd { .. } => "tool_end",
            AgentEvent::Custom { .. } => "custom",
        }
    }
}

/// Sending half of the event stream. Cheap to clone; a disabled sink drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver that will observe its events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Send an event. A dropped receiver is not an error for the sender.
    pub fn emit(&self, event: AgentEvent) {
        if let Some(ref tx) = self.tx {
            if tx.send(event).is_err() {
                log::debug!("events: receiver dropped, discarding event");
            }
        }
    }
}

/// Per-call context handed to a tool: the tool run's id and the turn's event sink.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run_id: String,
    pub events: EventSink,
}

impl ToolContext {
    pub fn new(events: EventSink) -> Self {
        Self {
            run_id: new_run_id(),
            events,
        }
    }

    /// Emit a `Custom` event tagged with this tool run.
    pub fn dispatch(&self, name: impl Into<String>, data: serde_json::Value) {
        self.events.emit(AgentEvent::Custom {
            run_id: self.run_id.clone(),
            name: name.into(),
            data,
        });
    }
}

pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
