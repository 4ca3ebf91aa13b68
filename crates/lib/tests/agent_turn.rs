//! Integration test: drive a full turn through the scripted backend with pet tools
//! bound to one user. Does not require Ollama.

use lib::agent::run_turn;
use lib::events::{AgentEvent, EventSink};
use lib::llm::{ChatMessage, ScriptedBackend, ToolCall};
use lib::registry::UserRegistry;
use lib::tools::{UserPetTools, LIST_FAVORITE_PETS, UPDATE_FAVORITE_PETS};
use serde_json::json;

#[tokio::test]
async fn model_updates_only_the_bound_users_pets() {
    let registry = UserRegistry::new();
    registry.set("bob", vec!["fish".to_string()]).await;

    let backend = ScriptedBackend::new();
    backend
        .push_tool_calls(
            "",
            vec![ToolCall::function(
                UPDATE_FAVORITE_PETS,
                json!({"pets": ["cat", "parrot"]}),
            )],
        )
        .push_tool_calls("", vec![ToolCall::function(LIST_FAVORITE_PETS, json!({}))])
        .push_text("Your favorite pets are cat and parrot.");

    let tools = UserPetTools::for_user(&registry, "eugene");
    let (sink, mut rx) = EventSink::channel();
    let res = run_turn(
        &backend,
        "llama3.2:latest",
        vec![
            ChatMessage::system("You manage favorite pets."),
            ChatMessage::user("my favorite pets are cats and parrots"),
        ],
        Some(&tools),
        &sink,
    )
    .await
    .expect("turn");
    drop(sink);

    assert_eq!(res.content, "Your favorite pets are cat and parrot.");
    assert_eq!(
        registry.get("eugene").await,
        vec!["cat".to_string(), "parrot".to_string()]
    );
    assert_eq!(registry.get("bob").await, vec!["fish".to_string()]);

    let list_result = res
        .messages
        .iter()
        .find(|m| m.tool_name.as_deref() == Some(LIST_FAVORITE_PETS))
        .expect("list tool message");
    assert_eq!(list_result.content, r#"["cat","parrot"]"#);

    // The model saw the tool schemas but never a user id.
    let calls = backend.recorded_calls();
    assert_eq!(calls.len(), 3);
    let advertised = serde_json::to_string(&calls[0].tools).unwrap();
    assert!(advertised.contains(UPDATE_FAVORITE_PETS));
    assert!(!advertised.contains("eugene"));

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    let tool_starts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolStart { name, input, .. } => Some((name.as_str(), input.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        tool_starts,
        vec![
            (UPDATE_FAVORITE_PETS, json!({"pets": ["cat", "parrot"]})),
            (LIST_FAVORITE_PETS, json!({})),
        ]
    );
    assert_eq!(events.first().map(|e| e.kind()), Some("chat_model_start"));
    assert_eq!(events.last().map(|e| e.kind()), Some("chat_model_end"));
}
