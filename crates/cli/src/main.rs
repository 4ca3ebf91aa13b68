use clap::{Parser, Subcommand};
use lib::agent::run_turn;
use lib::events::{AgentEvent, EventSink};
use lib::llm::{ChatMessage, LlmBackend, LlmError, OllamaClient};
use lib::registry::UserRegistry;
use lib::tools::UserPetTools;
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "petpal")]
#[command(about = "petpal CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Chat with a model that can update, delete, and list your favorite pets.
    /// Without a message, starts an interactive session.
    Chat {
        /// Config file path (default: PETPAL_CONFIG_PATH or ~/.petpal/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// User the pet tools are bound to (default: PETPAL_USER_ID or user.id from config)
        #[arg(long, short, value_name = "ID")]
        user: Option<String>,

        /// Ollama model name (default from config or llama3.2:latest)
        #[arg(long, short)]
        model: Option<String>,

        /// Print every agent event as a JSON line on stderr.
        #[arg(long)]
        events: bool,

        /// Message to send; omit for interactive mode.
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("petpal {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Chat {
            config,
            user,
            model,
            events,
            message,
        }) => {
            if let Err(e) = run_chat(config, user, model, events, message).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    user: Option<String>,
    model: Option<String>,
    print_events: bool,
    message: Option<String>,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    let user_id = user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| lib::config::resolve_user_id(&config))
        .ok_or_else(|| {
            anyhow::anyhow!("no user id: pass --user, set PETPAL_USER_ID, or set user.id in config")
        })?;
    let model = model.unwrap_or_else(|| lib::config::resolve_model(&config));
    let backend = OllamaClient::new(lib::config::resolve_ollama_base_url(&config));
    log::info!("chat: user {} via ollama at {}", user_id, backend.base_url());

    let registry = UserRegistry::new();
    let tools = UserPetTools::for_user(&registry, user_id.clone());

    let mut history = Vec::new();
    if let Some(ref prompt) = config.agents.system_prompt {
        if !prompt.trim().is_empty() {
            history.push(ChatMessage::system(prompt.clone()));
        }
    }

    let one_shot = message.is_some();
    let mut pending = message;
    loop {
        let line = match pending.take() {
            Some(m) => m,
            None if one_shot => break,
            None => match read_line()? {
                Some(l) => l,
                None => break,
            },
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        match submit(&backend, &model, &mut history, &tools, line, print_events).await {
            Ok(()) => println!(),
            Err(e) if one_shot => return Err(e.into()),
            Err(e) => {
                eprintln!("chat error: {}", e);
                continue;
            }
        }

        let pets = registry.get(&user_id).await;
        println!("[{}] favorite pets: {}", user_id, serde_json::to_string(&pets)?);
    }
    Ok(())
}

/// Run one turn for `line`. On success `history` becomes the turn's transcript; on
/// failure it is left as it was before the call, so the session can go on.
async fn submit<B: LlmBackend + ?Sized>(
    backend: &B,
    model: &str,
    history: &mut Vec<ChatMessage>,
    tools: &UserPetTools,
    line: String,
    print_events: bool,
) -> Result<(), LlmError> {
    let mut messages = history.clone();
    messages.push(ChatMessage::user(line));

    let (sink, rx) = EventSink::channel();
    let printer = tokio::spawn(print_events_from(rx, print_events));
    let res = run_turn(backend, model, messages, Some(tools), &sink).await;
    drop(sink);
    if let Err(e) = printer.await {
        log::warn!("event printer failed: {}", e);
    }
    *history = res?.messages;
    Ok(())
}

/// Prompt on stdout and read one line; None on EOF.
fn read_line() -> anyhow::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Print streamed model text to stdout; optionally each event as JSON on stderr.
async fn print_events_from(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<AgentEvent>,
    print_events: bool,
) {
    while let Some(event) = rx.recv().await {
        if print_events {
            match serde_json::to_string(&event) {
                Ok(json) => eprintln!("{}", json),
                Err(e) => log::warn!("could not serialize event: {}", e),
            }
        }
        if let AgentEvent::ChatModelStream { ref chunk, .. } = event {
            print!("{}", chunk);
            let _ = io::stdout().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::llm::{ScriptedBackend, ToolCall};
    use lib::tools::UPDATE_FAVORITE_PETS;
    use serde_json::json;

    #[tokio::test]
    async fn failed_turn_keeps_history_and_pets() {
        let registry = UserRegistry::new();
        let tools = UserPetTools::for_user(&registry, "eugene");
        let backend = ScriptedBackend::new();
        backend
            .push_tool_calls(
                "",
                vec![ToolCall::function(UPDATE_FAVORITE_PETS, json!({"pets": ["cat"]}))],
            )
            .push_text("Saved.");

        let mut history = vec![ChatMessage::system("You manage favorite pets.")];
        submit(&backend, "m", &mut history, &tools, "I like cats".into(), false)
            .await
            .unwrap();
        let after_first = history.clone();
        assert_eq!(after_first.last().map(|m| m.content.as_str()), Some("Saved."));

        // Nothing queued: the backend fails like an unreachable server would.
        let err = submit(&backend, "m", &mut history, &tools, "still there?".into(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Script(_)));
        assert_eq!(history, after_first);
        assert_eq!(registry.get("eugene").await, vec!["cat".to_string()]);

        backend.push_text("Yes.");
        submit(&backend, "m", &mut history, &tools, "still there?".into(), false)
            .await
            .unwrap();
        assert_eq!(history.len(), after_first.len() + 2);
        let sent = &backend.recorded_calls()[3].messages;
        assert_eq!(sent.len(), after_first.len() + 1);
        assert_eq!(sent.iter().filter(|m| m.content == "still there?").count(), 1);
    }
}
