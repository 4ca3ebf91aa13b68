//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.petpal/config.json`) and environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Agent defaults (model, system prompt).
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Ollama connection settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// The user the generated tools are bound to.
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    /// Model name as shown by `ollama list` (e.g. "llama3.2:latest", "qwen3:8b").
    pub default_model: Option<String>,
    /// Optional system message prepended to every turn.
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaConfig {
    /// Base URL (default http://127.0.0.1:11434). Overridden by OLLAMA_BASE_URL env.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// User id for the pet tools. Overridden by PETPAL_USER_ID env.
    pub id: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn env_or(var: &str, fallback: Option<&String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .and_then(|s| non_empty(&s))
        .or_else(|| fallback.and_then(|s| non_empty(s)))
}

/// Resolve the user id: env PETPAL_USER_ID overrides config.
pub fn resolve_user_id(config: &Config) -> Option<String> {
    env_or("PETPAL_USER_ID", config.user.id.as_ref())
}

/// Resolve the Ollama base URL: env OLLAMA_BASE_URL overrides config.
pub fn resolve_ollama_base_url(config: &Config) -> Option<String> {
    env_or("OLLAMA_BASE_URL", config.ollama.base_url.as_ref())
}

/// Configured model, or [`DEFAULT_MODEL`].
pub fn resolve_model(config: &Config) -> String {
    config
        .agents
        .default_model
        .as_deref()
        .and_then(non_empty)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PETPAL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".petpal").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or PETPAL_CONFIG_PATH).
/// Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("petpal-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(contents.as_bytes()))
            .expect("write config");
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path =
            std::env::temp_dir().join(format!("petpal-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert!(config.user.id.is_none());
        assert_eq!(resolve_model(&config), DEFAULT_MODEL);
    }

    #[test]
    fn parses_camel_case_file() {
        let path = temp_file(
            r#"{"agents":{"defaultModel":"qwen3:8b","systemPrompt":"be nice"},
                "ollama":{"baseUrl":"http://gpu:11434"},
                "user":{"id":"eugene"}}"#,
        );
        let (config, _) = load_config(Some(path.clone())).unwrap();
        assert_eq!(resolve_model(&config), "qwen3:8b");
        assert_eq!(config.agents.system_prompt.as_deref(), Some("be nice"));
        assert_eq!(config.ollama.base_url.as_deref(), Some("http://gpu:11434"));
        assert_eq!(config.user.id.as_deref(), Some("eugene"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_json_names_the_file() {
        let path = temp_file("{not json");
        let err = load_config(Some(path.clone())).unwrap_err();
        assert!(format!("{:#}", err).contains(&path.display().to_string()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut config = Config::default();
        config.agents.default_model = Some("  ".into());
        assert_eq!(resolve_model(&config), DEFAULT_MODEL);
        assert_eq!(non_empty("  x "), Some("x".to_string()));
        assert_eq!(env_or("PETPAL_TEST_UNSET_VAR", Some(&" ".to_string())), None);
        assert_eq!(
            env_or("PETPAL_TEST_UNSET_VAR", Some(&"bob".to_string())),
            Some("bob".to_string())
        );
    }

    // The only test that sets these variables; keep it that way so parallel tests don't race.
    #[test]
    fn env_overrides_config() {
        let path = temp_file(
            r#"{"ollama":{"baseUrl":"http://from-config:11434"},"user":{"id":"from-config"}}"#,
        );
        std::env::set_var("PETPAL_CONFIG_PATH", &path);
        assert_eq!(default_config_path(), path);
        let (config, used) = load_config(None).unwrap();
        assert_eq!(used, path);
        assert_eq!(resolve_user_id(&config).as_deref(), Some("from-config"));
        assert_eq!(
            resolve_ollama_base_url(&config).as_deref(),
            Some("http://from-config:11434")
        );

        std::env::set_var("PETPAL_USER_ID", " from-env ");
        std::env::set_var("OLLAMA_BASE_URL", "http://from-env:11434");
        assert_eq!(resolve_user_id(&config).as_deref(), Some("from-env"));
        assert_eq!(
            resolve_ollama_base_url(&config).as_deref(),
            Some("http://from-env:11434")
        );

        // Blank env values fall back to config.
        std::env::set_var("PETPAL_USER_ID", "  ");
        assert_eq!(resolve_user_id(&config).as_deref(), Some("from-config"));

        std::env::remove_var("PETPAL_USER_ID");
        std::env::remove_var("OLLAMA_BASE_URL");
        std::env::remove_var("PETPAL_CONFIG_PATH");
        assert_ne!(default_config_path(), path);
        let _ = std::fs::remove_file(path);
    }
}
