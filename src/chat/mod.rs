pub mod ollama;
pub mod openai;
pub mod openrouter;

use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, ChatProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A chat-completion backend.
///
/// `chat` never fails: on any problem the provider returns a user-visible
/// string of the form `"<Name> Error: <detail>"` instead. Callers display or
/// speak that text like any other reply, so error handling stays uniform at
/// the boundary.
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn chat(&self, messages: &[ChatMessage]) -> String;
}

/// Select the chat backend for the current configuration.
///
/// This is the single switch point for chat providers; unknown kinds never
/// occur (the kind is a closed enum) and the serde default is OpenAI.
pub fn create_provider(config: &AiConfig) -> Box<dyn ChatProvider> {
    match config.provider {
        ChatProviderKind::OpenAi => Box::new(openai::OpenAiChat::new(config)),
        ChatProviderKind::OpenRouter => Box::new(openrouter::OpenRouterChat::new(config)),
        ChatProviderKind::Ollama => Box::new(ollama::OllamaChat::new(config)),
    }
}

/// Generous timeout shared by all provider clients; local backends (Ollama,
/// GPT-SoVITS) can take most of this on first load.
pub(crate) const PROVIDER_TIMEOUT_SECS: u64 = 60;

pub(crate) fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;

    #[test]
    fn factory_maps_kind_to_provider() {
        let mut cfg = AiConfig::default();
        cfg.provider = ChatProviderKind::OpenAi;
        assert_eq!(create_provider(&cfg).name(), "OpenAI");
        cfg.provider = ChatProviderKind::OpenRouter;
        assert_eq!(create_provider(&cfg).name(), "OpenRouter");
        cfg.provider = ChatProviderKind::Ollama;
        assert_eq!(create_provider(&cfg).name(), "Ollama");
    }

    #[test]
    fn missing_key_becomes_error_text_without_network() {
        let cfg = AiConfig::default();
        let reply = create_provider(&cfg).chat(&[ChatMessage::user("hi")]);
        assert!(reply.starts_with("OpenAI Error:"), "got: {reply}");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert!(json.contains("\"assistant\""));
    }
}
