use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatProvider};
use crate::config::AiConfig;

const CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// OpenRouter speaks the OpenAI chat-completions dialect; it additionally
/// wants attribution headers identifying the calling app.
pub struct OpenRouterChat {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl OpenRouterChat {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            client: super::http_client(),
            api_key: config.openrouter_api_key.clone(),
            model: config.openrouter_model.clone(),
        }
    }

    fn request(&self, messages: &[ChatMessage]) -> Result<String, String> {
        let response = self
            .client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://github.com/aiko-companion/aiko")
            .header("X-Title", "Aiko")
            .json(&ChatRequest { model: &self.model, messages })
            .send()
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(format!("API error ({status}): {body}"));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| format!("failed to parse response: {e}"))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| "empty response".to_string())
    }
}

impl ChatProvider for OpenRouterChat {
    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    fn chat(&self, messages: &[ChatMessage]) -> String {
        if self.api_key.is_empty() {
            return "OpenRouter Error: API key not configured. Add your key in Settings."
                .to_string();
        }
        match self.request(messages) {
            Ok(reply) => reply,
            Err(detail) => format!("OpenRouter Error: {detail}"),
        }
    }
}
