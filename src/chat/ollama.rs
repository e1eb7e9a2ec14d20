use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatProvider};
use crate::config::AiConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OllamaChat {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            // The shared 60s timeout matters most here: a cold local model
            // can take tens of seconds to answer its first request.
            client: super::http_client(),
            url: config.ollama_url.clone(),
            model: config.ollama_model.clone(),
        }
    }

    fn request(&self, messages: &[ChatMessage]) -> Result<String, String> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { model: &self.model, messages, stream: false })
            .send()
            .map_err(|e| format!("request failed: {e}. Is Ollama running?"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(format!("API error ({status}): {body}"));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| format!("failed to parse response: {e}"))?;

        Ok(body.message.map(|m| m.content).unwrap_or_default())
    }
}

impl ChatProvider for OllamaChat {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn chat(&self, messages: &[ChatMessage]) -> String {
        match self.request(messages) {
            Ok(reply) => reply,
            Err(detail) => format!("Ollama Error: {detail}"),
        }
    }
}
