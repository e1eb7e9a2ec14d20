use std::sync::Arc;

use parking_lot::Mutex;

use crate::chat::{ChatMessage, ChatProvider, ChatRole};
use crate::config::AiConfig;
use crate::emotion::{self, NEUTRAL};

/// Outcome of one conversation turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub raw_reply: String,
    /// What gets shown and spoken; the emotion tag is always stripped here.
    pub display_text: String,
    /// Recognized tag, or "Neutral" when absent or tags are disabled.
    pub emotion: String,
    /// What was persisted to history (tag retained only when tags are on).
    pub history_content: String,
}

struct EngineState {
    provider: Arc<dyn ChatProvider>,
    history: Vec<ChatMessage>,
    base_prompt: String,
    emotions_enabled: bool,
    memory_enabled: bool,
    /// Bumped by `clear_memory`; an in-flight turn that started under an
    /// older generation skips its assistant append (the clear wins).
    generation: u64,
}

impl EngineState {
    fn effective_prompt(&self) -> String {
        if self.emotions_enabled {
            format!("{}{}", self.base_prompt, emotion::EMOTION_PROMPT_SUFFIX)
        } else {
            self.base_prompt.clone()
        }
    }

    fn refresh_system_message(&mut self) {
        let prompt = self.effective_prompt();
        match self.history.first_mut() {
            Some(head) if head.role == ChatRole::System => head.content = prompt,
            // Empty or corrupt history: rebuild rather than patch.
            _ => self.history = vec![ChatMessage::system(prompt)],
        }
    }
}

/// Rolling conversation state plus chat dispatch.
///
/// Shared between the UI thread (settings and memory controls) and the
/// pipeline worker (one `respond` per turn). The internal mutex is NOT held
/// across the provider call: `respond` snapshots the outgoing messages under
/// the lock, releases it for the network round-trip, and re-acquires it to
/// append the assistant reply.
pub struct ConversationEngine {
    state: Mutex<EngineState>,
}

impl ConversationEngine {
    pub fn new(provider: Arc<dyn ChatProvider>, config: &AiConfig) -> Self {
        let mut state = EngineState {
            provider,
            history: Vec::new(),
            base_prompt: config.system_prompt.clone(),
            emotions_enabled: config.emotions_enabled,
            memory_enabled: config.memory_enabled,
            generation: 0,
        };
        state.refresh_system_message();
        Self { state: Mutex::new(state) }
    }

    /// Run one turn: dispatch the user text, parse the emotion tag, update
    /// history per the memory/emotions settings.
    pub fn respond(&self, user_text: &str) -> TurnResult {
        let (provider, messages, generation) = {
            let mut state = self.state.lock();
            let provider = state.provider.clone();
            let messages = if state.memory_enabled {
                // The user turn must be in history before dispatch so the
                // request includes it.
                state.history.push(ChatMessage::user(user_text));
                state.history.clone()
            } else {
                vec![
                    ChatMessage::system(state.effective_prompt()),
                    ChatMessage::user(user_text),
                ]
            };
            (provider, messages, state.generation)
        };

        // Infallible by contract; failures come back as error-shaped text.
        let raw_reply = provider.chat(&messages);

        let (tag, stripped) = emotion::split_emotion_tag(&raw_reply);
        let mut state = self.state.lock();
        let (emotion, history_content) = if state.emotions_enabled {
            (tag.unwrap_or_else(|| NEUTRAL.to_string()), raw_reply.clone())
        } else {
            (NEUTRAL.to_string(), stripped.clone())
        };

        if state.memory_enabled && state.generation == generation {
            state.history.push(ChatMessage::assistant(history_content.clone()));
        }

        TurnResult { raw_reply, display_text: stripped, emotion, history_content }
    }

    /// Reset history to a single system message with the effective prompt.
    pub fn clear_memory(&self) {
        let mut state = self.state.lock();
        state.history = vec![ChatMessage::system(state.effective_prompt())];
        state.generation += 1;
        log::info!("memory cleared");
    }

    pub fn set_memory_enabled(&self, enabled: bool) {
        self.state.lock().memory_enabled = enabled;
        log::info!("memory enabled: {enabled}");
    }

    pub fn set_system_prompt(&self, prompt: &str) {
        let mut state = self.state.lock();
        state.base_prompt = prompt.to_string();
        state.refresh_system_message();
    }

    pub fn set_emotions_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.emotions_enabled = enabled;
        state.refresh_system_message();
    }

    pub fn set_provider(&self, provider: Arc<dyn ChatProvider>) {
        self.state.lock().provider = provider;
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().history.clone()
    }
}
