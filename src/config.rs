use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default companion personality. Settings may replace it; the emotion-tag
/// instruction suffix is appended separately by the conversation engine.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful desktop companion named Aiko. \
     Keep your responses concise (under 20 words if possible) and friendly. \
     Do not use markdown formatting.";

// Provider kinds deserialize through `From<String>` so an unknown or
// misspelled kind degrades to the default provider instead of failing the
// whole config parse (and with it, discarding the user's other settings).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ChatProviderKind {
    OpenAi,
    OpenRouter,
    Ollama,
}

impl Default for ChatProviderKind {
    fn default() -> Self {
        Self::OpenAi
    }
}

impl From<String> for ChatProviderKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "open_ai" | "openai" => Self::OpenAi,
            "open_router" | "openrouter" => Self::OpenRouter,
            "ollama" => Self::Ollama,
            other => {
                log::warn!("unknown chat provider '{other}', using OpenAI");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum TtsProviderKind {
    Typecast,
    ElevenLabs,
    GptSovits,
}

impl Default for TtsProviderKind {
    fn default() -> Self {
        Self::GptSovits
    }
}

impl From<String> for TtsProviderKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "typecast" => Self::Typecast,
            "eleven_labs" | "elevenlabs" => Self::ElevenLabs,
            "gpt_sovits" => Self::GptSovits,
            other => {
                log::warn!("unknown TTS provider '{other}', using GPT-SoVITS");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ChatProviderKind,
    pub api_key: String,
    pub openai_model: String,
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub memory_enabled: bool,
    pub system_prompt: String,
    pub emotions_enabled: bool,
    /// Input device index; -1 means system default.
    pub input_device: i32,
    /// Path to a ggml whisper model for the local fallback transcriber.
    pub local_whisper_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ChatProviderKind::default(),
            api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openrouter_api_key: String::new(),
            openrouter_model: "openai/gpt-3.5-turbo".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            memory_enabled: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            emotions_enabled: true,
            input_device: -1,
            local_whisper_model: String::new(),
        }
    }
}

impl AiConfig {
    /// Device index as the capture layer wants it (None = system default).
    pub fn input_device_index(&self) -> Option<usize> {
        usize::try_from(self.input_device).ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypecastConfig {
    pub api_key: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: String::new(),
            model_id: "eleven_flash_v2_5".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GptSovitsConfig {
    pub endpoint: String,
    pub ref_audio_path: String,
    pub prompt_text: String,
    pub prompt_lang: String,
    pub text_lang: String,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub speed: f32,
    pub repetition_penalty: f32,
}

impl Default for GptSovitsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9880".to_string(),
            ref_audio_path: String::new(),
            prompt_text: String::new(),
            prompt_lang: "en".to_string(),
            text_lang: "en".to_string(),
            top_k: 5,
            top_p: 1.0,
            temperature: 1.0,
            speed: 1.0,
            repetition_penalty: 1.35,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub enabled: bool,
    pub provider: TtsProviderKind,
    pub typecast: TypecastConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub gpt_sovits: GptSovitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Multiplier applied to the lip-sync amplitude before clamping.
    pub mouth_sensitivity: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { mouth_sensitivity: 1.0 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub tts: TtsConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Directory `load`/`save` use when the caller has no opinion.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("aiko")
    }

    pub fn load(dir: &Path) -> Self {
        let config_path = dir.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        log::warn!("could not parse {}: {e}, using defaults", config_path.display());
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            }
        } else {
            let c = Self::default();
            c.save(dir);
            c
        };

        // Environment override beats the persisted key.
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.ai.api_key = key;
            }
        }

        config
    }

    pub fn save(&self, dir: &Path) {
        if std::fs::create_dir_all(dir).is_err() {
            log::warn!("could not create config dir {}", dir.display());
            return;
        }
        let config_path = dir.join("config.json");
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(&config_path, content) {
                log::warn!("could not write {}: {e}", config_path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.ai.provider = ChatProviderKind::Ollama;
        config.ai.memory_enabled = false;
        config.tts.enabled = true;
        config.tts.provider = TtsProviderKind::Typecast;
        config.render.mouth_sensitivity = 2.5;
        config.save(dir.path());

        let loaded = AppConfig::load(dir.path());
        assert_eq!(loaded.ai.provider, ChatProviderKind::Ollama);
        assert!(!loaded.ai.memory_enabled);
        assert!(loaded.tts.enabled);
        assert_eq!(loaded.tts.provider, TtsProviderKind::Typecast);
        assert_eq!(loaded.render.mouth_sensitivity, 2.5);
    }

    #[test]
    fn missing_file_writes_defaults_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path());
        assert!(dir.path().join("config.json").exists());
        assert_eq!(config.ai.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(config.ai.memory_enabled);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"ai": {"provider": "ollama"}}"#,
        )
        .unwrap();
        let config = AppConfig::load(dir.path());
        assert_eq!(config.ai.provider, ChatProviderKind::Ollama);
        assert_eq!(config.ai.ollama_model, "llama3");
        assert!(!config.tts.enabled);
    }

    #[test]
    fn unknown_provider_falls_back_without_losing_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"ai": {"provider": "groq", "api_key": "sk-x", "ollama_model": "phi3"},
                "tts": {"provider": "festival", "enabled": true}}"#,
        )
        .unwrap();
        let config = AppConfig::load(dir.path());
        assert_eq!(config.ai.provider, ChatProviderKind::OpenAi);
        assert_eq!(config.tts.provider, TtsProviderKind::GptSovits);
        // The rest of the file still applies.
        assert_eq!(config.ai.ollama_model, "phi3");
        assert!(config.tts.enabled);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "not json {").unwrap();
        let config = AppConfig::load(dir.path());
        assert_eq!(config.ai.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn negative_device_index_means_default() {
        let config = AiConfig::default();
        assert_eq!(config.input_device, -1);
        assert_eq!(config.input_device_index(), None);
    }
}
