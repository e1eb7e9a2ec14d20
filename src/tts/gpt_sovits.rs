use serde::Serialize;

use super::{AudioClip, TtsProvider};
use crate::config::GptSovitsConfig;

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    text_lang: &'a str,
    ref_audio_path: &'a str,
    prompt_text: &'a str,
    prompt_lang: &'a str,
    top_k: u32,
    top_p: f32,
    temperature: f32,
    speed_factor: f32,
    repetition_penalty: f32,
    media_type: &'a str,
    streaming_mode: bool,
}

/// Client for a locally running GPT-SoVITS inference server.
pub struct GptSovitsTts {
    client: reqwest::blocking::Client,
    config: GptSovitsConfig,
}

impl GptSovitsTts {
    pub fn new(config: &GptSovitsConfig) -> Self {
        Self { client: crate::chat::http_client(), config: config.clone() }
    }
}

impl TtsProvider for GptSovitsTts {
    fn name(&self) -> &'static str {
        "GPT-SoVITS"
    }

    fn synthesize(&self, text: &str) -> Option<AudioClip> {
        if self.config.ref_audio_path.is_empty() {
            log::warn!("GPT-SoVITS: no reference audio configured");
            return None;
        }

        let url = format!("{}/tts", self.config.endpoint.trim_end_matches('/'));
        let request = TtsRequest {
            text,
            text_lang: &self.config.text_lang,
            ref_audio_path: &self.config.ref_audio_path,
            prompt_text: &self.config.prompt_text,
            prompt_lang: &self.config.prompt_lang,
            top_k: self.config.top_k,
            top_p: self.config.top_p,
            temperature: self.config.temperature,
            speed_factor: self.config.speed,
            repetition_penalty: self.config.repetition_penalty,
            media_type: "wav",
            streaming_mode: false,
        };

        let response = match self.client.post(&url).json(&request).send() {
            Ok(r) => r,
            Err(e) => {
                log::warn!("GPT-SoVITS: request failed: {e}. Is the server running?");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!(
                "GPT-SoVITS: API error ({status}): {}",
                response.text().unwrap_or_default()
            );
            return None;
        }

        let bytes = match response.bytes() {
            Ok(b) => b,
            Err(e) => {
                log::warn!("GPT-SoVITS: failed to read audio body: {e}");
                return None;
            }
        };

        super::decode_wav(&bytes)
    }
}
