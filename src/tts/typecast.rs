use serde::Serialize;

use super::{AudioClip, TtsProvider};
use crate::config::TypecastConfig;

const TTS_URL: &str = "https://api.typecast.ai/v1/text-to-speech";
const MODEL: &str = "ssfm-v21";

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    voice_id: &'a str,
    text: &'a str,
    model: &'a str,
}

pub struct TypecastTts {
    client: reqwest::blocking::Client,
    api_key: String,
    voice_id: String,
}

impl TypecastTts {
    pub fn new(config: &TypecastConfig) -> Self {
        Self {
            client: crate::chat::http_client(),
            api_key: config.api_key.clone(),
            voice_id: config.voice_id.clone(),
        }
    }
}

impl TtsProvider for TypecastTts {
    fn name(&self) -> &'static str {
        "Typecast"
    }

    fn synthesize(&self, text: &str) -> Option<AudioClip> {
        if self.api_key.is_empty() || self.voice_id.is_empty() {
            log::warn!("Typecast: API key or voice ID missing");
            return None;
        }

        let response = self
            .client
            .post(TTS_URL)
            .header("X-API-KEY", &self.api_key)
            .json(&TtsRequest { voice_id: &self.voice_id, text, model: MODEL })
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Typecast: request failed: {e}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!(
                "Typecast: API error ({status}): {}",
                response.text().unwrap_or_default()
            );
            return None;
        }

        let bytes = match response.bytes() {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Typecast: failed to read audio body: {e}");
                return None;
            }
        };

        super::decode_wav(&bytes)
    }
}
