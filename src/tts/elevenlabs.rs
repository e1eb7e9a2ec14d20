use serde::Serialize;

use super::{AudioClip, Samples, TtsProvider};
use crate::config::ElevenLabsConfig;

// Requesting raw PCM sidesteps compressed-audio decoding entirely; the
// payload is little-endian s16 mono at the rate named by the format tag.
const OUTPUT_FORMAT: &str = "pcm_44100";
const OUTPUT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

pub struct ElevenLabsTts {
    client: reqwest::blocking::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsTts {
    pub fn new(config: &ElevenLabsConfig) -> Self {
        Self { client: crate::chat::http_client(), config: config.clone() }
    }
}

impl TtsProvider for ElevenLabsTts {
    fn name(&self) -> &'static str {
        "ElevenLabs"
    }

    fn synthesize(&self, text: &str) -> Option<AudioClip> {
        if self.config.api_key.is_empty() {
            log::warn!("ElevenLabs: API key missing");
            return None;
        }
        if self.config.voice_id.is_empty() {
            log::warn!("ElevenLabs: no voice ID specified");
            return None;
        }

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format={OUTPUT_FORMAT}",
            self.config.voice_id
        );

        let request = TtsRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
                style: self.config.style,
                use_speaker_boost: self.config.use_speaker_boost,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&request)
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                log::warn!("ElevenLabs: request failed: {e}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!(
                "ElevenLabs: API error ({status}): {}",
                response.text().unwrap_or_default()
            );
            return None;
        }

        let bytes = match response.bytes() {
            Ok(b) => b,
            Err(e) => {
                log::warn!("ElevenLabs: failed to read audio body: {e}");
                return None;
            }
        };

        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        if samples.is_empty() {
            log::warn!("ElevenLabs: empty audio payload");
            return None;
        }

        Some(AudioClip { sample_rate: OUTPUT_SAMPLE_RATE, samples: Samples::I16(samples) })
    }
}
