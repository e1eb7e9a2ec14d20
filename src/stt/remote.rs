use serde::Deserialize;

use crate::error::{PipelineError, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const MODEL: &str = "whisper-1";

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// OpenAI Whisper API transcription.
pub struct WhisperApi {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl WhisperApi {
    pub fn new(api_key: &str) -> Self {
        Self { client: crate::chat::http_client(), api_key: api_key.to_string() }
    }

    pub fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        let audio_wav = super::encode_wav(samples, sample_rate)?;

        let part = reqwest::blocking::multipart::Part::bytes(audio_wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| PipelineError::TranscriptionFailed(format!("MIME error: {e}")))?;

        let form = reqwest::blocking::multipart::Form::new()
            .text("model", MODEL)
            .text("response_format", "json")
            .part("file", part);

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .map_err(|e| {
                PipelineError::TranscriptionFailed(format!("Whisper API request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::TranscriptionFailed(format!(
                "Whisper API error ({status}): {body}"
            )));
        }

        let result: WhisperResponse = response.json().map_err(|e| {
            PipelineError::TranscriptionFailed(format!("failed to parse Whisper response: {e}"))
        })?;

        Ok(result.text)
    }
}
