#[cfg(feature = "local-whisper")]
pub mod local;
pub mod remote;

use crate::config::AiConfig;
use crate::error::{PipelineError, Result};

/// Speech-to-text stage. Exactly one strategy is selected at setup time:
/// the Whisper API when an API key is configured, otherwise the local
/// whisper model when one is configured (and the `local-whisper` feature is
/// compiled in), otherwise an unavailable marker carrying an actionable
/// message.
pub enum Transcriber {
    Remote(remote::WhisperApi),
    #[cfg(feature = "local-whisper")]
    Local(local::LocalWhisper),
    Unavailable(String),
    /// Canned transcript for pipeline tests.
    #[cfg(test)]
    Fixed(String),
}

impl Transcriber {
    pub fn from_config(config: &AiConfig) -> Self {
        if !config.api_key.is_empty() {
            return Transcriber::Remote(remote::WhisperApi::new(&config.api_key));
        }

        #[cfg(feature = "local-whisper")]
        if !config.local_whisper_model.is_empty() {
            return Transcriber::Local(local::LocalWhisper::new(&config.local_whisper_model));
        }

        #[cfg(feature = "local-whisper")]
        let detail = "set ai.api_key for the Whisper API, or point \
                      ai.local_whisper_model at a ggml model file";
        #[cfg(not(feature = "local-whisper"))]
        let detail = "set ai.api_key for the Whisper API, or rebuild with the \
                      local-whisper feature and configure ai.local_whisper_model";

        Transcriber::Unavailable(detail.to_string())
    }

    /// Convert captured audio to text. An empty or whitespace-only result is
    /// a valid "no speech detected" outcome, not an error.
    pub fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        match self {
            Transcriber::Remote(api) => api.transcribe(samples, sample_rate),
            #[cfg(feature = "local-whisper")]
            Transcriber::Local(model) => model.transcribe(samples, sample_rate),
            Transcriber::Unavailable(detail) => {
                Err(PipelineError::TranscriptionUnavailable(detail.clone()))
            }
            #[cfg(test)]
            Transcriber::Fixed(text) => Ok(text.clone()),
        }
    }
}

/// Serialize f32 frames to an in-memory 16-bit mono WAV for API submission.
pub(crate) fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| PipelineError::TranscriptionFailed(format!("WAV error: {e}")))?;

    for &sample in samples {
        let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(s)
            .map_err(|e| PipelineError::TranscriptionFailed(format!("WAV write error: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| PipelineError::TranscriptionFailed(format!("WAV finalize error: {e}")))?;

    Ok(cursor.into_inner())
}
