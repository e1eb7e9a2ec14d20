use std::path::PathBuf;

use once_cell::sync::OnceCell;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::error::{PipelineError, Result};

/// Sample rate whisper models expect.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Offline transcription via whisper.cpp.
///
/// The model is loaded lazily on first use and kept for the process lifetime;
/// loading a ggml model takes seconds and must not be repeated per turn. The
/// OnceCell lives in this struct rather than in a module-level static so the
/// capability travels with the transcriber that owns it.
pub struct LocalWhisper {
    model_path: PathBuf,
    context: OnceCell<WhisperContext>,
}

impl LocalWhisper {
    pub fn new(model_path: &str) -> Self {
        Self { model_path: PathBuf::from(model_path), context: OnceCell::new() }
    }

    fn context(&self) -> Result<&WhisperContext> {
        self.context.get_or_try_init(|| {
            if !self.model_path.exists() {
                return Err(PipelineError::TranscriptionUnavailable(format!(
                    "whisper model not found at {}; download a ggml model and set \
                     ai.local_whisper_model",
                    self.model_path.display()
                )));
            }
            log::info!("loading whisper model from {}", self.model_path.display());
            WhisperContext::new_with_params(
                &self.model_path.to_string_lossy(),
                WhisperContextParameters::default(),
            )
            .map_err(|e| {
                PipelineError::TranscriptionUnavailable(format!(
                    "failed to load whisper model: {e}"
                ))
            })
        })
    }

    pub fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        let context = self.context()?;
        let audio = resample(samples, sample_rate, WHISPER_SAMPLE_RATE);

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = context.create_state().map_err(|e| {
            PipelineError::TranscriptionFailed(format!("whisper state error: {e}"))
        })?;
        state
            .full(params, &audio)
            .map_err(|e| PipelineError::TranscriptionFailed(format!("whisper error: {e}")))?;

        let segments = state.full_n_segments().map_err(|e| {
            PipelineError::TranscriptionFailed(format!("whisper segment error: {e}"))
        })?;

        let mut text = String::new();
        for i in 0..segments {
            if let Ok(segment) = state.full_get_segment_text(i) {
                text.push_str(&segment);
            }
        }
        Ok(text.trim().to_string())
    }
}

/// Linear-interpolation resampler; good enough for speech fed to whisper.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    (0..out_len)
        .map(|i| {
            let src = i as f64 * ratio;
            let idx = src as usize;
            let frac = (src - idx as f64) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}
