use thiserror::Error;

/// Errors surfaced by the capture/transcription half of the pipeline.
///
/// Chat-provider failures are deliberately NOT represented here: providers
/// return an error-shaped reply string instead (see `chat::ChatProvider`), and
/// synthesis failures degrade to text-only delivery inside the speech stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("already capturing")]
    AlreadyCapturing,

    #[error("not capturing")]
    NotCapturing,

    #[error("no audio captured")]
    NoAudioCaptured,

    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("audio device error: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
