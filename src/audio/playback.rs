use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use crate::error::{PipelineError, Result};
use crate::tts::{AudioClip, Samples};

struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

/// A clip being played on the default output device.
///
/// Playback starts immediately and runs on the audio callback; the handle is
/// not `Send` (cpal streams are thread-bound) and is meant to be held on the
/// pipeline worker thread that started it.
pub struct ActivePlayback {
    _stream: cpal::Stream,
    buffer: Arc<Mutex<PlaybackBuffer>>,
}

impl ActivePlayback {
    pub fn is_finished(&self) -> bool {
        self.buffer.lock().finished
    }

    /// Block until the output callback has consumed every sample.
    pub fn wait_until_done(&self) {
        while !self.is_finished() {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Start playing a clip on the default output device (non-blocking).
/// The clip is copied into the output buffer; the caller keeps its copy for
/// amplitude analysis during playback.
pub fn play(clip: &AudioClip) -> Result<ActivePlayback> {
    if clip.sample_rate == 0 {
        return Err(PipelineError::Audio("clip has no sample rate".into()));
    }
    let samples: Vec<f32> = match &clip.samples {
        Samples::F32(v) => v.clone(),
        Samples::I16(v) => v.iter().map(|&s| s as f32 / 32768.0).collect(),
    };

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PipelineError::Audio("no default output device".into()))?;

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(clip.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples,
        position: 0,
        finished: false,
    }));
    let callback_buffer = buffer.clone();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buf = callback_buffer.lock();
                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            |err| log::error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| PipelineError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| PipelineError::Audio(format!("failed to start output stream: {e}")))?;

    Ok(ActivePlayback { _stream: stream, buffer })
}
