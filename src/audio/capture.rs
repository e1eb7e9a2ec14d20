use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::Mutex;

use crate::error::{PipelineError, Result};

/// How often the capture thread re-checks the active flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Audio recorded during one push-to-record gesture.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Accumulates microphone samples on a dedicated thread while a
/// push-to-record gesture is held.
///
/// cpal streams are not `Send`, so the stream lives entirely on the capture
/// thread: it is built there, polled there, and dropped there when the active
/// flag clears. The data callback appends f32 frames (i16 input converted) to
/// the shared buffer, which `stop` consumes exactly once.
pub struct CaptureBuffer {
    active: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: Arc<AtomicU32>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: Arc::new(AtomicU32::new(0)),
            worker: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Begin capturing from the given input device (`None` = system default).
    ///
    /// Device failures after the thread starts are logged and clear the
    /// active flag, so a later `stop` reports `NoAudioCaptured` rather than
    /// wedging the session.
    pub fn start(&mut self, device_index: Option<usize>) -> Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyCapturing);
        }
        self.buffer.lock().clear();

        let active = self.active.clone();
        let buffer = self.buffer.clone();
        let sample_rate = self.sample_rate.clone();

        self.worker = Some(std::thread::spawn(move || {
            if let Err(e) = record_loop(device_index, &active, &buffer, &sample_rate) {
                log::error!("capture error: {e}");
                active.store(false, Ordering::SeqCst);
            }
        }));

        log::info!("recording started");
        Ok(())
    }

    /// Start a session that records nothing, for exercising the empty-stop
    /// path without touching real devices.
    #[cfg(test)]
    pub(crate) fn start_silent(&mut self) {
        self.active.store(true, Ordering::SeqCst);
        let active = self.active.clone();
        self.worker = Some(std::thread::spawn(move || {
            while active.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }));
    }

    /// Append frames directly, standing in for the device callback in tests.
    #[cfg(test)]
    pub(crate) fn push_frames(&self, frames: &[f32]) {
        self.buffer.lock().extend_from_slice(frames);
        self.sample_rate.store(16_000, Ordering::SeqCst);
    }

    /// Stop capturing and take ownership of the accumulated samples.
    pub fn stop(&mut self) -> Result<CapturedAudio> {
        let worker = self.worker.take().ok_or(PipelineError::NotCapturing)?;
        self.active.store(false, Ordering::SeqCst);
        let _ = worker.join();
        log::info!("recording stopped");

        let samples = std::mem::take(&mut *self.buffer.lock());
        if samples.is_empty() {
            return Err(PipelineError::NoAudioCaptured);
        }
        Ok(CapturedAudio { samples, sample_rate: self.sample_rate.load(Ordering::SeqCst) })
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn record_loop(
    device_index: Option<usize>,
    active: &Arc<AtomicBool>,
    buffer: &Arc<Mutex<Vec<f32>>>,
    sample_rate: &Arc<AtomicU32>,
) -> std::result::Result<(), String> {
    let device = super::input_device(device_index)
        .ok_or_else(|| "no input device available".to_string())?;
    let config = device
        .default_input_config()
        .map_err(|e| format!("failed to get input config: {e}"))?;

    let channels = config.channels() as usize;
    sample_rate.store(config.sample_rate().0, Ordering::SeqCst);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let buffer = buffer.clone();
            device
                .build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let mut buf = buffer.lock();
                        buf.extend(data.iter().step_by(channels));
                    },
                    |err| log::error!("input stream error: {err}"),
                    None,
                )
                .map_err(|e| format!("failed to build stream: {e}"))?
        }
        cpal::SampleFormat::I16 => {
            let buffer = buffer.clone();
            device
                .build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let mut buf = buffer.lock();
                        buf.extend(data.iter().step_by(channels).map(|&s| s as f32 / 32768.0));
                    },
                    |err| log::error!("input stream error: {err}"),
                    None,
                )
                .map_err(|e| format!("failed to build stream: {e}"))?
        }
        format => return Err(format!("unsupported sample format: {format:?}")),
    };

    stream.play().map_err(|e| format!("failed to start stream: {e}"))?;

    while active.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
    }

    drop(stream);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_not_capturing() {
        let mut capture = CaptureBuffer::new();
        assert!(matches!(capture.stop(), Err(PipelineError::NotCapturing)));
    }

    #[test]
    fn duration_follows_sample_count() {
        let audio = CapturedAudio { samples: vec![0.0; 44_100], sample_rate: 44_100 };
        assert!((audio.duration_secs() - 1.0).abs() < 1e-6);
    }
}
