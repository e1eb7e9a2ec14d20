use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::audio::playback;
use crate::config::AppConfig;
use crate::pipeline::PipelineEvent;
use crate::tts::{self, Samples, TtsProvider};

/// Display duration used when a reply is shown without audio.
pub const DEFAULT_TEXT_SECS: f32 = 4.0;

/// Samples per lip-sync RMS window.
const LIPSYNC_WINDOW: usize = 1024;

/// ~60 Hz lip-sync cadence.
const LIPSYNC_TICK: Duration = Duration::from_millis(16);

/// Synthesis and playback stage. Owns the selected TTS backend (if any) and
/// drives the lip-sync signal while a clip plays. Every failure in here
/// degrades to text-only delivery; nothing propagates.
pub struct SpeechStage {
    provider: Option<Box<dyn TtsProvider>>,
    sensitivity: f32,
}

impl SpeechStage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            provider: tts::create_provider(&config.tts),
            sensitivity: config.render.mouth_sensitivity,
        }
    }

    /// Deliver a reply: emit the expression and chat text, then (when a
    /// synthesis backend is available) play the spoken audio while streaming
    /// lip-sync amplitudes. Blocks until playback completes.
    pub fn speak(&self, display_text: &str, emotion: &str, events: &Sender<PipelineEvent>) {
        let _ = events.send(PipelineEvent::Expression(emotion.to_string()));

        let Some(provider) = &self.provider else {
            self.deliver_text_only(display_text, emotion, events);
            return;
        };

        // The speech engine gets a sanitized copy; the displayed text is
        // exactly what the engine produced.
        let spoken = sanitize_for_tts(display_text);
        let Some(clip) = provider.synthesize(&spoken) else {
            log::warn!("{}: synthesis unavailable, falling back to text", provider.name());
            self.deliver_text_only(display_text, emotion, events);
            return;
        };

        // Start playback before announcing the bubble duration; if the
        // output device refuses the clip the text falls back to the short
        // default instead of sitting on screen for the full silent clip.
        let active = match playback::play(&clip) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("playback failed: {e}, falling back to text");
                self.deliver_text_only(display_text, emotion, events);
                return;
            }
        };

        let _ = events.send(PipelineEvent::Reply {
            text: display_text.to_string(),
            emotion: emotion.to_string(),
            duration_secs: clip.duration_secs(),
        });

        let total = clip.samples.len();
        let rate = clip.sample_rate as f32;
        let started = Instant::now();
        loop {
            let offset = (started.elapsed().as_secs_f32() * rate) as usize;
            if offset >= total {
                break;
            }
            if let Some(rms) = window_rms(&clip.samples, offset, LIPSYNC_WINDOW) {
                let _ = events.send(PipelineEvent::LipSync(lip_value(rms, self.sensitivity)));
            }
            std::thread::sleep(LIPSYNC_TICK);
        }

        // Force the mouth closed before handing control back.
        let _ = events.send(PipelineEvent::LipSync(0.0));
        active.wait_until_done();
    }

    fn deliver_text_only(&self, text: &str, emotion: &str, events: &Sender<PipelineEvent>) {
        let _ = events.send(PipelineEvent::Reply {
            text: text.to_string(),
            emotion: emotion.to_string(),
            duration_secs: DEFAULT_TEXT_SECS,
        });
    }
}

/// Replace characters speech engines tend to mispronounce. Hyphens read as
/// "minus" or a hard stop on several backends; newlines confuse sentence
/// splitting.
pub fn sanitize_for_tts(text: &str) -> String {
    text.replace(['-', '\n', '\r'], " ")
}

/// RMS of a window of samples centered on `center`, normalized to [0,1]
/// (integer PCM divided by full scale, float used as-is). Returns `None`
/// when the window has no samples, in which case the previous lip value
/// simply holds.
pub fn window_rms(samples: &Samples, center: usize, width: usize) -> Option<f32> {
    let len = samples.len();
    let start = center.saturating_sub(width / 2);
    let end = (start + width).min(len);
    if start >= end {
        return None;
    }
    let count = (end - start) as f32;
    let sum_squares = match samples {
        Samples::I16(v) => v[start..end]
            .iter()
            .map(|&s| {
                let f = s as f32 / 32768.0;
                f * f
            })
            .sum::<f32>(),
        Samples::F32(v) => v[start..end].iter().map(|&s| s * s).sum::<f32>(),
    };
    Some((sum_squares / count).sqrt())
}

/// Scale an RMS amplitude by the mouth sensitivity and clamp to [0,1].
pub fn lip_value(rms: f32, sensitivity: f32) -> f32 {
    (rms * sensitivity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn lip_value_is_always_clamped() {
        for &sensitivity in &[0.0, 0.5, 1.0, 10.0, 1_000.0] {
            for &rms in &[0.0, 0.01, 0.7, 1.0, 50.0] {
                let v = lip_value(rms, sensitivity);
                assert!((0.0..=1.0).contains(&v), "rms={rms} sens={sensitivity} -> {v}");
            }
        }
    }

    #[test]
    fn window_past_end_is_clamped_to_available_samples() {
        let samples = Samples::F32(vec![0.5; 100]);
        let rms = window_rms(&samples, 90, 1024).unwrap();
        assert!((rms - 0.5).abs() < 1e-5);
    }

    #[test]
    fn window_beyond_end_yields_none() {
        let samples = Samples::F32(vec![0.5; 100]);
        assert!(window_rms(&samples, 2048, 1024).is_none());
    }

    #[test]
    fn int_pcm_is_normalized_to_full_scale() {
        let samples = Samples::I16(vec![16384; 2048]);
        let rms = window_rms(&samples, 1024, 1024).unwrap();
        assert!((rms - 0.5).abs() < 1e-3);
    }

    #[test]
    fn silence_has_zero_rms() {
        let samples = Samples::I16(vec![0; 2048]);
        assert_eq!(window_rms(&samples, 100, 1024), Some(0.0));
    }

    #[test]
    fn sanitize_replaces_hyphens_but_not_the_original() {
        let display = "well-known\nfact";
        let spoken = sanitize_for_tts(display);
        assert_eq!(spoken, "well known fact");
        assert_eq!(display, "well-known\nfact");
    }

    struct BrokenClipTts;

    impl TtsProvider for BrokenClipTts {
        fn name(&self) -> &'static str {
            "broken"
        }

        // A zero-rate clip: synthesis "succeeds" but playback cannot.
        fn synthesize(&self, _text: &str) -> Option<crate::tts::AudioClip> {
            Some(crate::tts::AudioClip {
                sample_rate: 0,
                samples: Samples::F32(vec![0.5; 64]),
            })
        }
    }

    #[test]
    fn unplayable_clip_falls_back_to_text_with_default_duration() {
        let stage = SpeechStage {
            provider: Some(Box::new(BrokenClipTts)),
            sensitivity: 1.0,
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        stage.speak("hello", "Joy", &tx);

        match rx.try_recv().unwrap() {
            PipelineEvent::Expression(tag) => assert_eq!(tag, "Joy"),
            other => panic!("expected expression, got {other:?}"),
        }
        // The reply carries the text fallback duration, not the clip's, and
        // no lip-sync frames were streamed.
        match rx.try_recv().unwrap() {
            PipelineEvent::Reply { text, duration_secs, .. } => {
                assert_eq!(text, "hello");
                assert_eq!(duration_secs, DEFAULT_TEXT_SECS);
            }
            other => panic!("expected reply, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_provider_falls_back_to_text_with_default_duration() {
        let stage = SpeechStage::new(&AppConfig::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        stage.speak("hello", "Joy", &tx);

        match rx.try_recv().unwrap() {
            PipelineEvent::Expression(tag) => assert_eq!(tag, "Joy"),
            other => panic!("expected expression, got {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PipelineEvent::Reply { text, emotion, duration_secs } => {
                assert_eq!(text, "hello");
                assert_eq!(emotion, "Joy");
                assert_eq!(duration_secs, DEFAULT_TEXT_SECS);
            }
            other => panic!("expected reply, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
