pub mod elevenlabs;
pub mod gpt_sovits;
pub mod typecast;

use std::io::Cursor;

use crate::config::{TtsConfig, TtsProviderKind};

/// PCM payload of a synthesized clip. Integer and float WAVs both occur in
/// the wild; the lip-sync math normalizes each differently, so the
/// representation is kept rather than converted eagerly.
#[derive(Debug, Clone)]
pub enum Samples {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::I16(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub samples: Samples,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// A speech-synthesis backend.
///
/// `synthesize` returning `None` means "use text-only fallback"; the reason
/// is logged by the provider, never propagated. Keeping failure out of the
/// signature makes synthesis non-fatal everywhere by construction.
pub trait TtsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn synthesize(&self, text: &str) -> Option<AudioClip>;
}

/// Select the synthesis backend, or `None` when TTS is disabled.
pub fn create_provider(config: &TtsConfig) -> Option<Box<dyn TtsProvider>> {
    if !config.enabled {
        return None;
    }
    Some(match config.provider {
        TtsProviderKind::Typecast => Box::new(typecast::TypecastTts::new(&config.typecast)),
        TtsProviderKind::ElevenLabs => {
            Box::new(elevenlabs::ElevenLabsTts::new(&config.elevenlabs))
        }
        TtsProviderKind::GptSovits => {
            Box::new(gpt_sovits::GptSovitsTts::new(&config.gpt_sovits))
        }
    })
}

/// Decode a WAV payload into a clip, keeping its PCM representation.
/// Multi-channel audio is downmixed by taking the first channel.
pub(crate) fn decode_wav(bytes: &[u8]) -> Option<AudioClip> {
    let mut reader = match hound::WavReader::new(Cursor::new(bytes)) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("could not decode WAV: {e}");
            return None;
        }
    };
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => {
            let all: Vec<i16> = reader.samples::<i16>().filter_map(|s| s.ok()).collect();
            Samples::I16(all.into_iter().step_by(channels).collect())
        }
        (hound::SampleFormat::Float, 32) => {
            let all: Vec<f32> = reader.samples::<f32>().filter_map(|s| s.ok()).collect();
            Samples::F32(all.into_iter().step_by(channels).collect())
        }
        (format, bits) => {
            log::warn!("unsupported WAV format: {format:?} {bits}-bit");
            return None;
        }
    };

    if samples.is_empty() {
        log::warn!("decoded WAV had no samples");
        return None;
    }

    Some(AudioClip { sample_rate: spec.sample_rate, samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, write: impl Fn(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_int16_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for s in [0i16, 1000, -1000, 32767] {
                w.write_sample(s).unwrap();
            }
        });
        let clip = decode_wav(&bytes).unwrap();
        assert_eq!(clip.sample_rate, 22050);
        match clip.samples {
            Samples::I16(v) => assert_eq!(v, vec![0, 1000, -1000, 32767]),
            _ => panic!("expected i16 samples"),
        }
    }

    #[test]
    fn decodes_float_wav_and_downmixes_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            // Left channel ascending, right channel constant.
            for i in 0..4 {
                w.write_sample(i as f32 * 0.1).unwrap();
                w.write_sample(0.9f32).unwrap();
            }
        });
        let clip = decode_wav(&bytes).unwrap();
        match clip.samples {
            Samples::F32(v) => {
                assert_eq!(v.len(), 4);
                assert!((v[2] - 0.2).abs() < 1e-6);
            }
            _ => panic!("expected f32 samples"),
        }
    }

    #[test]
    fn garbage_bytes_decode_to_none() {
        assert!(decode_wav(b"definitely not a wav").is_none());
    }

    #[test]
    fn duration_uses_sample_count_over_rate() {
        let clip = AudioClip {
            sample_rate: 1000,
            samples: Samples::F32(vec![0.0; 2500]),
        };
        assert!((clip.duration_secs() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn disabled_config_selects_no_provider() {
        let config = TtsConfig::default();
        assert!(create_provider(&config).is_none());
    }

    #[test]
    fn enabled_config_selects_by_kind() {
        let mut config = TtsConfig::default();
        config.enabled = true;
        config.provider = TtsProviderKind::Typecast;
        assert_eq!(create_provider(&config).unwrap().name(), "Typecast");
        config.provider = TtsProviderKind::ElevenLabs;
        assert_eq!(create_provider(&config).unwrap().name(), "ElevenLabs");
        config.provider = TtsProviderKind::GptSovits;
        assert_eq!(create_provider(&config).unwrap().name(), "GPT-SoVITS");
    }
}
