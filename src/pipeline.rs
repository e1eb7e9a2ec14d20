use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::audio::capture::{CaptureBuffer, CapturedAudio};
use crate::chat;
use crate::config::AppConfig;
use crate::conversation::ConversationEngine;
use crate::emotion::NEUTRAL;
use crate::error::{PipelineError, Result};
use crate::speech::SpeechStage;
use crate::stt::Transcriber;

/// Display duration for the "no speech detected" placeholder.
const EMPTY_TRANSCRIPT_SECS: f32 = 2.0;

/// Display duration for short-lived error messages.
const ERROR_TEXT_SECS: f32 = 4.0;

/// Everything the pipeline tells the presentation layer, delivered over a
/// channel the UI thread drains on its own schedule. Success and failure
/// replies share the `Reply` variant; errors differ only in content.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Status indicator text ("Listening…", "Thinking…"); empty clears it.
    Status(String),
    /// Facial expression tag for the renderer.
    Expression(String),
    /// Chat bubble text with how long to show it.
    Reply { text: String, emotion: String, duration_secs: f32 },
    /// Mouth-open amount in [0,1].
    LipSync(f32),
    /// The turn worker is done and the pipeline is Idle again.
    TurnFinished,
}

/// Where the pipeline is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Capturing,
    Transcribing,
    Responding,
    Speaking,
}

/// Stage objects rebuilt whenever settings change; each turn works from the
/// snapshot taken at its start.
struct Stages {
    transcriber: Arc<Transcriber>,
    speech: Arc<SpeechStage>,
    input_device: Option<usize>,
}

impl Stages {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            transcriber: Arc::new(Transcriber::from_config(&config.ai)),
            speech: Arc::new(SpeechStage::new(config)),
            input_device: config.ai.input_device_index(),
        }
    }
}

/// Sequences one user turn: capture → transcription → conversation →
/// speech, each post-capture stage on a background worker so the caller
/// (the UI loop) never blocks. Only one turn may be in flight; a capture
/// request while not Idle is rejected, not queued.
pub struct Pipeline {
    state: Arc<Mutex<TurnState>>,
    capture: CaptureBuffer,
    engine: Arc<ConversationEngine>,
    stages: Stages,
    events: Sender<PipelineEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Build the pipeline and hand back the event stream the presentation
    /// layer should drain.
    pub fn new(config: &AppConfig) -> (Self, Receiver<PipelineEvent>) {
        let (events, receiver) = unbounded();
        let provider: Arc<dyn chat::ChatProvider> = Arc::from(chat::create_provider(&config.ai));
        let engine = Arc::new(ConversationEngine::new(provider, &config.ai));
        let pipeline = Self {
            state: Arc::new(Mutex::new(TurnState::Idle)),
            capture: CaptureBuffer::new(),
            engine,
            stages: Stages::from_config(config),
            events,
            worker: None,
        };
        (pipeline, receiver)
    }

    pub fn state(&self) -> TurnState {
        *self.state.lock()
    }

    pub fn engine(&self) -> &Arc<ConversationEngine> {
        &self.engine
    }

    /// Re-select providers and stage settings after a settings change.
    /// In-flight turns keep the snapshot they started with.
    pub fn reconfigure(&mut self, config: &AppConfig) {
        self.engine.set_provider(Arc::from(chat::create_provider(&config.ai)));
        self.engine.set_memory_enabled(config.ai.memory_enabled);
        self.engine.set_emotions_enabled(config.ai.emotions_enabled);
        self.engine.set_system_prompt(&config.ai.system_prompt);
        self.stages = Stages::from_config(config);
    }

    /// Key-down: begin recording. Rejected unless Idle.
    pub fn start_capture(&mut self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != TurnState::Idle {
                return Err(PipelineError::AlreadyCapturing);
            }
            *state = TurnState::Capturing;
        }

        if let Err(e) = self.capture.start(self.stages.input_device) {
            *self.state.lock() = TurnState::Idle;
            return Err(e);
        }
        let _ = self.events.send(PipelineEvent::Status("Listening…".to_string()));
        Ok(())
    }

    /// Key-up: stop recording and run the rest of the turn on a worker.
    pub fn finish_capture(&mut self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != TurnState::Capturing {
                return Err(PipelineError::NotCapturing);
            }
            *state = TurnState::Transcribing;
        }

        let audio = match self.capture.stop() {
            Ok(audio) => audio,
            Err(e) => {
                // Per-turn terminal error: surface it through the normal
                // reply path and go back to Idle without transcribing.
                self.emit_error(&e);
                *self.state.lock() = TurnState::Idle;
                return Err(e);
            }
        };

        // The previous worker (if any) already drove its turn to Idle, so
        // this join returns immediately; it just reaps the thread.
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        let _ = self.events.send(PipelineEvent::Status("Thinking…".to_string()));

        let state = self.state.clone();
        let engine = self.engine.clone();
        let transcriber = self.stages.transcriber.clone();
        let speech = self.stages.speech.clone();
        let events = self.events.clone();
        self.worker = Some(std::thread::spawn(move || {
            run_turn(&state, &engine, &transcriber, &speech, &events, audio);
        }));
        Ok(())
    }

    /// Abandon a capture without running a turn (e.g. gesture cancelled).
    pub fn cancel_capture(&mut self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != TurnState::Capturing {
                return Err(PipelineError::NotCapturing);
            }
            *state = TurnState::Idle;
        }
        let _ = self.capture.stop();
        let _ = self.events.send(PipelineEvent::Status(String::new()));
        Ok(())
    }

    fn emit_error(&self, error: &PipelineError) {
        let _ = self.events.send(PipelineEvent::Status(String::new()));
        let _ = self.events.send(PipelineEvent::Reply {
            text: format!("Error: {error}"),
            emotion: NEUTRAL.to_string(),
            duration_secs: ERROR_TEXT_SECS,
        });
    }

    #[cfg(test)]
    fn set_state(&self, state: TurnState) {
        *self.state.lock() = state;
    }

    #[cfg(test)]
    fn start_silent_capture(&mut self) {
        *self.state.lock() = TurnState::Capturing;
        self.capture.start_silent();
    }

    #[cfg(test)]
    fn capture_frames_for_test(&self, frames: Vec<f32>) {
        self.capture.push_frames(&frames);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Body of the per-turn worker thread.
fn run_turn(
    state: &Mutex<TurnState>,
    engine: &ConversationEngine,
    transcriber: &Transcriber,
    speech: &SpeechStage,
    events: &Sender<PipelineEvent>,
    audio: CapturedAudio,
) {
    log::info!("transcribing {:.2}s of audio", audio.duration_secs());
    let user_text = match transcriber.transcribe(&audio.samples, audio.sample_rate) {
        Ok(text) => text,
        Err(e) => {
            log::error!("{e}");
            let _ = events.send(PipelineEvent::Status(String::new()));
            let _ = events.send(PipelineEvent::Reply {
                text: format!("Error: {e}"),
                emotion: NEUTRAL.to_string(),
                duration_secs: ERROR_TEXT_SECS,
            });
            finish(state, events);
            return;
        }
    };

    if user_text.trim().is_empty() {
        // No speech detected. Valid outcome; skip the conversation engine.
        let _ = events.send(PipelineEvent::Status(String::new()));
        let _ = events.send(PipelineEvent::Reply {
            text: "…".to_string(),
            emotion: NEUTRAL.to_string(),
            duration_secs: EMPTY_TRANSCRIPT_SECS,
        });
        finish(state, events);
        return;
    }

    log::info!("user said: {user_text}");
    *state.lock() = TurnState::Responding;
    let result = engine.respond(&user_text);
    log::info!("reply: {}", result.raw_reply);

    *state.lock() = TurnState::Speaking;
    let _ = events.send(PipelineEvent::Status(String::new()));
    speech.speak(&result.display_text, &result.emotion, events);

    finish(state, events);
}

fn finish(state: &Mutex<TurnState>, events: &Sender<PipelineEvent>) {
    *state.lock() = TurnState::Idle;
    let _ = events.send(PipelineEvent::TurnFinished);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain_until_finished(rx: &Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut seen = Vec::new();
        loop {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("worker did not finish");
            let done = matches!(event, PipelineEvent::TurnFinished);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[test]
    fn capture_rejected_while_turn_in_flight() {
        let (mut pipeline, _rx) = Pipeline::new(&AppConfig::default());
        for state in [TurnState::Capturing, TurnState::Transcribing, TurnState::Speaking] {
            pipeline.set_state(state);
            assert!(matches!(
                pipeline.start_capture(),
                Err(PipelineError::AlreadyCapturing)
            ));
            assert_eq!(pipeline.state(), state);
        }
    }

    #[test]
    fn empty_capture_reports_error_and_returns_to_idle() {
        let (mut pipeline, rx) = Pipeline::new(&AppConfig::default());
        pipeline.start_silent_capture();

        let result = pipeline.finish_capture();
        assert!(matches!(result, Err(PipelineError::NoAudioCaptured)));
        assert_eq!(pipeline.state(), TurnState::Idle);

        // Status cleared, then the error reply; transcription never ran, so
        // there is no "Thinking…" status.
        match rx.try_recv().unwrap() {
            PipelineEvent::Status(s) => assert!(s.is_empty()),
            other => panic!("expected status, got {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PipelineEvent::Reply { text, duration_secs, .. } => {
                assert!(text.contains("no audio captured"));
                assert_eq!(duration_secs, ERROR_TEXT_SECS);
            }
            other => panic!("expected reply, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn cancelled_capture_discards_audio_and_clears_status() {
        let (mut pipeline, rx) = Pipeline::new(&AppConfig::default());
        pipeline.start_silent_capture();
        pipeline.capture_frames_for_test(vec![0.1; 512]);

        pipeline.cancel_capture().unwrap();
        assert_eq!(pipeline.state(), TurnState::Idle);
        match rx.try_recv().unwrap() {
            PipelineEvent::Status(s) => assert!(s.is_empty()),
            other => panic!("expected status, got {other:?}"),
        }
        // No reply, no turn: the audio was dropped.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn finish_without_capture_is_rejected() {
        let (mut pipeline, _rx) = Pipeline::new(&AppConfig::default());
        assert!(matches!(
            pipeline.finish_capture(),
            Err(PipelineError::NotCapturing)
        ));
        assert_eq!(pipeline.state(), TurnState::Idle);
    }

    #[test]
    fn empty_transcript_short_circuits_the_engine() {
        let (mut pipeline, rx) = Pipeline::new(&AppConfig::default());
        pipeline.stages.transcriber = Arc::new(Transcriber::Fixed("   ".to_string()));
        pipeline.start_silent_capture();
        // Feed one fake frame so stop() succeeds.
        pipeline.capture_frames_for_test(vec![0.1; 512]);

        pipeline.finish_capture().unwrap();
        let events = drain_until_finished(&rx);

        assert_eq!(pipeline.state(), TurnState::Idle);
        // History untouched: the conversation engine never ran.
        assert_eq!(pipeline.engine().history().len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Reply { text, duration_secs, .. }
                if text == "…" && *duration_secs == EMPTY_TRANSCRIPT_SECS
        )));
    }

    #[test]
    fn failed_transcription_reports_error_and_skips_the_engine() {
        let (mut pipeline, rx) = Pipeline::new(&AppConfig::default());
        pipeline.stages.transcriber =
            Arc::new(Transcriber::Unavailable("no speech backend configured".to_string()));
        pipeline.start_silent_capture();
        pipeline.capture_frames_for_test(vec![0.1; 512]);

        pipeline.finish_capture().unwrap();
        let events = drain_until_finished(&rx);

        assert_eq!(pipeline.state(), TurnState::Idle);
        // History untouched: the turn ended before the conversation engine.
        assert_eq!(pipeline.engine().history().len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Reply { text, duration_secs, .. }
                if text.starts_with("Error: transcription unavailable")
                    && *duration_secs == ERROR_TEXT_SECS
        )));
    }

    #[test]
    fn full_turn_runs_to_idle_with_error_shaped_reply() {
        // Default config has no API key, so the OpenAI provider answers with
        // error-shaped text without any network traffic; the turn still
        // "succeeds" and history gains the user and assistant entries.
        let (mut pipeline, rx) = Pipeline::new(&AppConfig::default());
        pipeline.stages.transcriber = Arc::new(Transcriber::Fixed("hello".to_string()));
        pipeline.start_silent_capture();
        pipeline.capture_frames_for_test(vec![0.1; 512]);

        pipeline.finish_capture().unwrap();
        let events = drain_until_finished(&rx);

        assert_eq!(pipeline.state(), TurnState::Idle);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Reply { text, .. } if text.starts_with("OpenAI Error:")
        )));

        let history = pipeline.engine().history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].content, "hello");
    }
}
