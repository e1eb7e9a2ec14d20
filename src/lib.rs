//! Conversation and audio pipeline for a desktop AI companion overlay.
//!
//! The overlay window, Live2D renderer, and settings UI live elsewhere; this
//! crate owns everything between "the push-to-talk key went down" and "the
//! character finished speaking": microphone capture, speech-to-text,
//! chat-completion dispatch with conversational memory and emotion tags,
//! speech synthesis, and the real-time lip-sync signal.
//!
//! The presentation layer drives a [`pipeline::Pipeline`] from its input
//! handlers and drains [`pipeline::PipelineEvent`]s on its render loop.

pub mod audio;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod pipeline;
pub mod speech;
pub mod stt;
pub mod tts;

pub use config::AppConfig;
pub use conversation::{ConversationEngine, TurnResult};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineEvent, TurnState};
