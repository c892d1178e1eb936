//! Transports to the external services.
//!
//! - `model`: Gemini multimodal inference
//! - `speech`: single-utterance speech gateway with ordered fallback
//! - `elevenlabs`: remote synthesis strategy
//! - `local_voice`: offline synthesizer strategy
//! - `audio`: rodio playback of encoded audio

pub mod audio;
pub mod elevenlabs;
pub mod local_voice;
pub mod model;
pub mod speech;

pub use model::{GeminiGateway, GenerationOptions, ModelGateway, Part};
pub use speech::{Playback, SpeakOutcome, SpeechGateway, SpeechStrategy, Utterance};
