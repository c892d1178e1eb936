//! ElevenLabs text-to-speech: the primary speech strategy.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::audio::AudioOutput;
use super::speech::{Playback, SpeechStrategy, Utterance};
use crate::config::SpeechConfig;
use crate::error::GatewayError;

pub struct ElevenLabsClient {
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
    base_url: String,
    client: Client,
}

impl ElevenLabsClient {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            api_key: config.resolve_api_key(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Fetch encoded audio for `text`.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GatewayError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(GatewayError::Configuration(
                "missing ElevenLabs API key (set speech.api_key or ELEVENLABS_API_KEY)".into(),
            ));
        };

        let url = format!("{}/v1/text-to-speech/{}/stream", self.base_url, self.voice_id);
        let body = json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": self.stability,
                "similarity_boost": self.similarity_boost
            }
        });

        let resp = self
            .client
            .post(&url)
            .header("xi-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let audio = resp.bytes().await?.to_vec();
        debug!("ElevenLabs returned {} bytes of audio", audio.len());
        Ok(audio)
    }
}

/// Synthesize remotely, then hand the audio to a local output device.
pub struct ElevenLabsStrategy {
    client: ElevenLabsClient,
    output: Arc<dyn AudioOutput>,
}

impl ElevenLabsStrategy {
    pub fn new(client: ElevenLabsClient, output: Arc<dyn AudioOutput>) -> Self {
        Self { client, output }
    }
}

#[async_trait]
impl SpeechStrategy for ElevenLabsStrategy {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn prepare(&self, text: &str) -> Result<Box<dyn Utterance>, GatewayError> {
        let audio = self.client.synthesize(text).await?;
        Ok(Box::new(SynthesizedAudio {
            audio,
            output: self.output.clone(),
        }))
    }
}

struct SynthesizedAudio {
    audio: Vec<u8>,
    output: Arc<dyn AudioOutput>,
}

impl Utterance for SynthesizedAudio {
    fn play(self: Box<Self>) -> Result<Box<dyn Playback>, GatewayError> {
        let SynthesizedAudio { audio, output } = *self;
        output.play(audio)
    }
}
