//! Speech gateway: one utterance at a time, ordered fallback strategies.
//!
//! `speak` tries each strategy in order until one starts playback. A new
//! `speak` or a `stop` supersedes whatever is playing; the superseded call
//! resolves as `Cancelled`. Strategies split synthesis from playback so a
//! call superseded mid-synthesis never makes a sound. The gateway is the only
//! owner of the active playback handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::audio::RodioOutput;
use super::elevenlabs::{ElevenLabsClient, ElevenLabsStrategy};
use super::local_voice::LocalVoice;
use crate::config::Config;
use crate::error::GatewayError;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A live audio resource. Dropping it releases the underlying handle.
pub trait Playback: Send {
    fn is_finished(&mut self) -> bool;
    fn stop(&mut self);
}

/// Synthesized speech that has not been played yet.
pub trait Utterance: Send {
    /// Open the output and start sound. The only step allowed to do either.
    fn play(self: Box<Self>) -> Result<Box<dyn Playback>, GatewayError>;
}

/// One way of turning text into sound. An error means "try the next one".
#[async_trait]
pub trait SpeechStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// Network and synthesis work. Must not touch the audio device.
    async fn prepare(&self, text: &str) -> Result<Box<dyn Utterance>, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SpeakOutcome {
    /// Blank text; nothing was attempted.
    Skipped,
    Completed { strategy: &'static str },
    /// Superseded by a later `speak` or by `stop`.
    Cancelled,
    /// Every strategy failed. Narration is best-effort, so this is not an error.
    Unavailable,
}

struct ActivePlayback {
    generation: u64,
    strategy: &'static str,
    playback: Box<dyn Playback>,
}

pub struct SpeechGateway {
    strategies: Vec<Box<dyn SpeechStrategy>>,
    generation: AtomicU64,
    active: Mutex<Option<ActivePlayback>>,
    poll_interval: Duration,
}

impl SpeechGateway {
    pub fn new(strategies: Vec<Box<dyn SpeechStrategy>>) -> Self {
        Self {
            strategies,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// ElevenLabs first, then the local synthesizer.
    pub fn from_config(config: &Config) -> Self {
        let remote = ElevenLabsStrategy::new(
            ElevenLabsClient::new(&config.speech),
            Arc::new(RodioOutput),
        );
        let local = LocalVoice::new(&config.local_voice);
        Self::new(vec![Box::new(remote), Box::new(local)])
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_speaking(&self) -> bool {
        self.slot().is_some()
    }

    /// Speak `text`, resolving when playback ends or is superseded.
    pub async fn speak(&self, text: &str) -> SpeakOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SpeakOutcome::Skipped;
        }

        let generation = self.supersede();
        let preview: String = text.chars().take(60).collect();
        debug!("speak #{generation}: \"{preview}\"");

        for strategy in &self.strategies {
            if self.is_superseded(generation) {
                return SpeakOutcome::Cancelled;
            }
            let utterance = match strategy.prepare(text).await {
                Ok(utterance) => utterance,
                Err(e) => {
                    warn!("{} speech failed: {e}, trying next strategy", strategy.name());
                    continue;
                }
            };
            match self.play_if_current(generation, strategy.name(), utterance) {
                Ok(true) => return self.wait_for(generation).await,
                Ok(false) => {
                    debug!("speak #{generation} superseded before playback");
                    return SpeakOutcome::Cancelled;
                }
                Err(e) => warn!("{} playback failed: {e}, trying next strategy", strategy.name()),
            }
        }

        warn!("No speech strategy available, skipping narration");
        SpeakOutcome::Unavailable
    }

    /// Stop whatever is playing. Safe to call at any time.
    pub fn stop(&self) {
        let generation = self.supersede();
        debug!("stop (generation {generation})");
    }

    /// Bump the generation and release the active handle, if any.
    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(mut previous) = self.slot().take() {
            previous.playback.stop();
            info!("Stopped {} playback", previous.strategy);
        }
        generation
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// Start `utterance` unless a newer call got in first. Check, play and
    /// install all happen under the slot lock: a superseded utterance is
    /// dropped unplayed, and a concurrent `stop` waits for the new handle
    /// and then releases it.
    fn play_if_current(
        &self,
        generation: u64,
        strategy: &'static str,
        utterance: Box<dyn Utterance>,
    ) -> Result<bool, GatewayError> {
        let mut slot = self.slot();
        if self.is_superseded(generation) {
            return Ok(false);
        }
        if let Some(mut stale) = slot.take() {
            stale.playback.stop();
        }
        let playback = utterance.play()?;
        *slot = Some(ActivePlayback {
            generation,
            strategy,
            playback,
        });
        Ok(true)
    }

    async fn wait_for(&self, generation: u64) -> SpeakOutcome {
        loop {
            if let Some(outcome) = self.poll(generation) {
                return outcome;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn poll(&self, generation: u64) -> Option<SpeakOutcome> {
        let mut slot = self.slot();
        match slot.as_mut() {
            Some(active) if active.generation == generation => {
                if active.playback.is_finished() {
                    let strategy = active.strategy;
                    *slot = None;
                    Some(SpeakOutcome::Completed { strategy })
                } else {
                    None
                }
            }
            _ => Some(SpeakOutcome::Cancelled),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActivePlayback>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
