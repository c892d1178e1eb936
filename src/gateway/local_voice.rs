//! Offline speech via a local synthesizer binary (espeak-ng by default).
//!
//! Lower fidelity, no network. The process itself is the playback handle.

use std::process::{Child, Command, Stdio};

use async_trait::async_trait;
use tracing::debug;

use super::speech::{Playback, SpeechStrategy, Utterance};
use crate::config::LocalVoiceConfig;
use crate::error::GatewayError;

const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;

pub struct LocalVoice {
    command: String,
    rate: f32,
    pitch: f32,
}

impl LocalVoice {
    pub fn new(config: &LocalVoiceConfig) -> Self {
        Self {
            command: config.command.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }

    /// espeak-style arguments: `-s <wpm> -p <0..99> <text>`.
    fn args(&self, text: &str) -> Vec<String> {
        let wpm = (BASE_WORDS_PER_MINUTE * self.rate).round().max(80.0) as u32;
        let pitch = (BASE_PITCH * self.pitch).round().clamp(0.0, 99.0) as u32;
        vec![
            "-s".into(),
            wpm.to_string(),
            "-p".into(),
            pitch.to_string(),
            text.to_string(),
        ]
    }
}

#[async_trait]
impl SpeechStrategy for LocalVoice {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn prepare(&self, text: &str) -> Result<Box<dyn Utterance>, GatewayError> {
        Ok(Box::new(LocalUtterance {
            command: self.command.clone(),
            args: self.args(text),
        }))
    }
}

/// A synthesizer invocation waiting to be spawned.
struct LocalUtterance {
    command: String,
    args: Vec<String>,
}

impl Utterance for LocalUtterance {
    fn play(self: Box<Self>) -> Result<Box<dyn Playback>, GatewayError> {
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GatewayError::Playback(format!("failed to start {}: {e}", self.command)))?;
        debug!("Local voice started (pid {})", child.id());
        Ok(Box::new(ProcessPlayback { child: Some(child) }))
    }
}

struct ProcessPlayback {
    child: Option<Child>,
}

impl Playback for ProcessPlayback {
    fn is_finished(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(None) => false,
            Ok(Some(_)) | Err(_) => {
                self.child = None;
                true
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            // Reap so no zombie outlives the utterance.
            let _ = child.wait();
        }
    }
}

impl Drop for ProcessPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
