//! Test doubles shared across module tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{GenerationOptions, ModelGateway, Part};

pub enum Reply {
    Text(String),
    Transport(u16, String),
    MissingKey,
}

/// A model that always gives the same reply and records what it was sent.
pub struct ScriptedModel {
    reply: Reply,
    calls: AtomicUsize,
    last_parts: Mutex<Vec<Part>>,
    last_options: Mutex<Option<GenerationOptions>>,
}

impl ScriptedModel {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_parts: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_parts(&self) -> Vec<Part> {
        self.last_parts.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<GenerationOptions> {
        *self.last_options.lock().unwrap()
    }

    /// Concatenated text parts of the last request.
    pub fn last_instruction(&self) -> String {
        self.last_parts()
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ModelGateway for ScriptedModel {
    async fn infer(&self, parts: &[Part], options: GenerationOptions) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_parts.lock().unwrap() = parts.to_vec();
        *self.last_options.lock().unwrap() = Some(options);
        // Yield so concurrent callers can interleave.
        tokio::task::yield_now().await;
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Transport(status, body) => Err(GatewayError::Transport {
                status: *status,
                body: body.clone(),
            }),
            Reply::MissingKey => Err(GatewayError::Configuration("missing Gemini API key".into())),
        }
    }
}
