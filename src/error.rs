//! Errors raised by the network gateways.
//!
//! Only `gateway::model` and `gateway::speech` return these. Everything
//! above them converts failures into ordinary values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No credential configured. Raised before any request is sent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The endpoint answered with a non-success status.
    #[error("transport error {status}: {body}")]
    Transport { status: u16, body: String },

    /// Connection, timeout or body-read failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response was not the expected JSON envelope.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
