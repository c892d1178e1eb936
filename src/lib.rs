//! daily-snap-rs: daily photo prompt, photo judging, narration and streaks.
//!
//! - `prompt`: per-day cached prompt with deterministic offline fallback
//! - `judge`: photo vs. prompt verdicts from a vision model
//! - `narrator`: spoken photo descriptions for accessibility mode
//! - `streak`: consecutive-day submission streaks
//! - `gateway`: Gemini and speech transports
//! - `store`: local JSONL submission history
//! - `api`: axum HTTP surface

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod judge;
pub mod narrator;
pub mod photo;
pub mod prompt;
pub mod store;
pub mod streak;

#[cfg(test)]
mod testing;

pub use error::GatewayError;
pub use judge::Verdict;
pub use photo::Photo;
pub use prompt::Prompt;
pub use streak::SubmissionRecord;
