//! Photo judging against the day's prompt.
//!
//! The model is asked for `{"matches": bool, "feedback": string}` and
//! nothing else, but replies often arrive wrapped in prose or code fences.
//! Parsing is two separate stages: `extract_json_object` finds the outermost
//! braces, `parse_verdict` decodes them with defaulted fields. Every failure
//! becomes a `Verdict`; nothing here returns an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::gateway::{GenerationOptions, ModelGateway, Part};
use crate::photo::Photo;

const JUDGE_INSTRUCTION: &str = r#"You are the judge for a daily photo scavenger hunt.
Today's prompt is: "{prompt}"

Decide whether the attached photo reasonably satisfies the prompt. Be generous
with creative interpretations, but reject photos that are unrelated to it.

Reply with ONLY this JSON object and nothing else:
{"matches": true or false, "feedback": "one short, friendly sentence explaining the decision"}"#;

const OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.2,
    max_output_tokens: 256,
};

pub const NO_IMAGE_FEEDBACK: &str = "no image received";

pub const EMPTY_REPLY_FEEDBACK: &str = "ERROR: the model returned an empty reply. \
Check that the Gemini API key is valid and that billing is enabled for its project.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub matches: bool,
    /// Never empty.
    pub feedback: String,
}

impl Verdict {
    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self {
            matches: false,
            feedback: feedback.into(),
        }
    }
}

#[derive(Deserialize)]
struct VerdictReply {
    matches: Option<bool>,
    feedback: Option<String>,
}

pub struct PhotoJudge {
    model: Arc<dyn ModelGateway>,
}

impl PhotoJudge {
    pub fn new(model: Arc<dyn ModelGateway>) -> Self {
        Self { model }
    }

    pub async fn judge(&self, prompt: &str, photo: Option<&Photo>) -> Verdict {
        let Some(photo) = photo.filter(|p| !p.is_empty()) else {
            info!("Judge called without a photo");
            return Verdict::rejected(NO_IMAGE_FEEDBACK);
        };

        let instruction = JUDGE_INSTRUCTION.replace("{prompt}", prompt.trim());
        let parts = [photo.to_part(), Part::text(instruction)];
        debug!(
            "Judging {} byte {} photo against \"{}\"",
            photo.bytes.len(),
            photo.mime_type,
            prompt.trim()
        );

        let verdict = match self.model.infer(&parts, OPTIONS).await {
            Ok(raw) if raw.trim().is_empty() => {
                warn!("Judge got an empty reply from the model");
                Verdict::rejected(EMPTY_REPLY_FEEDBACK)
            }
            Ok(raw) => parse_verdict(&raw),
            Err(e) => {
                warn!("Judge request failed: {e}");
                Verdict::rejected(format!("ERROR: {e}"))
            }
        };

        info!("Verdict for \"{}\": matches={}", prompt.trim(), verdict.matches);
        verdict
    }
}

/// Remove Markdown code-fence markers, keeping their contents.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}

/// Slice from the first `{` to the last `}`, inclusive. `None` when either
/// brace is missing or the last `}` comes before the first `{`, so a reply
/// like `} ... {` counts as having no JSON rather than failing to parse.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Turn a raw model reply into a verdict, tolerating prose around the JSON.
pub fn parse_verdict(raw: &str) -> Verdict {
    let trimmed = raw.trim();
    let cleaned = strip_code_fences(trimmed);

    let Some(json) = extract_json_object(&cleaned) else {
        return Verdict::rejected(format!("No JSON found in model reply: {trimmed}"));
    };

    match serde_json::from_str::<VerdictReply>(json) {
        Ok(reply) => Verdict {
            matches: reply.matches.unwrap_or(false),
            feedback: reply
                .feedback
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| trimmed.to_string()),
        },
        Err(e) => Verdict::rejected(format!("ERROR: {e}")),
    }
}
