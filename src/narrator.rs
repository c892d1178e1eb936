//! Spoken descriptions for accessibility mode.
//!
//! Callers check the accessibility flag before using this; the narrator
//! itself does not. Both operations are best-effort and never fail.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::gateway::{GenerationOptions, ModelGateway, Part, SpeakOutcome, SpeechGateway};
use crate::photo::Photo;

const DESCRIBE_INSTRUCTION: &str = r#"Describe this photo in 1-2 vivid sentences for someone listening rather than looking.
{context}
Focus on what is present: subjects, colours, light, textures, mood.
Do not start with "This image shows", "A photo of" or similar. Describe it directly.
Keep it under 30 words."#;

const OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.3,
    max_output_tokens: 60,
};

pub const FALLBACK_DESCRIPTION: &str = "User submitted photo for today's prompt.";

pub struct Narrator {
    model: Arc<dyn ModelGateway>,
    speech: Arc<SpeechGateway>,
}

impl Narrator {
    pub fn new(model: Arc<dyn ModelGateway>, speech: Arc<SpeechGateway>) -> Self {
        Self { model, speech }
    }

    /// A short sensory description, or `FALLBACK_DESCRIPTION`.
    pub async fn describe_photo(&self, photo: &Photo, prompt: Option<&str>) -> String {
        if photo.is_empty() {
            return FALLBACK_DESCRIPTION.to_string();
        }

        let context = match prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => format!("The photo was taken in response to the prompt: \"{p}\"."),
            None => String::new(),
        };
        let instruction = DESCRIBE_INSTRUCTION.replace("{context}", &context);

        match self.model.infer(&[photo.to_part(), Part::text(instruction)], OPTIONS).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!("Photo description: {text}");
                text.trim().to_string()
            }
            Ok(_) => {
                warn!("Empty photo description, using fallback");
                FALLBACK_DESCRIPTION.to_string()
            }
            Err(e) => {
                warn!("Photo description failed: {e}, using fallback");
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }

    /// Speak `text`, replacing anything already being spoken.
    pub async fn announce(&self, text: &str) -> SpeakOutcome {
        self.speech.speak(text).await
    }

    /// Describe, then speak the description. Returns what was spoken.
    pub async fn narrate_photo(&self, photo: &Photo, prompt: Option<&str>) -> String {
        let description = self.describe_photo(photo, prompt).await;
        self.announce(&description).await;
        description
    }

    pub fn silence(&self) {
        self.speech.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedModel};

    fn narrator(model: Arc<ScriptedModel>) -> Narrator {
        // No strategies: speaking resolves as Unavailable without touching audio.
        Narrator::new(model, Arc::new(SpeechGateway::new(Vec::new())))
    }

    fn photo() -> Photo {
        Photo::new(vec![1, 2, 3], "image/png")
    }

    #[tokio::test]
    async fn returns_trimmed_model_description() {
        let model = Arc::new(ScriptedModel::text("  Warm sunlight pools across a wooden table.\n"));
        let narrator = narrator(model.clone());

        let text = narrator.describe_photo(&photo(), Some("Golden hour")).await;

        assert_eq!(text, "Warm sunlight pools across a wooden table.");
        let instruction = model.last_instruction();
        assert!(instruction.contains("prompt: \"Golden hour\""));
        assert!(instruction.contains("under 30 words"));
        assert_eq!(model.last_options(), Some(OPTIONS));
    }

    #[tokio::test]
    async fn failures_fall_back_to_fixed_sentence() {
        for reply in [
            Reply::Text("   ".into()),
            Reply::Transport(500, "boom".into()),
            Reply::MissingKey,
        ] {
            let narrator = narrator(Arc::new(ScriptedModel::new(reply)));
            assert_eq!(narrator.describe_photo(&photo(), None).await, FALLBACK_DESCRIPTION);
        }
    }

    #[tokio::test]
    async fn empty_photo_skips_the_model() {
        let model = Arc::new(ScriptedModel::text("unused"));
        let narrator = narrator(model.clone());

        let text = narrator.describe_photo(&Photo::new(Vec::new(), "image/jpeg"), None).await;

        assert_eq!(text, FALLBACK_DESCRIPTION);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn announce_never_fails_without_speech_backends() {
        let narrator = narrator(Arc::new(ScriptedModel::text("unused")));
        assert_eq!(narrator.announce("Feed updated").await, SpeakOutcome::Unavailable);
        assert_eq!(narrator.announce("  ").await, SpeakOutcome::Skipped);
        narrator.silence();
    }

    #[tokio::test]
    async fn narrate_photo_returns_spoken_text() {
        let narrator = narrator(Arc::new(ScriptedModel::text("A blue bicycle against a brick wall.")));
        assert_eq!(
            narrator.narrate_photo(&photo(), None).await,
            "A blue bicycle against a brick wall."
        );
    }
}
