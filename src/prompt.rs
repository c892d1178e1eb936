//! Daily prompt generation with a per-day cache and offline fallback.
//!
//! At most one generation call per calendar day per running provider. If
//! the model fails or returns nothing usable, the prompt comes from a fixed
//! list indexed by days since the Unix epoch, so every device shows the
//! same fallback on the same day.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::gateway::{GenerationOptions, ModelGateway, Part};

const PROMPT_INSTRUCTION: &str = r#"You are a creative director for a daily photo scavenger hunt app.
Generate a single short, evocative photo prompt for today.

Rules:
- 1-4 words only (e.g. "Golden hour", "Something tiny", "Your hands")
- Should be achievable anywhere, indoors or outdoors
- Spark curiosity or a moment of noticing something beautiful
- Do NOT add punctuation, quotes, or explanation. Output just the prompt itself

Today's date: {date}"#;

const OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.9,
    max_output_tokens: 20,
};

const MAX_PROMPT_WORDS: usize = 4;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

pub const FALLBACK_PROMPTS: &[&str] = &[
    "Golden hour",
    "Something tiny",
    "Your hands",
    "Shadows",
    "Something blue",
    "Reflections",
    "A quiet corner",
    "Texture",
    "Morning light",
    "Something round",
    "Looking up",
    "Patterns",
    "Your view right now",
    "Something old",
    "A splash of red",
    "Symmetry",
    "Through a window",
    "Something growing",
    "Leading lines",
    "Comfort",
    "Opposites",
    "Something soft",
    "Street level",
    "Your favorite mug",
    "Motion",
    "Green",
    "Something handmade",
    "Doorways",
    "Lights at night",
    "Small joys",
];

/// Source of "today". Swapped out in tests to control day rollover.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub text: String,
    pub day: NaiveDate,
    pub source: PromptSource,
}

impl Prompt {
    /// Cache key: the ISO date (`YYYY-MM-DD`) this prompt belongs to.
    pub fn day_key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

pub struct PromptProvider {
    model: Arc<dyn ModelGateway>,
    clock: Arc<dyn Clock>,
    fallback: Vec<String>,
    /// Held across the generation call so concurrent callers share one result.
    cache: Mutex<Option<Prompt>>,
}

impl PromptProvider {
    pub fn new(model: Arc<dyn ModelGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            model,
            clock,
            fallback: FALLBACK_PROMPTS.iter().map(|p| p.to_string()).collect(),
            cache: Mutex::new(None),
        }
    }

    /// Replace the offline list. An empty list keeps the built-in one.
    pub fn with_fallback(mut self, prompts: Vec<String>) -> Self {
        let prompts: Vec<String> = prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !prompts.is_empty() {
            self.fallback = prompts;
        }
        self
    }

    /// Today's prompt. Never fails.
    pub async fn get_prompt(&self) -> Prompt {
        let today = self.clock.today();
        let mut cache = self.cache.lock().await;

        if let Some(prompt) = cache.as_ref().filter(|p| p.day == today) {
            debug!("Prompt cache hit for {}", prompt.day_key());
            return prompt.clone();
        }

        let prompt = self.generate(today).await;
        info!("Prompt for {}: \"{}\" ({:?})", prompt.day_key(), prompt.text, prompt.source);
        *cache = Some(prompt.clone());
        prompt
    }

    async fn generate(&self, day: NaiveDate) -> Prompt {
        let instruction = PROMPT_INSTRUCTION.replace("{date}", &day.format("%Y-%m-%d").to_string());

        match self.model.infer(&[Part::text(instruction)], OPTIONS).await {
            Ok(raw) => match sanitize_prompt(&raw) {
                Some(text) => Prompt {
                    text,
                    day,
                    source: PromptSource::Generated,
                },
                None => {
                    warn!("Unusable prompt from model ({raw:?}), using fallback");
                    self.fallback_for(day)
                }
            },
            Err(e) => {
                warn!("Prompt generation failed: {e}, using fallback");
                self.fallback_for(day)
            }
        }
    }

    fn fallback_for(&self, day: NaiveDate) -> Prompt {
        Prompt {
            text: fallback_prompt(&self.fallback, day)
                .or_else(|| fallback_prompt(FALLBACK_PROMPTS, day))
                .unwrap_or_default()
                .to_string(),
            day,
            source: PromptSource::Fallback,
        }
    }
}

/// Days since 1970-01-01; negative before it.
pub fn epoch_days(day: NaiveDate) -> i64 {
    i64::from(day.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
}

/// `list[epoch_days mod len]`, or `None` for an empty list.
pub fn fallback_prompt<S: AsRef<str>>(list: &[S], day: NaiveDate) -> Option<&str> {
    let len = i64::try_from(list.len()).ok().filter(|&len| len > 0)?;
    let index = epoch_days(day).rem_euclid(len) as usize;
    list.get(index).map(|p| p.as_ref())
}

/// First non-empty line with quotes and trailing punctuation stripped.
/// `None` when nothing is left or the result is longer than four words.
pub fn sanitize_prompt(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let cleaned = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '\u{201C}' | '\u{201D}'))
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim();

    let words = cleaned.split_whitespace().count();
    if words == 0 || words > MAX_PROMPT_WORDS {
        return None;
    }
    Some(cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}
