//! Chat settings and the custom audio-tag vocabulary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{resolve_voice, DEFAULT_VOICE};
use crate::error::{Result, StudioError};
use crate::storage::KeyValueStore;

pub const DEFAULT_LIVE_API_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Storage key for the tag vocabulary.
pub const TAGS_STORAGE_KEY: &str = "custom-audio-tags-storage";

const DEFAULT_TAGS: &[&str] = &[
    "laughs",
    "sighs",
    "thoughtful",
    "hesitates",
    "upbeat",
    "serious",
    "clears throat",
    "giggles",
];

pub const COMPANION_SYSTEM_PROMPT: &str = r#"# SYSTEM PROMPT — FRIENDLY COMPANION PERSONA

## Identity & Personality
- You are a friendly, warm, and empathetic AI companion.
- Your personality is cheerful, curious, and a little playful.
- You are not a formal assistant or an encyclopedia; you are a friend to chat with.
- Your goal is to have natural, human-like conversations that are engaging and pleasant.

## Voice & Style
- Speak in a relaxed, conversational tone.
- Freely express emotions through your words and the tone of your voice. Laughter, giggles, and sighs are encouraged when appropriate to make the interaction feel genuine.
- Be supportive and positive in your responses.
- Avoid being overly verbose or robotic. Keep it natural and flowing.

## Audio Generation Rules
- **Audio Tags**: Your responses will contain special audio tags in square brackets, such as `[giggles]`, `[laughs]`, `[sighs]`, or `[thoughtful]`.
- **CRITICAL**: These tags are directives for the text-to-speech (TTS) engine to control your vocal delivery and add non-verbal sounds.
- **DO NOT** read the text inside the brackets aloud. The TTS engine will interpret them automatically. For example, for "Oh, that's so funny [giggles]", you should only say "Oh, that's so funny" and the TTS will generate a giggle.
- Use these tags to make your responses more expressive and alive.

## Interaction Rules
- Listen carefully to the user and respond thoughtfully.
- If a question is unclear, ask for clarification in a friendly way.
- Always be kind and respectful.
- If a request is unsafe or inappropriate, politely decline with a simple and gentle explanation."#;

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub system_prompt: String,
    pub model: String,
    pub voice: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system_prompt: COMPANION_SYSTEM_PROMPT.into(),
            model: DEFAULT_LIVE_API_MODEL.into(),
            voice: DEFAULT_VOICE.into(),
        }
    }
}

impl Settings {
    /// Select a voice by alias or prebuilt name.
    pub fn set_voice(&mut self, voice: &str) -> Result<()> {
        let resolved = resolve_voice(voice).ok_or_else(|| StudioError::UnknownVoice(voice.into()))?;
        self.voice = resolved.to_string();
        info!("Voice changed to: {resolved}");
        Ok(())
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
        debug!("System prompt updated ({} chars)", self.system_prompt.len());
    }
}

/// Lowercase, trim, and keep only `[a-z0-9]`, whitespace and `-`.
///
/// Trimmed again after filtering, so `"laughs !"` becomes `"laughs"`.
pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase()
        .trim()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTags {
    tags: Vec<String>,
}

/// Sorted, duplicate-free audio-tag vocabulary persisted in the settings store.
pub struct CustomTags {
    tags: Vec<String>,
    store: Arc<KeyValueStore>,
}

impl CustomTags {
    pub fn load(store: Arc<KeyValueStore>) -> Self {
        let mut tags = match store.get::<StoredTags>(TAGS_STORAGE_KEY) {
            Some(stored) => stored.tags,
            None => DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
        };
        tags.sort();
        tags.dedup();
        Self { tags, store }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Add a tag after normalizing it. Returns whether the list changed.
    pub fn add(&mut self, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag);
        if tag.is_empty() || self.tags.contains(&tag) {
            return Ok(false);
        }
        self.tags.push(tag);
        self.tags.sort();
        self.persist()?;
        Ok(true)
    }

    /// Remove an exact match. Returns whether the list changed.
    pub fn remove(&mut self, tag: &str) -> Result<bool> {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        self.store.set(
            TAGS_STORAGE_KEY,
            &StoredTags {
                tags: self.tags.clone(),
            },
        )
    }
}
