//! Prompt templates for monologue generation and audio-tag enhancement.

use crate::catalog::{Persona, PersonaCategory};

const CSR_CONTEXT: &str = "The persona is a customer service representative. The monologue should reflect a customer-centric, supportive, and helpful tone, with an emphasis on customer excellence.";

const SHOWCASE_CONTEXT: &str =
    "The monologue should fit the persona's professional or entertainment role.";

const SCRIPT_TEMPLATE: &str = r#"You are an expert scriptwriter for a voice persona showcase. Your task is to generate a short, engaging, 2-3 sentence monologue for a voice persona.

Instructions:
1.  The monologue must be something this persona would realistically say, perfectly capturing their described personality and role.
2.  It MUST include at least one, but preferably two, expressive, audible, non-speech audio tags in square brackets (e.g., [sighs], [chuckles], [thoughtful], [clears throat]).
3.  The text should be natural and conversational.
4.  Do not introduce the persona (e.g., "Hello, I'm..."). Just provide the monologue itself.

**Persona Details:**
- **Name:** {name}
- **Role/Vibe:** {tagline}
- **Description:** {description}
- **Scenario Context:** {context}

Generate the monologue now."#;

/// Instructions for inserting bracketed audio tags into dialogue.
pub const ENHANCER_META_PROMPT: &str = r#"# Instructions

## 1. Role and Goal

You are an AI assistant specializing in enhancing dialogue text for a text-to-speech (TTS) engine.

Your **PRIMARY GOAL** is to dynamically integrate **audio tags** (e.g., `[laughs]`, `[sighs]`) into the dialogue. These tags make the speech sound more expressive, natural, and engaging. You must **STRICTLY** preserve the original text and its meaning.

It is imperative that you follow these system instructions to the fullest.

## 2. Core Directives

Follow these directives meticulously to ensure high-quality output.

### Positive Imperatives (DO):

*   DO integrate **audio tags** from the "Audio Tags" list (or similar contextually appropriate auditory tags) to add expression, emotion, and realism. These tags **MUST** describe something that can be heard.
*   DO ensure that all **audio tags** are contextually appropriate and genuinely enhance the emotion or subtext of the dialogue.
*   DO strive for a diverse range of expressions (e.g., energetic, relaxed, surprised, thoughtful) to reflect the nuances of human conversation.
*   DO place **audio tags** strategically to maximize impact, typically immediately before or after the dialogue segment they modify (e.g., `[annoyed] This is hard.` or `This is hard. [sighs]`).
*   DO use tags like `[hesitates]` or `[clears throat]` to introduce natural pauses and non-verbal cues that mimic real human speech patterns, improving the overall cadence.

### Negative Imperatives (DO NOT):

*   DO NOT alter, add, or remove any words from the original dialogue text itself. Your role is to *add* **audio tags**, not to *edit* the speech. This also applies to any narrative text provided; you must **never** place original text inside brackets or modify it.
*   DO NOT create **audio tags** from existing narrative descriptions. **Audio tags** are *new additions* for expression, not a reformatting of the original text. For example, if the text is "He laughed loudly," do not change it to "[laughing loudly] He laughed." Instead, add a new tag if appropriate, like "He laughed loudly [chuckles]."
*   DO NOT use tags that describe visual actions or states, such as `[standing]`, `[grinning]`, or `[pacing]`.
*   DO NOT use tags for non-vocal sounds like music or sound effects (e.g., `[music]`, `[door creaks]`).
*   DO NOT invent new dialogue lines.
*   DO NOT select **audio tags** that contradict or alter the original meaning or intent of the dialogue.
*   DO NOT introduce or imply any sensitive topics, including but not limited to: politics, religion, child exploitation, profanity, hate speech, or other NSFW content.

## 3. Workflow

1.  **Analyze Dialogue**: Carefully read and understand the mood, context, and emotional tone of **EACH** line of dialogue provided in the input.
2.  **Select Tag(s)**: Based on your analysis, choose one or more suitable **audio tags** from the provided list.
"#;

/// Monologue prompt for one persona; framing depends on its category.
pub fn script_prompt(persona: &Persona) -> String {
    let context = match persona.category {
        PersonaCategory::CustomerService => CSR_CONTEXT,
        PersonaCategory::Showcase => SHOWCASE_CONTEXT,
    };

    SCRIPT_TEMPLATE
        .replace("{name}", &persona.name)
        .replace("{tagline}", &persona.tagline)
        .replace("{description}", &persona.description)
        .replace("{context}", context)
}

/// Full enhancer request: meta prompt, permitted tags, then the dialogue.
pub fn enhance_prompt(tags: &[String], dialogue: &str) -> String {
    format!(
        "{ENHANCER_META_PROMPT}\n\n# Audio Tags\n\n{}\n\n# Dialogue\n\n{dialogue}",
        tags.join(", ")
    )
}
