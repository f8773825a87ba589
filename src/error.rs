//! Error types for persona-studio.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    /// No audio output device could be opened.
    #[error("audio output is not supported in this environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("unknown persona: {0}")]
    UnknownPersona(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("no audio data received from API")]
    NoAudioData,

    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PCM payload has odd length {0}, expected 16-bit samples")]
    OddPcmLength(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("missing API key: set {0}")]
    MissingApiKey(String),

    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("a tool named {0} already exists")]
    DuplicateTool(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;
