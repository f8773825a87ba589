//! Test doubles for the audio output and the generative API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::audio::{AudioBackend, AudioBuffer, ContextState, OutputContext, PlaybackSource};
use crate::error::{Result, StudioError};
use crate::gemini::{Candidate, Content, GenerateContentResponse, GenerativeApi, InlineData, Part};

/// Encode i16 samples as base64 little-endian PCM.
pub fn encode_pcm(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

pub fn speech_response(audio: Option<&str>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![Part {
                    inline_data: audio.map(|data| InlineData {
                        data: Some(data.to_string()),
                    }),
                    ..Part::default()
                }],
            }),
        }],
    }
}

#[derive(Default)]
pub struct FakeSource {
    stopped: AtomicBool,
    finished: AtomicBool,
}

impl FakeSource {
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn is_live(&self) -> bool {
        !self.was_stopped() && !self.finished.load(Ordering::SeqCst)
    }
}

struct SharedSource(Arc<FakeSource>);

impl PlaybackSource for SharedSource {
    fn stop(&self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.0.finished.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct BackendInner {
    sources: Mutex<Vec<Arc<FakeSource>>>,
    max_concurrent: AtomicUsize,
    opened: AtomicUsize,
    resumed: AtomicUsize,
    unsupported: AtomicBool,
    start_suspended: AtomicBool,
}

/// Records every buffer played and how many were live at once.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<BackendInner>,
}

impl FakeBackend {
    pub fn unsupported() -> Self {
        let backend = Self::default();
        backend.inner.unsupported.store(true, Ordering::SeqCst);
        backend
    }

    pub fn suspended() -> Self {
        let backend = Self::default();
        backend.inner.start_suspended.store(true, Ordering::SeqCst);
        backend
    }

    pub fn sources(&self) -> Vec<Arc<FakeSource>> {
        self.inner.sources.lock().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn resumed(&self) -> usize {
        self.inner.resumed.load(Ordering::SeqCst)
    }
}

impl AudioBackend for FakeBackend {
    fn open(&self) -> Result<Box<dyn OutputContext>> {
        if self.inner.unsupported.load(Ordering::SeqCst) {
            return Err(StudioError::UnsupportedEnvironment("no output device".into()));
        }
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        let state = if self.inner.start_suspended.load(Ordering::SeqCst) {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Ok(Box::new(FakeContext {
            inner: Arc::clone(&self.inner),
            state,
        }))
    }
}

struct FakeContext {
    inner: Arc<BackendInner>,
    state: ContextState,
}

impl OutputContext for FakeContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        self.inner.resumed.fetch_add(1, Ordering::SeqCst);
        self.state = ContextState::Running;
        Ok(())
    }

    fn play(&self, _buffer: AudioBuffer) -> Result<Box<dyn PlaybackSource>> {
        let source = Arc::new(FakeSource::default());
        let mut sources = self.inner.sources.lock();
        let live = sources.iter().filter(|s| s.is_live()).count() + 1;
        self.inner.max_concurrent.fetch_max(live, Ordering::SeqCst);
        sources.push(Arc::clone(&source));
        Ok(Box::new(SharedSource(source)))
    }
}

/// Scripted generative API.
pub struct FakeApi {
    script: String,
    audio: Mutex<Option<String>>,
    fail_script: bool,
    gate: Option<Arc<Semaphore>>,
    text_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub voices: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(script: &str, audio: Option<String>) -> Self {
        Self {
            script: script.to_string(),
            audio: Mutex::new(audio),
            fail_script: false,
            gate: None,
            text_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            voices: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_script() -> Self {
        Self {
            fail_script: true,
            ..Self::new("", None)
        }
    }

    /// Text generation waits for a permit on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_audio(&self, audio: Option<String>) {
        *self.audio.lock() = audio;
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeApi for FakeApi {
    async fn generate_text(&self, _model: &str, prompt: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| StudioError::EmptyResponse)?
                .forget();
        }
        if self.fail_script {
            return Err(StudioError::Api {
                status: 500,
                body: "internal".into(),
            });
        }
        Ok(self.script.clone())
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _text: &str,
        voice: &str,
    ) -> Result<GenerateContentResponse> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().push(voice.to_string());
        Ok(speech_response(self.audio.lock().as_deref()))
    }
}
