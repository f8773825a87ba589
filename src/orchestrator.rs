//! Request orchestration with a single in-flight slot.
//!
//! IDLE → LOADING → (PLAYING | ERROR) → IDLE
//!
//! A trigger claims the loading slot under the state lock; while it is held
//! every other trigger is dropped. Script generation always completes and
//! is recorded before synthesis starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::{self, AudioBackend, AudioBuffer, AudioSessionManager, ContextState, OutputContext};
use crate::catalog::{Catalog, Persona};
use crate::config::Config;
use crate::error::{Result, StudioError};
use crate::gemini::GenerativeApi;
use crate::history::{now_timestamp, Outcome, TranscriptArchive, TranscriptRecord};
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub persona_name: String,
    pub script: String,
}

/// Which persona, if any, is loading, playing, or errored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestState {
    pub loading: Option<String>,
    pub playing: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct StudioState {
    request: RequestState,
    active_transcript: Option<TranscriptEntry>,
    history: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub request: RequestState,
    pub active_transcript: Option<TranscriptEntry>,
    pub history_len: usize,
    /// Id of the live playback session.
    pub session: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// Another request was loading.
    Ignored,
    /// The persona was playing and has been stopped.
    Stopped,
    Playing,
    Failed,
}

/// Clears the loading slot however the request ends, including when the
/// request future is dropped mid-flight.
struct LoadingGuard<'a> {
    state: &'a Mutex<StudioState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().request.loading = None;
    }
}

pub struct Orchestrator {
    api: Arc<dyn GenerativeApi>,
    catalog: Arc<Catalog>,
    backend: Arc<dyn AudioBackend>,
    audio: AudioSessionManager,
    /// Opened on the first trigger, then reused.
    context: Mutex<Option<Box<dyn OutputContext>>>,
    state: Arc<Mutex<StudioState>>,
    last_audio: Mutex<Option<AudioBuffer>>,
    archive: Option<TranscriptArchive>,
    script_model: String,
    tts_model: String,
    enhancer_model: String,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn GenerativeApi>,
        backend: Arc<dyn AudioBackend>,
        catalog: Arc<Catalog>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            catalog,
            backend,
            audio: AudioSessionManager::new(Duration::from_millis(config.audio.poll_interval_ms.max(1))),
            context: Mutex::new(None),
            state: Arc::new(Mutex::new(StudioState::default())),
            last_audio: Mutex::new(None),
            archive: None,
            script_model: config.api.script_model.clone(),
            tts_model: config.api.tts_model.clone(),
            enhancer_model: config.api.enhancer_model.clone(),
        }
    }

    pub fn with_archive(mut self, archive: TranscriptArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn status(&self) -> StatusSnapshot {
        let session = self.audio.active_session().map(|handle| handle.id());
        let state = self.state.lock();
        StatusSnapshot {
            request: state.request.clone(),
            active_transcript: state.active_transcript.clone(),
            history_len: state.history.len(),
            session,
        }
    }

    pub fn history(&self) -> Vec<TranscriptEntry> {
        self.state.lock().history.clone()
    }

    /// The most recently decoded audio, if any request got that far.
    pub fn last_audio(&self) -> Option<AudioBuffer> {
        self.last_audio.lock().clone()
    }

    /// Whether a playback session is live.
    pub fn is_playing(&self) -> bool {
        self.audio.is_active()
    }

    /// Stop whatever is playing. Returns whether anything was.
    pub fn stop(&self) -> bool {
        self.state.lock().request.playing = None;
        self.audio.stop()
    }

    /// Handle a play/stop press for one persona.
    ///
    /// Failures inside the request are absorbed into the persona's error
    /// state; only an unknown persona id is returned as an error.
    pub async fn trigger(&self, persona_id: &str) -> Result<TriggerOutcome> {
        let persona = self
            .catalog
            .get(persona_id)
            .cloned()
            .ok_or_else(|| StudioError::UnknownPersona(persona_id.into()))?;

        {
            let mut state = self.state.lock();
            if let Some(loading) = &state.request.loading {
                debug!("Request for {loading} in flight, ignoring {persona_id}");
                return Ok(TriggerOutcome::Ignored);
            }

            if state.request.playing.as_deref() == Some(persona_id) {
                state.request.playing = None;
                drop(state);
                self.audio.stop();
                info!("Stopped {}", persona.name);
                return Ok(TriggerOutcome::Stopped);
            }

            state.request.loading = Some(persona.id.clone());
            state.request.playing = None;
            state.request.error = None;
        }
        self.audio.stop();
        info!("State: IDLE → LOADING ({})", persona.id);

        let _loading = LoadingGuard { state: &self.state };

        match self.run(&persona).await {
            Ok(()) => {
                info!("State: LOADING → PLAYING ({})", persona.id);
                Ok(TriggerOutcome::Playing)
            }
            Err(e) => {
                warn!("Error generating audio for {}: {e}", persona.name);
                self.state.lock().request.error = Some(persona.id.clone());
                Ok(TriggerOutcome::Failed)
            }
        }
    }

    async fn run(&self, persona: &Persona) -> Result<()> {
        self.ensure_context()?;

        let t_script = Instant::now();
        let prompt = prompts::script_prompt(persona);
        let script = self
            .api
            .generate_text(&self.script_model, &prompt)
            .await?
            .trim()
            .to_string();
        let script_ms = t_script.elapsed().as_millis() as i64;
        info!("Script for {} ({} chars, {script_ms}ms)", persona.name, script.len());

        let entry = TranscriptEntry {
            persona_name: persona.name.clone(),
            script: script.clone(),
        };
        {
            let mut state = self.state.lock();
            state.active_transcript = Some(entry.clone());
            state.history.push(entry);
        }

        let t_synthesis = Instant::now();
        let result = self.speak(persona, &script).await;
        let synthesis_ms = t_synthesis.elapsed().as_millis() as i64;

        if let Some(archive) = self.archive.clone() {
            let record = TranscriptRecord {
                timestamp: now_timestamp(),
                persona_id: persona.id.clone(),
                persona_name: persona.name.clone(),
                voice: persona.voice_name.clone(),
                script,
                script_latency_ms: script_ms,
                synthesis_latency_ms: result.is_ok().then_some(synthesis_ms),
                audio_duration_s: result.as_ref().ok().copied(),
                outcome: if result.is_ok() { Outcome::Played } else { Outcome::Failed },
                error: result.as_ref().err().map(ToString::to_string),
            };
            if let Err(e) = tokio::task::spawn_blocking(move || archive.save(&record)).await {
                warn!("Transcript archive task failed: {e}");
            }
        }

        result.map(|_| ())
    }

    /// Synthesize, decode, and start playback. Returns the audio duration.
    async fn speak(&self, persona: &Persona, script: &str) -> Result<f64> {
        let response = self
            .api
            .synthesize_speech(&self.tts_model, script, &persona.voice_name)
            .await?;
        let payload = response.audio_data().ok_or(StudioError::NoAudioData)?;
        let buffer = audio::decode_audio_data(&audio::decode(payload)?)?;
        let duration = buffer.duration_secs();
        *self.last_audio.lock() = Some(buffer.clone());

        // Marked before starting so an immediate completion still clears it.
        self.state.lock().request.playing = Some(persona.id.clone());

        let state = Arc::clone(&self.state);
        let persona_id = persona.id.clone();
        let on_complete = move || {
            let mut state = state.lock();
            if state.request.playing.as_deref() == Some(persona_id.as_str()) {
                state.request.playing = None;
                debug!("Playback finished for {persona_id}");
            }
        };

        let started = {
            let context = self.context.lock();
            match context.as_deref() {
                Some(context) => self.audio.start(buffer, context, on_complete),
                None => Err(StudioError::UnsupportedEnvironment("output context closed".into())),
            }
        };

        match started {
            Ok(handle) => {
                debug!("{} playing as session {}", persona.id, handle.id());
                Ok(duration)
            }
            Err(e) => {
                self.state.lock().request.playing = None;
                Err(e)
            }
        }
    }

    fn ensure_context(&self) -> Result<()> {
        let mut guard = self.context.lock();
        if guard.is_none() {
            *guard = Some(self.backend.open()?);
        }
        if let Some(context) = guard.as_mut() {
            if context.state() == ContextState::Suspended {
                info!("Resuming suspended audio output");
                context.resume()?;
            }
        }
        Ok(())
    }

    /// Insert audio tags into `dialogue`, restricted to `tags`.
    pub async fn enhance(&self, tags: &[String], dialogue: &str) -> Result<String> {
        let prompt = prompts::enhance_prompt(tags, dialogue);
        self.api.generate_text(&self.enhancer_model, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode_pcm, FakeApi, FakeBackend};
    use tokio::sync::Semaphore;

    const SCRIPT: &str = "[sighs] I hear you, and we'll sort this out together. [warmly] Let's take it one step at a time.";

    fn pcm() -> Option<String> {
        Some(encode_pcm(&[0, 1000, -1000, 32767]))
    }

    fn orchestrator(api: Arc<FakeApi>, backend: FakeBackend) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            api,
            Arc::new(backend),
            Arc::new(Catalog::builtin()),
            &Config::default(),
        ))
    }

    #[tokio::test]
    async fn successful_trigger_plays_and_records_transcript() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let backend = FakeBackend::default();
        let orch = orchestrator(Arc::clone(&api), backend.clone());

        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Playing);

        let status = orch.status();
        assert_eq!(status.request.playing.as_deref(), Some("clara"));
        assert_eq!(status.request.loading, None);
        assert_eq!(status.request.error, None);
        assert_eq!(
            orch.history(),
            vec![TranscriptEntry {
                persona_name: "Clara".into(),
                script: SCRIPT.into(),
            }]
        );
        assert_eq!(status.active_transcript.unwrap().script, SCRIPT);
        assert_eq!(api.voices.lock().as_slice(), ["Orus"]);
        assert!(api.prompts.lock()[0].contains("- **Name:** Clara"));
        assert_eq!(backend.sources().len(), 1);
        assert_eq!(orch.last_audio().unwrap().frame_count(), 4);
    }

    #[tokio::test]
    async fn missing_audio_marks_error_but_keeps_transcript() {
        let api = Arc::new(FakeApi::new(SCRIPT, None));
        let backend = FakeBackend::default();
        let orch = orchestrator(Arc::clone(&api), backend.clone());

        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Failed);

        let status = orch.status();
        assert_eq!(status.request.error.as_deref(), Some("clara"));
        assert_eq!(status.request.loading, None);
        assert_eq!(status.request.playing, None);
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.history()[0].script, SCRIPT);
        assert!(backend.sources().is_empty());
    }

    #[tokio::test]
    async fn failed_script_leaves_history_empty() {
        let api = Arc::new(FakeApi::failing_script());
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        assert_eq!(orch.trigger("nova").await.unwrap(), TriggerOutcome::Failed);
        assert_eq!(orch.status().request.error.as_deref(), Some("nova"));
        assert!(orch.history().is_empty());
        assert_eq!(api.speech_calls(), 0);
    }

    #[tokio::test]
    async fn malformed_audio_is_a_request_failure() {
        let api = Arc::new(FakeApi::new(SCRIPT, Some("%%%not-base64%%%".into())));
        let orch = orchestrator(api, FakeBackend::default());

        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Failed);
        let status = orch.status();
        assert_eq!(status.request.error.as_deref(), Some("clara"));
        assert_eq!(status.request.playing, None);
    }

    #[tokio::test]
    async fn retrying_clears_the_error() {
        let api = Arc::new(FakeApi::new(SCRIPT, None));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        orch.trigger("clara").await.unwrap();
        assert_eq!(orch.status().request.error.as_deref(), Some("clara"));

        api.set_audio(pcm());
        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Playing);
        let status = orch.status();
        assert_eq!(status.request.error, None);
        assert_eq!(status.request.playing.as_deref(), Some("clara"));
        assert_eq!(orch.history().len(), 2);
    }

    #[tokio::test]
    async fn triggering_the_playing_persona_stops_it() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let backend = FakeBackend::default();
        let orch = orchestrator(Arc::clone(&api), backend.clone());

        orch.trigger("clara").await.unwrap();
        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Stopped);

        assert_eq!(orch.status().request.playing, None);
        assert_eq!(orch.status().session, None);
        assert!(!orch.is_playing());
        assert!(backend.sources()[0].was_stopped());
        assert_eq!(api.text_calls(), 1);
        assert_eq!(api.speech_calls(), 1);
        assert_eq!(orch.history().len(), 1);
    }

    #[tokio::test]
    async fn switching_personas_tears_down_previous_playback() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let backend = FakeBackend::default();
        let orch = orchestrator(Arc::clone(&api), backend.clone());

        orch.trigger("clara").await.unwrap();
        assert_eq!(orch.trigger("james").await.unwrap(), TriggerOutcome::Playing);

        let status = orch.status();
        assert_eq!(status.request.playing.as_deref(), Some("james"));
        assert_eq!(status.session, Some(2));
        let sources = backend.sources();
        assert!(sources[0].was_stopped());
        assert!(!sources[1].was_stopped());
        assert_eq!(backend.max_concurrent(), 1);
        assert_eq!(api.voices.lock().as_slice(), ["Orus", "Zephyr"]);
    }

    #[tokio::test]
    async fn triggers_while_loading_are_dropped() {
        let gate = Arc::new(Semaphore::new(0));
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()).gated(Arc::clone(&gate)));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        let first = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.trigger("clara").await }
        });
        while api.text_calls() == 0 {
            tokio::task::yield_now().await;
        }

        let before = orch.status().request;
        assert_eq!(before.loading.as_deref(), Some("clara"));
        assert_eq!(orch.trigger("james").await.unwrap(), TriggerOutcome::Ignored);
        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Ignored);
        assert_eq!(orch.status().request, before);
        assert_eq!(api.text_calls(), 1);

        gate.add_permits(1);
        assert_eq!(first.await.unwrap().unwrap(), TriggerOutcome::Playing);
        assert_eq!(orch.status().request.loading, None);
    }

    #[tokio::test]
    async fn dropping_an_in_flight_request_releases_the_slot() {
        let gate = Arc::new(Semaphore::new(0));
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()).gated(Arc::clone(&gate)));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        let pending = tokio::spawn({
            let orch = Arc::clone(&orch);
            async move { orch.trigger("clara").await }
        });
        while api.text_calls() == 0 {
            tokio::task::yield_now().await;
        }
        pending.abort();
        let _ = pending.await;

        assert_eq!(orch.status().request.loading, None);
        gate.add_permits(1);
        assert_eq!(orch.trigger("james").await.unwrap(), TriggerOutcome::Playing);
    }

    #[tokio::test]
    async fn unsupported_output_marks_error_without_remote_calls() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::unsupported());

        assert_eq!(orch.trigger("clara").await.unwrap(), TriggerOutcome::Failed);
        let status = orch.status();
        assert_eq!(status.request.error.as_deref(), Some("clara"));
        assert_eq!(status.request.loading, None);
        assert_eq!(api.text_calls(), 0);
    }

    #[tokio::test]
    async fn output_context_is_opened_once_and_resumed() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let backend = FakeBackend::suspended();
        let orch = orchestrator(api, backend.clone());

        orch.trigger("clara").await.unwrap();
        orch.trigger("james").await.unwrap();

        assert_eq!(backend.opened(), 1);
        assert_eq!(backend.resumed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn natural_completion_returns_to_idle() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let backend = FakeBackend::default();
        let orch = orchestrator(api, backend.clone());

        orch.trigger("clara").await.unwrap();
        assert!(orch.is_playing());
        backend.sources()[0].finish();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(orch.status().request, RequestState::default());
        assert!(!orch.is_playing());
    }

    #[tokio::test]
    async fn unknown_persona_is_rejected_before_any_state_change() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        assert!(matches!(
            orch.trigger("nobody").await,
            Err(StudioError::UnknownPersona(_))
        ));
        assert_eq!(orch.status().request, RequestState::default());
        assert_eq!(api.text_calls(), 0);
    }

    #[tokio::test]
    async fn explicit_stop_clears_playing() {
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let orch = orchestrator(api, FakeBackend::default());

        assert!(!orch.stop());
        orch.trigger("maya").await.unwrap();
        assert!(orch.stop());
        assert_eq!(orch.status().request.playing, None);
    }

    #[tokio::test]
    async fn completed_requests_are_archived() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(SCRIPT, pcm()));
        let orch = Orchestrator::new(
            api,
            Arc::new(FakeBackend::default()),
            Arc::new(Catalog::builtin()),
            &Config::default(),
        )
        .with_archive(TranscriptArchive::new(dir.path()));

        orch.trigger("clara").await.unwrap();

        let records = TranscriptArchive::new(dir.path()).load("today");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].persona_id, "clara");
        assert_eq!(records[0].outcome, Outcome::Played);
        assert_eq!(records[0].voice, "Orus");
    }

    #[tokio::test]
    async fn enhance_sends_tags_and_dialogue() {
        let api = Arc::new(FakeApi::new("[laughs] You did it!", None));
        let orch = orchestrator(Arc::clone(&api), FakeBackend::default());

        let tags = vec!["laughs".to_string()];
        let enhanced = orch.enhance(&tags, "You did it!").await.unwrap();
        assert_eq!(enhanced, "[laughs] You did it!");
        let prompt = api.prompts.lock()[0].clone();
        assert!(prompt.ends_with("# Dialogue\n\nYou did it!"));
        assert_eq!(orch.status().request, RequestState::default());
    }
}
