//! Audio session manager: PCM decode + single-session rodio playback.
//!
//! Gemini TTS returns base64 raw PCM (16-bit LE, 24kHz, mono). That
//! format is fixed here; a mismatch plays as noise rather than failing.
//!
//! At most one playback session is live at a time. Every session gets a
//! monotonically increasing id, and the completion watcher only clears
//! the active slot (and fires its callback) while its id is still the
//! active one.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::mixer::Mixer;
use rodio::{OutputStreamBuilder, Sink};
use tracing::{debug, info};

use crate::error::{Result, StudioError};

pub const SAMPLE_RATE: u32 = 24000;
pub const CHANNELS: u16 = 1;

/// Decoded, playable audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Write the buffer as a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            // inverse of decode_audio_data, exact for decoded samples
            let s = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        info!("Saved WAV to {}", path.display());
        Ok(())
    }
}

/// Decode a base64 string into raw bytes.
pub fn decode(base64_text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(base64_text.trim())?)
}

/// Interpret bytes as 16-bit LE mono PCM at 24kHz, normalized to [-1.0, 1.0).
pub fn decode_audio_data(bytes: &[u8]) -> Result<AudioBuffer> {
    if bytes.len() % 2 != 0 {
        return Err(StudioError::OddPcmLength(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioBuffer {
        sample_rate: SAMPLE_RATE,
        channels: CHANNELS,
        samples,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Output paused by the host until resumed. Rodio streams never report it.
    #[cfg_attr(not(test), allow(dead_code))]
    Suspended,
}

/// One buffer connected to the output sink.
pub trait PlaybackSource: Send + Sync {
    /// Halt output and disconnect from the sink.
    fn stop(&self);
    fn is_finished(&self) -> bool;
}

/// An opened audio output.
pub trait OutputContext: Send {
    fn state(&self) -> ContextState;
    fn resume(&mut self) -> Result<()>;
    fn play(&self, buffer: AudioBuffer) -> Result<Box<dyn PlaybackSource>>;
}

/// Factory for output contexts. Opening may fail on machines without audio.
pub trait AudioBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn OutputContext>>;
}

/// Default output device through rodio.
pub struct RodioBackend;

impl AudioBackend for RodioBackend {
    fn open(&self) -> Result<Box<dyn OutputContext>> {
        Ok(Box::new(RodioContext::open()?))
    }
}

/// The rodio `OutputStream` is not `Send`, so it lives on its own thread
/// for as long as this context exists; only the mixer crosses over.
struct RodioContext {
    mixer: Mixer,
    _shutdown: mpsc::Sender<()>,
}

impl RodioContext {
    fn open() -> Result<Self> {
        let (mixer_tx, mixer_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = mixer_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                if mixer_tx.send(Ok(stream.mixer().clone())).is_err() {
                    return;
                }
                // Blocks until the context is dropped.
                let _ = shutdown_rx.recv();
                debug!("Audio output thread exiting");
                drop(stream);
            })?;

        let mixer = mixer_rx
            .recv()
            .map_err(|e| StudioError::UnsupportedEnvironment(e.to_string()))?
            .map_err(StudioError::UnsupportedEnvironment)?;

        info!("Audio output opened");
        Ok(Self {
            mixer,
            _shutdown: shutdown_tx,
        })
    }
}

/// A rodio stream plays as soon as it opens and has no suspended state.
impl OutputContext for RodioContext {
    fn state(&self) -> ContextState {
        ContextState::Running
    }

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn play(&self, buffer: AudioBuffer) -> Result<Box<dyn PlaybackSource>> {
        let sink = Sink::connect_new(&self.mixer);
        sink.append(SamplesBuffer::new(buffer.channels, buffer.sample_rate, buffer.samples));
        Ok(Box::new(RodioPlayback { sink }))
    }
}

struct RodioPlayback {
    sink: Sink,
}

impl PlaybackSource for RodioPlayback {
    fn stop(&self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

/// Identifies one started session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct ActiveSession {
    id: u64,
    source: Box<dyn PlaybackSource>,
}

pub struct AudioSessionManager {
    active: Arc<Mutex<Option<ActiveSession>>>,
    next_id: AtomicU64,
    poll_interval: Duration,
}

impl AudioSessionManager {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
            poll_interval,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn active_session(&self) -> Option<SessionHandle> {
        self.active.lock().as_ref().map(|s| SessionHandle(s.id))
    }

    /// Stop the active session, if any. Returns whether one was stopped.
    pub fn stop(&self) -> bool {
        let Some(session) = self.active.lock().take() else {
            return false;
        };
        session.source.stop();
        info!("Playback session {} stopped", session.id);
        true
    }

    /// Tear down any prior session, then start `buffer` on `context`.
    ///
    /// `on_complete` runs once if the session plays to the end while still
    /// active. It never runs for a session that was stopped or replaced.
    /// Must be called from within a tokio runtime.
    pub fn start<F>(
        &self,
        buffer: AudioBuffer,
        context: &dyn OutputContext,
        on_complete: F,
    ) -> Result<SessionHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();

        let duration = buffer.duration_secs();
        let source = context.play(buffer)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        *self.active.lock() = Some(ActiveSession { id, source });
        info!("Playback session {id} started ({duration:.1}s)");

        let active = Arc::clone(&self.active);
        let poll_interval = self.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                let finished = {
                    let mut guard = active.lock();
                    match guard.as_ref() {
                        Some(session) if session.id == id => {
                            if session.source.is_finished() {
                                guard.take();
                                true
                            } else {
                                false
                            }
                        }
                        _ => {
                            debug!("Session {id} no longer active, dropping completion watcher");
                            return;
                        }
                    }
                };

                if finished {
                    debug!("Playback session {id} completed");
                    on_complete();
                    return;
                }
            }
        });

        Ok(SessionHandle(id))
    }
}

impl Drop for AudioSessionManager {
    fn drop(&mut self) {
        if self.stop() {
            debug!("Stopped active playback on shutdown");
        }
    }
}
