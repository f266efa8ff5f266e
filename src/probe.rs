// Autoplay capability probe
// Tries to start silent playback with no user gesture and reports once

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::audio::decoder::SilenceClip;
use crate::audio::output::AudioOutput;
use crate::settings::ProbeSettings;
use crate::state::SupportResolver;

/// Silent probe clip compiled into the binary: mono 16-bit 44.1 kHz PCM
/// WAV holding a single zero sample.
pub const SILENT_CLIP_WAV: &[u8] = include_bytes!("../assets/silence.wav");

/// Why a playback attempt did not start.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// No audio output device is present at all
    #[error("no audio output device available")]
    NoDevice,

    /// The device exists but refused to open or start a stream
    #[error("output stream error: {0}")]
    Stream(String),

    /// The probe clip itself could not be decoded
    #[error("probe clip decode error: {0}")]
    Decode(String),
}

/// Outcome of one playback attempt. Refusal is an expected answer, not a
/// fault.
#[derive(Debug)]
pub enum PlaybackAttempt {
    Started,
    Refused(AttemptError),
}

/// The environment-facing half of the probe: try to start playback of a
/// clip with no preceding user interaction.
pub trait PlaybackBackend: Send + Sync {
    fn play_silent(&self, clip: &SilenceClip) -> PlaybackAttempt;
}

/// Production backend over the default cpal output device.
pub struct CpalBackend {
    drain_timeout: Duration,
}

impl CpalBackend {
    pub fn new(drain_timeout: Duration) -> Self {
        Self { drain_timeout }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(Duration::from_millis(settings.drain_timeout_ms))
    }
}

impl PlaybackBackend for CpalBackend {
    fn play_silent(&self, clip: &SilenceClip) -> PlaybackAttempt {
        if !AudioOutput::device_available() {
            return PlaybackAttempt::Refused(AttemptError::NoDevice);
        }

        // Stream and buffers are released when `output` drops, on every
        // exit path.
        let output = match AudioOutput::new() {
            Ok(output) => output,
            Err(e) => {
                return PlaybackAttempt::Refused(AttemptError::Stream(format!("{:#}", e)));
            }
        };

        output.write_all(clip.samples());
        output.drain(self.drain_timeout);

        PlaybackAttempt::Started
    }
}

/// Run the probe to completion and resolve the verdict. Never fails;
/// every failure mode reads as "unsupported".
pub(crate) async fn run(
    backend: Arc<dyn PlaybackBackend>,
    resolver: SupportResolver,
    settings: ProbeSettings,
) {
    // Stay off the audio stack while the rest of the process starts up.
    tokio::time::sleep(Duration::from_millis(settings.startup_delay_ms)).await;

    let supported = attempt(backend, SILENT_CLIP_WAV).await;
    resolver.resolve(supported);
}

/// One playback attempt against the given asset bytes.
pub(crate) async fn attempt(backend: Arc<dyn PlaybackBackend>, asset: &[u8]) -> bool {
    let outcome = match SilenceClip::decode(asset) {
        // Device-facing calls block, so the attempt runs off the async
        // workers.
        Ok(clip) => match tokio::task::spawn_blocking(move || backend.play_silent(&clip)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // A playback attempt that dies answers the consumer's
                // question the same way a refusal does.
                tracing::warn!("playback attempt did not finish: {}", e);
                return false;
            }
        },
        Err(e) => PlaybackAttempt::Refused(AttemptError::Decode(format!("{:#}", e))),
    };

    match outcome {
        PlaybackAttempt::Started => {
            tracing::debug!("silent playback started without interaction");
            true
        }
        PlaybackAttempt::Refused(reason) => {
            tracing::debug!("silent playback refused: {}", reason);
            false
        }
    }
}
