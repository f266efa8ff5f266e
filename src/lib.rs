// Autoplay Probe - startup audio playback capability detection
// Module declarations
mod audio;
mod probe;
mod settings;
mod state;

pub use audio::decoder::SilenceClip;
pub use probe::{AttemptError, CpalBackend, PlaybackAttempt, PlaybackBackend, SILENT_CLIP_WAV};
pub use settings::ProbeSettings;
pub use state::{support_channel, SupportHandle, SupportResolver, SupportStatus};

use std::sync::{Arc, OnceLock};

static SHARED: OnceLock<SupportHandle> = OnceLock::new();

/// Spawn the probe once and publish its handle process-wide. Later calls
/// return the already-published handle without spawning again, so the
/// verdict still resolves exactly once.
///
/// Must be called from within a tokio runtime.
pub fn install(settings: ProbeSettings) -> SupportHandle {
    SHARED
        .get_or_init(move || {
            let backend = CpalBackend::from_settings(&settings);
            spawn_with_backend(backend, settings)
        })
        .clone()
}

/// The process-wide handle, if `install` has run.
pub fn shared() -> Option<SupportHandle> {
    SHARED.get().cloned()
}

/// Spawn a probe against a specific backend without touching the
/// process-wide slot. This is the seam embedders and tests use to supply
/// their own playback environment.
///
/// Must be called from within a tokio runtime.
pub fn spawn_with_backend(
    backend: impl PlaybackBackend + 'static,
    settings: ProbeSettings,
) -> SupportHandle {
    let (resolver, handle) = support_channel();
    tokio::spawn(probe::run(Arc::new(backend), resolver, settings));
    handle
}
