// Playback collaborators the director dispatches to.
pub mod recording;
#[cfg(feature = "playback")]
pub mod rodio_backend;
pub mod toggles;

use std::path::PathBuf;

pub use recording::{BackendCall, RecordingBackend};
#[cfg(feature = "playback")]
pub use rodio_backend::RodioBackend;
pub use toggles::{MusicAction, MusicRequest, PlaybackToggles};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown music track '{0}'")]
    UnknownTrack(String),
    #[error("unknown sound '{0}'")]
    UnknownSound(String),
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("audio output unavailable: {0}")]
    Device(String),
    #[error("playback thread has shut down")]
    Disconnected,
}

/// Capability the director needs from whatever actually makes sound.
///
/// Every call must return quickly: ambience ticks invoke `play_sound` from
/// their own threads and must never stall on decoding or device I/O.
pub trait AudioBackend: Send + Sync {
    /// Replace the current music track.
    fn play_music(&self, track_id: &str, looped: bool) -> Result<(), BackendError>;
    fn stop_music(&self);
    /// Fire a one-shot effect. Safe to call several times a second.
    fn play_sound(&self, sound_id: &str) -> Result<(), BackendError>;
    /// Volumes are in `0.0..=1.0`.
    fn set_music_volume(&self, volume: f32);
    fn set_effects_volume(&self, volume: f32);
    /// Disabling stops the current track; enabling resumes the last one requested.
    fn set_music_enabled(&self, enabled: bool);
    /// Disabled effects are accepted and dropped.
    fn set_effects_enabled(&self, enabled: bool);
}
