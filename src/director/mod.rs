//! Ambience direction: the scheduler primitive, the district and context
//! directors built on it, and the controller facade game logic talks to.

pub mod context;
pub mod controller;
pub mod district;
pub mod scheduler;

use log::warn;

use crate::audio::{AudioBackend, BackendError};
use crate::profiles::ProfileError;

pub use context::{delay_range, resolve_level, ContextAmbience, ContextDirector};
pub use controller::{DirectorController, DirectorState, LoopKind};
pub use district::{DistrictAmbience, DistrictDirector};
pub use scheduler::{Ambience, AmbienceScheduler};

#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error(transparent)]
    Profiles(#[from] ProfileError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to spawn ambience loop: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Runtime knobs for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectorSettings {
    /// Seeds every random draw when set, making sound and delay sequences
    /// reproducible.
    pub seed: Option<u64>,
    /// Multiplier on every scheduler delay.
    pub delay_scale: f64,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            seed: None,
            delay_scale: 1.0,
        }
    }
}

/// Fire a one-shot, logging and swallowing any failure.
pub(crate) fn dispatch_sound(backend: &dyn AudioBackend, sound_id: &str) -> bool {
    match backend.play_sound(sound_id) {
        Ok(()) => true,
        Err(err) => {
            warn!("dropped sound '{sound_id}': {err}");
            false
        }
    }
}

pub(crate) fn dispatch_music(backend: &dyn AudioBackend, track_id: &str) {
    if let Err(err) = backend.play_music(track_id, true) {
        warn!("music '{track_id}' not started: {err}");
    }
}
