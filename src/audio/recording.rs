//! Backend that remembers every call instead of playing it.
//!
//! Used for `--dry-run` and as the observation point in controller tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::info;

use super::{AudioBackend, BackendError};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    PlayMusic { track: String, looped: bool },
    StopMusic,
    PlaySound(String),
    MusicVolume(f32),
    EffectsVolume(f32),
    MusicEnabled(bool),
    EffectsEnabled(bool),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    missing: HashSet<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat these ids as absent assets: dispatching them fails.
    pub fn with_missing<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calls: Mutex::default(),
            missing: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().clone()
    }

    /// Only the `play_sound` ids, in dispatch order.
    pub fn sounds(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::PlaySound(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BackendCall>> {
        // A panicking tick must not take the recorder down with it.
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: BackendCall) {
        self.lock().push(call);
    }
}

impl AudioBackend for RecordingBackend {
    fn play_music(&self, track_id: &str, looped: bool) -> Result<(), BackendError> {
        if self.missing.contains(track_id) {
            return Err(BackendError::UnknownTrack(track_id.to_string()));
        }
        info!("music -> {track_id}{}", if looped { " (looped)" } else { "" });
        self.record(BackendCall::PlayMusic {
            track: track_id.to_string(),
            looped,
        });
        Ok(())
    }

    fn stop_music(&self) {
        info!("music stopped");
        self.record(BackendCall::StopMusic);
    }

    fn play_sound(&self, sound_id: &str) -> Result<(), BackendError> {
        if self.missing.contains(sound_id) {
            return Err(BackendError::UnknownSound(sound_id.to_string()));
        }
        info!("sound -> {sound_id}");
        self.record(BackendCall::PlaySound(sound_id.to_string()));
        Ok(())
    }

    fn set_music_volume(&self, volume: f32) {
        self.record(BackendCall::MusicVolume(volume));
    }

    fn set_effects_volume(&self, volume: f32) {
        self.record(BackendCall::EffectsVolume(volume));
    }

    fn set_music_enabled(&self, enabled: bool) {
        info!("music enabled: {enabled}");
        self.record(BackendCall::MusicEnabled(enabled));
    }

    fn set_effects_enabled(&self, enabled: bool) {
        info!("effects enabled: {enabled}");
        self.record(BackendCall::EffectsEnabled(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let backend = RecordingBackend::new();
        backend.play_music("downtown_theme", true).unwrap();
        backend.play_sound("city_traffic").unwrap();
        backend.stop_music();
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::PlayMusic { track: "downtown_theme".into(), looped: true },
                BackendCall::PlaySound("city_traffic".into()),
                BackendCall::StopMusic,
            ]
        );
        assert_eq!(backend.sounds(), vec!["city_traffic".to_string()]);
        backend.clear();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn missing_assets_fail_without_recording() {
        let backend = RecordingBackend::with_missing(["ghost"]);
        assert!(matches!(backend.play_sound("ghost"), Err(BackendError::UnknownSound(_))));
        assert!(matches!(backend.play_music("ghost", false), Err(BackendError::UnknownTrack(_))));
        assert!(backend.calls().is_empty());
    }
}
