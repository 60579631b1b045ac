//! Music/effects enable flags and the last requested track, kept apart from
//! the output device so the playback thread only has to act on the result.

use crate::settings::AudioSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicRequest {
    pub track: String,
    pub looped: bool,
}

/// What the music sink should do after a request or toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicAction {
    Start(MusicRequest),
    Halt,
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackToggles {
    music_enabled: bool,
    effects_enabled: bool,
    requested: Option<MusicRequest>,
}

impl PlaybackToggles {
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            music_enabled: settings.music_enabled,
            effects_enabled: settings.effects_enabled,
            requested: None,
        }
    }

    pub fn music_enabled(&self) -> bool {
        self.music_enabled
    }

    pub fn effects_enabled(&self) -> bool {
        self.effects_enabled
    }

    pub fn requested(&self) -> Option<&MusicRequest> {
        self.requested.as_ref()
    }

    /// Remember the track even while muted, so enabling can pick it up.
    pub fn request_music(&mut self, track: &str, looped: bool) -> MusicAction {
        let request = MusicRequest {
            track: track.to_string(),
            looped,
        };
        self.requested = Some(request.clone());
        if self.music_enabled {
            MusicAction::Start(request)
        } else {
            MusicAction::Halt
        }
    }

    pub fn stop_music(&mut self) -> MusicAction {
        self.requested = None;
        MusicAction::Halt
    }

    /// `playing` is whether a music sink is currently live.
    pub fn set_music_enabled(&mut self, enabled: bool, playing: bool) -> MusicAction {
        self.music_enabled = enabled;
        if !enabled {
            return MusicAction::Halt;
        }
        match &self.requested {
            Some(request) if !playing => MusicAction::Start(request.clone()),
            _ => MusicAction::Keep,
        }
    }

    pub fn set_effects_enabled(&mut self, enabled: bool) {
        self.effects_enabled = enabled;
    }
}

impl Default for PlaybackToggles {
    fn default() -> Self {
        Self::new(&AudioSettings::default())
    }
}
