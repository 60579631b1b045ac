use serde::Deserialize;

/// Playback preferences handed to the audio backend at construction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub music_volume: f32,
    pub effects_volume: f32,
    pub music_enabled: bool,
    pub effects_enabled: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            effects_volume: 0.7,
            music_enabled: true,
            effects_enabled: true,
        }
    }
}

impl AudioSettings {
    /// Copy with both volumes forced into `0.0..=1.0`.
    pub fn clamped(self) -> Self {
        Self {
            music_volume: clamp_volume(self.music_volume),
            effects_volume: clamp_volume(self.effects_volume),
            ..self
        }
    }
}

/// NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volumes_are_clamped() {
        let settings = AudioSettings {
            music_volume: 1.7,
            effects_volume: -0.2,
            ..Default::default()
        }
        .clamped();
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.effects_volume, 0.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn partial_table_keeps_defaults() {
        let settings: AudioSettings = toml::from_str("music_volume = 0.25").unwrap();
        assert_eq!(settings.music_volume, 0.25);
        assert_eq!(settings.effects_volume, 0.7);
        assert!(settings.effects_enabled);
    }
}
