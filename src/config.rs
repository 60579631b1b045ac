//! Configuration loader for the ambient director.
//!
//! * Looks for `ambient_director.toml` in the cwd unless overridden by `--config`.
//! * Provides defaults so the file is optional.
//!
//! Extend this struct whenever you add new tunables.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::director::DirectorSettings;
use crate::profiles::{ProfileError, ProfileRegistry};
use crate::settings::AudioSettings;

pub const DEFAULT_CONFIG_PATH: &str = "ambient_director.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seed for every random draw (optional; entropy when absent).
    pub seed: Option<u64>,
    /// Multiplier applied to every scheduler delay. Non-positive values fall back to 1.0.
    pub delay_scale: f64,
    /// External profile catalogue; the bundled one is used when absent.
    pub profiles: Option<PathBuf>,
    /// Root of the `music/` and `effects/` asset folders.
    pub sounds_dir: PathBuf,
    pub audio: AudioSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: None,
            delay_scale: 1.0,
            profiles: None,
            sounds_dir: PathBuf::from("sounds"),
            audio: AudioSettings::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file; fall back to defaults on any error.
    pub fn load(path: Option<&Path>) -> Self {
        let p = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        match fs::read_to_string(p) {
            Ok(text) => Self::from_toml_str(&text).unwrap_or_else(|err| {
                warn!("ignoring malformed config {}: {err}", p.display());
                Self::default()
            }),
            Err(_) => {
                info!("no config at {}, using defaults", p.display());
                Self::default()
            }
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Profile registry named by this config. Failure here is a startup error.
    pub fn registry(&self) -> Result<ProfileRegistry, ProfileError> {
        match &self.profiles {
            Some(path) => ProfileRegistry::load(path),
            None => ProfileRegistry::builtin(),
        }
    }

    pub fn director_settings(&self) -> DirectorSettings {
        DirectorSettings {
            seed: self.seed,
            delay_scale: self.delay_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Some(Path::new("no/such/ambient_director.toml")));
        assert_eq!(config, Config::default());
        assert_eq!(config.sounds_dir, PathBuf::from("sounds"));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = Config::from_toml_str(
            r#"
            seed = 42
            delay_scale = 0.1

            [audio]
            effects_volume = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.delay_scale, 0.1);
        assert_eq!(config.audio.effects_volume, 0.3);
        assert_eq!(config.audio.music_volume, 0.5);
        assert!(config.profiles.is_none());

        let settings = config.director_settings();
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.delay_scale, 0.1);
    }

    #[test]
    fn default_config_uses_bundled_profiles() {
        let registry = Config::default().registry().unwrap();
        assert!(registry.district("downtown").is_some());
    }
}
