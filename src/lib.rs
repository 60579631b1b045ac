//! ambient_director: procedural ambient audio direction for a narrative game.
//!
//! Given the player's district, gameplay context, time of day, danger level and
//! a continuous narrative-intensity signal, the director decides which music
//! loops and which one-shot cues play. Actual playback is delegated to an
//! [`audio::AudioBackend`]; nothing here reads backend state back.
//!
//! # Features
//! * **playback** *(default)*: rodio-backed [`audio::RodioBackend`].
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use ambient_director::audio::RecordingBackend;
//! use ambient_director::profiles::ProfileRegistry;
//! use ambient_director::{DirectorController, DirectorSettings, DirectorState};
//!
//! let registry = Arc::new(ProfileRegistry::builtin().unwrap());
//! let backend = Arc::new(RecordingBackend::new());
//! let mut director = DirectorController::new(registry, backend.clone(), DirectorSettings::default());
//! director.play_event_sound("level_up");
//! assert_eq!(director.state(), &DirectorState::Idle);
//! director.shutdown();
//! ```

use core::fmt;
use core::str::FromStr;

use serde::Deserialize;

pub mod audio;
pub mod config;
pub mod director;
pub mod profiles;
pub mod settings;

// Main exports
pub use config::Config;
pub use director::{DirectorController, DirectorError, DirectorSettings, DirectorState, LoopKind};
pub use profiles::{ProfileError, ProfileRegistry};
pub use settings::AudioSettings;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseBucketError {
    kind: &'static str,
    value: String,
}

/// Time of day bucket used to pick situational district sounds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    Day,
    Night,
}

impl TimeOfDay {
    pub fn name(&self) -> &'static str {
        match self {
            TimeOfDay::Day => "day",
            TimeOfDay::Night => "night",
        }
    }
}

/// Danger bucket; `High` switches district situational sounds to the danger set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DangerLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl DangerLevel {
    pub fn name(&self) -> &'static str {
        match self {
            DangerLevel::Low => "low",
            DangerLevel::Medium => "medium",
            DangerLevel::High => "high",
        }
    }
}

/// Discrete pacing level resolved from a context's intensity curve.
///
/// Ordered from calmest to busiest, so curve resolution can be checked for
/// monotonicity with plain comparisons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
    Peak,
}

impl IntensityLevel {
    pub fn name(&self) -> &'static str {
        match self {
            IntensityLevel::Low => "low",
            IntensityLevel::Medium => "medium",
            IntensityLevel::High => "high",
            IntensityLevel::Peak => "peak",
        }
    }
}

/// Which situational sound set a district draws from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Situation {
    Day,
    Night,
    Danger,
}

impl Situation {
    /// High danger overrides the time of day.
    pub fn for_conditions(time_of_day: TimeOfDay, danger: DangerLevel) -> Self {
        match (danger, time_of_day) {
            (DangerLevel::High, _) => Situation::Danger,
            (_, TimeOfDay::Day) => Situation::Day,
            (_, TimeOfDay::Night) => Situation::Night,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Situation::Day => "day",
            Situation::Night => "night",
            Situation::Danger => "danger",
        }
    }
}

macro_rules! bucket_text {
    ($ty:ty, $kind:literal, [$($text:literal => $variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = ParseBucketError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(ParseBucketError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

bucket_text!(TimeOfDay, "time of day", ["day" => TimeOfDay::Day, "night" => TimeOfDay::Night]);
bucket_text!(DangerLevel, "danger level", [
    "low" => DangerLevel::Low,
    "medium" => DangerLevel::Medium,
    "high" => DangerLevel::High,
]);
bucket_text!(IntensityLevel, "intensity level", [
    "low" => IntensityLevel::Low,
    "medium" => IntensityLevel::Medium,
    "high" => IntensityLevel::High,
    "peak" => IntensityLevel::Peak,
]);
