//! Sound profile catalogue: typed district/context records plus the event and
//! emotional cue maps.
//!
//! Profiles are parsed from TOML and validated once at load:
//! * intensity curves must start at threshold 0 and increase strictly,
//! * probability weights are clamped into `[0, 1]`,
//! * a procedural weight over an empty procedural set is clamped to 0,
//! * non-positive intensity modifiers fall back to 1.0.
//!
//! Malformed curves are rejected; everything else is logged and repaired so
//! an incomplete asset set never stops the game. The registry is read-only
//! after load and can be shared across threads without locking.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde::Deserialize;

use crate::{DangerLevel, IntensityLevel, Situation};

pub mod builtin;
pub use builtin::BUILTIN_CATALOGUE;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile catalogue {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed profile catalogue: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("context '{context}': {source}")]
    InvalidCurve {
        context: String,
        #[source]
        source: CurveError,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("intensity curve is empty")]
    Empty,
    #[error("intensity curve must start at threshold 0, found {0}")]
    BadStart(f64),
    #[error("intensity curve is not strictly increasing at threshold {0}")]
    NotIncreasing(f64),
    #[error("threshold {0} is outside [0, 1]")]
    OutOfRange(f64),
}

/// One `(threshold, level)` step of an intensity curve.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CurvePoint {
    pub threshold: f64,
    pub level: IntensityLevel,
}

/// Validated threshold → level mapping. The first threshold is always 0, so
/// every non-negative intensity resolves to some level.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityCurve {
    points: Vec<CurvePoint>,
}

impl IntensityCurve {
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, CurveError> {
        let first = points.first().ok_or(CurveError::Empty)?;
        if first.threshold != 0.0 {
            return Err(CurveError::BadStart(first.threshold));
        }
        for point in &points {
            if !(0.0..=1.0).contains(&point.threshold) {
                return Err(CurveError::OutOfRange(point.threshold));
            }
        }
        for pair in points.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(CurveError::NotIncreasing(pair[1].threshold));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityWeights {
    pub procedural: f64,
    pub situational: f64,
}

/// Per-danger-bucket loudness and density multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct IntensityModifier {
    /// Carried as catalogue data only; playback does not scale by it.
    #[serde(rename = "volume_modifier", default = "unit")]
    pub volume_mod: f64,
    #[serde(rename = "frequency_modifier", default = "unit")]
    pub freq_mod: f64,
}

fn unit() -> f64 {
    1.0
}

impl Default for IntensityModifier {
    fn default() -> Self {
        Self { volume_mod: 1.0, freq_mod: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntensityModifiers {
    pub low: IntensityModifier,
    pub medium: IntensityModifier,
    pub high: IntensityModifier,
}

impl IntensityModifiers {
    pub fn get(&self, danger: DangerLevel) -> IntensityModifier {
        match danger {
            DangerLevel::Low => self.low,
            DangerLevel::Medium => self.medium,
            DangerLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SituationalSounds {
    pub day: Vec<String>,
    pub night: Vec<String>,
    pub danger: Vec<String>,
}

impl SituationalSounds {
    pub fn for_situation(&self, situation: Situation) -> &[String] {
        match situation {
            Situation::Day => &self.day,
            Situation::Night => &self.night,
            Situation::Danger => &self.danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictProfile {
    pub id: String,
    /// Carried as catalogue data only; the director never plays it.
    pub ambient_track: String,
    pub music_track: String,
    pub procedural_sounds: Vec<String>,
    pub situational_sounds: SituationalSounds,
    pub weights: ProbabilityWeights,
    pub intensity_modifiers: IntensityModifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextProfile {
    pub id: String,
    /// Catalogue data only, like [`DistrictProfile::ambient_track`].
    pub ambient_track: String,
    pub music_track: String,
    pub procedural_sounds: Vec<String>,
    pub intensity_curve: IntensityCurve,
}

// On-disk layout. Kept separate from the typed records so validation happens
// exactly once, in `ProfileRegistry::from_catalogue`.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Catalogue {
    districts: BTreeMap<String, DistrictEntry>,
    contexts: BTreeMap<String, ContextEntry>,
    events: HashMap<String, String>,
    emotions: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DistrictEntry {
    #[serde(default)]
    ambient: String,
    music: String,
    #[serde(default)]
    procedural_sounds: Vec<String>,
    #[serde(default)]
    situational_sounds: SituationalSounds,
    #[serde(default)]
    probability_weights: WeightsEntry,
    #[serde(default)]
    intensity_levels: IntensityModifiers,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeightsEntry {
    procedural: f64,
    situational: f64,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    #[serde(default)]
    ambient: String,
    music: String,
    #[serde(default)]
    procedural_sounds: Vec<String>,
    intensity_curve: Vec<CurvePoint>,
}

/// Immutable, validated profile data shared by the directors.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    districts: HashMap<String, Arc<DistrictProfile>>,
    contexts: HashMap<String, Arc<ContextProfile>>,
    events: HashMap<String, String>,
    emotions: HashMap<String, String>,
}

impl ProfileRegistry {
    /// The catalogue compiled into the crate.
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_toml_str(BUILTIN_CATALOGUE)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&text)?;
        info!(
            "loaded {} districts and {} contexts from {}",
            registry.districts.len(),
            registry.contexts.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        let catalogue: Catalogue = toml::from_str(text)?;
        Self::from_catalogue(catalogue)
    }

    fn from_catalogue(catalogue: Catalogue) -> Result<Self, ProfileError> {
        let mut districts = HashMap::with_capacity(catalogue.districts.len());
        for (id, entry) in catalogue.districts {
            let profile = validate_district(id.clone(), entry);
            districts.insert(id, Arc::new(profile));
        }

        let mut contexts = HashMap::with_capacity(catalogue.contexts.len());
        for (id, entry) in catalogue.contexts {
            let intensity_curve = IntensityCurve::new(entry.intensity_curve).map_err(|source| {
                ProfileError::InvalidCurve { context: id.clone(), source }
            })?;
            let profile = ContextProfile {
                id: id.clone(),
                ambient_track: entry.ambient,
                music_track: entry.music,
                procedural_sounds: entry.procedural_sounds,
                intensity_curve,
            };
            contexts.insert(id, Arc::new(profile));
        }

        Ok(Self {
            districts,
            contexts,
            events: catalogue.events,
            emotions: catalogue.emotions,
        })
    }

    pub fn district(&self, id: &str) -> Option<&Arc<DistrictProfile>> {
        self.districts.get(id)
    }

    pub fn context(&self, id: &str) -> Option<&Arc<ContextProfile>> {
        self.contexts.get(id)
    }

    /// A miss is a valid "no cue" outcome.
    pub fn event_sound(&self, key: &str) -> Option<&str> {
        self.events.get(key).map(String::as_str)
    }

    pub fn emotional_cue(&self, key: &str) -> Option<&str> {
        self.emotions.get(key).map(String::as_str)
    }

    pub fn district_ids(&self) -> Vec<&str> {
        sorted_keys(&self.districts)
    }

    pub fn context_ids(&self) -> Vec<&str> {
        sorted_keys(&self.contexts)
    }

    pub fn event_keys(&self) -> Vec<&str> {
        sorted_keys(&self.events)
    }

    pub fn emotion_keys(&self) -> Vec<&str> {
        sorted_keys(&self.emotions)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

fn validate_district(id: String, entry: DistrictEntry) -> DistrictProfile {
    let mut procedural = clamp_weight(&id, "procedural", entry.probability_weights.procedural);
    let situational = clamp_weight(&id, "situational", entry.probability_weights.situational);
    if procedural > 0.0 && entry.procedural_sounds.is_empty() {
        warn!("district '{id}' has a procedural weight of {procedural} but no procedural sounds; using 0");
        procedural = 0.0;
    }

    let mut modifiers = entry.intensity_levels;
    for (bucket, modifier) in [
        ("low", &mut modifiers.low),
        ("medium", &mut modifiers.medium),
        ("high", &mut modifiers.high),
    ] {
        repair_modifier(&id, bucket, modifier);
    }

    DistrictProfile {
        id,
        ambient_track: entry.ambient,
        music_track: entry.music,
        procedural_sounds: entry.procedural_sounds,
        situational_sounds: entry.situational_sounds,
        weights: ProbabilityWeights { procedural, situational },
        intensity_modifiers: modifiers,
    }
}

fn clamp_weight(id: &str, name: &str, weight: f64) -> f64 {
    if (0.0..=1.0).contains(&weight) {
        return weight;
    }
    let clamped = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
    warn!("district '{id}' {name} weight {weight} is outside [0, 1]; using {clamped}");
    clamped
}

fn repair_modifier(id: &str, bucket: &str, modifier: &mut IntensityModifier) {
    if !(modifier.volume_mod.is_finite() && modifier.volume_mod > 0.0) {
        warn!("district '{id}' {bucket} volume modifier {} is not positive; using 1.0", modifier.volume_mod);
        modifier.volume_mod = 1.0;
    }
    if !(modifier.freq_mod.is_finite() && modifier.freq_mod > 0.0) {
        warn!("district '{id}' {bucket} frequency modifier {} is not positive; using 1.0", modifier.freq_mod);
        modifier.freq_mod = 1.0;
    }
}

// ---------- tests ----------
#[cfg(test)]
mod tests {
    use super::*;

    fn point(threshold: f64, level: IntensityLevel) -> CurvePoint {
        CurvePoint { threshold, level }
    }

    #[test]
    fn curve_must_start_at_zero() {
        let err = IntensityCurve::new(vec![point(0.1, IntensityLevel::Low)]).unwrap_err();
        assert_eq!(err, CurveError::BadStart(0.1));
        assert_eq!(IntensityCurve::new(Vec::new()).unwrap_err(), CurveError::Empty);
    }

    #[test]
    fn curve_must_increase_strictly() {
        let err = IntensityCurve::new(vec![
            point(0.0, IntensityLevel::Low),
            point(0.5, IntensityLevel::Medium),
            point(0.5, IntensityLevel::High),
        ])
        .unwrap_err();
        assert_eq!(err, CurveError::NotIncreasing(0.5));

        let err = IntensityCurve::new(vec![
            point(0.0, IntensityLevel::Low),
            point(1.5, IntensityLevel::Peak),
        ])
        .unwrap_err();
        assert_eq!(err, CurveError::OutOfRange(1.5));
    }

    #[test]
    fn unsorted_context_curve_rejects_catalogue() {
        let text = r#"
            [contexts.chase]
            music = "chase_theme"
            procedural_sounds = ["footsteps"]
            intensity_curve = [
                { threshold = 0.0, level = "low" },
                { threshold = 0.8, level = "high" },
                { threshold = 0.4, level = "medium" },
            ]
        "#;
        match ProfileRegistry::from_toml_str(text) {
            Err(ProfileError::InvalidCurve { context, source }) => {
                assert_eq!(context, "chase");
                assert_eq!(source, CurveError::NotIncreasing(0.4));
            }
            other => panic!("expected curve error, got {other:?}"),
        }
    }

    #[test]
    fn weights_are_clamped_and_empty_procedural_set_disables_draws() {
        let text = r#"
            [districts.docks]
            music = "docks_theme"
            procedural_sounds = []
            probability_weights = { procedural = 0.8, situational = 1.4 }
            intensity_levels = { high = { volume_modifier = 1.2, frequency_modifier = -3.0 } }
        "#;
        let registry = ProfileRegistry::from_toml_str(text).unwrap();
        let docks = registry.district("docks").unwrap();
        assert_eq!(docks.weights.procedural, 0.0);
        assert_eq!(docks.weights.situational, 1.0);
        assert_eq!(docks.intensity_modifiers.high.freq_mod, 1.0);
        assert_eq!(docks.intensity_modifiers.high.volume_mod, 1.2);
        // absent buckets default to neutral
        assert_eq!(docks.intensity_modifiers.get(DangerLevel::Low), IntensityModifier::default());
    }

    #[test]
    fn lookup_miss_is_not_an_error() {
        let registry = ProfileRegistry::from_toml_str("[events]\nlevel_up = \"level_up\"").unwrap();
        assert_eq!(registry.event_sound("level_up"), Some("level_up"));
        assert_eq!(registry.event_sound("unknown_key"), None);
        assert_eq!(registry.emotional_cue("tension"), None);
        assert!(registry.district("downtown").is_none());
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let path = Path::new("definitely/not/here.toml");
        let err = ProfileRegistry::load(path).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
        assert!(err.to_string().contains("definitely/not/here.toml"));
    }

    #[test]
    fn load_reads_catalogue_from_disk() {
        let path = std::env::temp_dir().join(format!("ambient_director_profiles_{}.toml", std::process::id()));
        fs::write(&path, "[emotions]\nwonder = \"wonder\"\n").unwrap();
        let registry = ProfileRegistry::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(registry.emotional_cue("wonder"), Some("wonder"));
        assert_eq!(registry.emotion_keys(), vec!["wonder"]);
    }
}
