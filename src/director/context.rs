//! Context ambience: one procedural sound per tick, paced by the discrete
//! level resolved from the context's intensity curve.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::scheduler::{Ambience, AmbienceScheduler};
use super::{dispatch_music, dispatch_sound, DirectorError};
use crate::audio::AudioBackend;
use crate::profiles::{ContextProfile, IntensityCurve};
use crate::IntensityLevel;

/// Label of the last step whose threshold is `<= intensity`.
///
/// Falls back to `Low` below every threshold (or for NaN), which a validated
/// curve starting at 0 never hits for non-negative input.
pub fn resolve_level(curve: &IntensityCurve, intensity: f64) -> IntensityLevel {
    curve
        .points()
        .iter()
        .rev()
        .find(|point| point.threshold <= intensity)
        .map_or(IntensityLevel::Low, |point| point.level)
}

/// Inter-tick gap in seconds for each pacing level.
pub fn delay_range(level: IntensityLevel) -> (f64, f64) {
    match level {
        IntensityLevel::Low => (5.0, 15.0),
        IntensityLevel::Medium => (3.0, 8.0),
        IntensityLevel::High => (1.5, 5.0),
        IntensityLevel::Peak => (0.8, 2.0),
    }
}

pub struct ContextAmbience {
    profile: Arc<ContextProfile>,
    level: IntensityLevel,
    backend: Arc<dyn AudioBackend>,
    rng: StdRng,
}

impl ContextAmbience {
    pub fn new(
        profile: Arc<ContextProfile>,
        level: IntensityLevel,
        backend: Arc<dyn AudioBackend>,
        rng: StdRng,
    ) -> Self {
        Self {
            profile,
            level,
            backend,
            rng,
        }
    }

    pub fn level(&self) -> IntensityLevel {
        self.level
    }
}

impl Ambience for ContextAmbience {
    // No probability gate here: context beds are meant to be dense.
    fn tick(&mut self) {
        if let Some(sound) = self.profile.procedural_sounds.choose(&mut self.rng) {
            debug!("{} [{}]: {sound}", self.profile.id, self.level.name());
            dispatch_sound(self.backend.as_ref(), sound);
        }
    }

    fn next_delay(&mut self) -> Duration {
        let (lo, hi) = delay_range(self.level);
        Duration::from_secs_f64(self.rng.gen_range(lo..=hi))
    }
}

pub struct ContextDirector {
    backend: Arc<dyn AudioBackend>,
}

impl ContextDirector {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self { backend }
    }

    /// Resolve the level, start the context music and its loop. Returns the
    /// installed level.
    pub fn activate(
        &self,
        scheduler: &mut AmbienceScheduler,
        profile: &Arc<ContextProfile>,
        intensity: f64,
        rng: StdRng,
    ) -> Result<IntensityLevel, DirectorError> {
        let level = resolve_level(&profile.intensity_curve, intensity);
        dispatch_music(self.backend.as_ref(), &profile.music_track);
        self.install(scheduler, profile, level, rng)?;
        Ok(level)
    }

    /// Replace the running loop only when `intensity` lands on a different
    /// level than `current`. The swap is abrupt; there is no crossfade.
    /// Returns the new level if the loop was replaced.
    pub fn update_intensity(
        &self,
        scheduler: &mut AmbienceScheduler,
        profile: &Arc<ContextProfile>,
        current: IntensityLevel,
        intensity: f64,
        rng: StdRng,
    ) -> Result<Option<IntensityLevel>, DirectorError> {
        let level = resolve_level(&profile.intensity_curve, intensity);
        if level == current {
            return Ok(None);
        }
        self.install(scheduler, profile, level, rng)?;
        Ok(Some(level))
    }

    fn install(
        &self,
        scheduler: &mut AmbienceScheduler,
        profile: &Arc<ContextProfile>,
        level: IntensityLevel,
        rng: StdRng,
    ) -> Result<u64, DirectorError> {
        let ambience = ContextAmbience::new(Arc::clone(profile), level, Arc::clone(&self.backend), rng);
        scheduler.start(&profile.id, ambience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BackendCall, RecordingBackend};
    use crate::profiles::CurvePoint;
    use rand::SeedableRng;

    fn combat_curve() -> IntensityCurve {
        IntensityCurve::new(vec![
            CurvePoint { threshold: 0.0, level: IntensityLevel::Low },
            CurvePoint { threshold: 0.3, level: IntensityLevel::Medium },
            CurvePoint { threshold: 0.7, level: IntensityLevel::High },
            CurvePoint { threshold: 0.9, level: IntensityLevel::Peak },
        ])
        .unwrap()
    }

    fn combat() -> Arc<ContextProfile> {
        Arc::new(ContextProfile {
            id: "combat".into(),
            ambient_track: "combat_tension".into(),
            music_track: "combat_theme".into(),
            procedural_sounds: vec!["gunshot_echo".into(), "reload_sound".into()],
            intensity_curve: combat_curve(),
        })
    }

    #[test]
    fn resolves_combat_curve() {
        let curve = combat_curve();
        assert_eq!(resolve_level(&curve, 0.0), IntensityLevel::Low);
        assert_eq!(resolve_level(&curve, 0.29), IntensityLevel::Low);
        assert_eq!(resolve_level(&curve, 0.3), IntensityLevel::Medium);
        assert_eq!(resolve_level(&curve, 0.75), IntensityLevel::High);
        assert_eq!(resolve_level(&curve, 0.95), IntensityLevel::Peak);
        assert_eq!(resolve_level(&curve, 4.0), IntensityLevel::Peak);
    }

    #[test]
    fn below_every_threshold_is_low() {
        let curve = combat_curve();
        assert_eq!(resolve_level(&curve, -0.5), IntensityLevel::Low);
        assert_eq!(resolve_level(&curve, f64::NAN), IntensityLevel::Low);
    }

    #[test]
    fn resolution_is_monotonic() {
        let curve = combat_curve();
        let mut previous = resolve_level(&curve, 0.0);
        for step in 1..=1000 {
            let level = resolve_level(&curve, step as f64 / 1000.0);
            assert!(level >= previous, "dropped at {step}");
            previous = level;
        }
    }

    #[test]
    fn busier_levels_have_shorter_gaps() {
        let levels = [
            IntensityLevel::Low,
            IntensityLevel::Medium,
            IntensityLevel::High,
            IntensityLevel::Peak,
        ];
        for pair in levels.windows(2) {
            let (calm, busy) = (delay_range(pair[0]), delay_range(pair[1]));
            assert!(busy.0 < calm.0 && busy.1 < calm.1);
        }
        assert_eq!(delay_range(IntensityLevel::Low), (5.0, 15.0));
        assert_eq!(delay_range(IntensityLevel::High), (1.5, 5.0));
    }

    #[test]
    fn every_tick_dispatches_and_delays_follow_level() {
        let backend = Arc::new(RecordingBackend::new());
        let mut peak = ContextAmbience::new(combat(), IntensityLevel::Peak, backend.clone(), StdRng::seed_from_u64(4));
        for _ in 0..25 {
            peak.tick();
            let delay = peak.next_delay().as_secs_f64();
            assert!((0.8..=2.0).contains(&delay), "{delay}");
        }
        assert_eq!(backend.sounds().len(), 25);
        assert!(backend.sounds().iter().all(|s| s == "gunshot_echo" || s == "reload_sound"));
    }

    #[test]
    fn same_level_keeps_the_running_loop() {
        let backend = Arc::new(RecordingBackend::new());
        let director = ContextDirector::new(backend.clone());
        let mut scheduler = AmbienceScheduler::new(0.001);
        let profile = combat();

        let level = director
            .activate(&mut scheduler, &profile, 0.2, StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(level, IntensityLevel::Low);
        assert_eq!(
            backend.calls()[0],
            BackendCall::PlayMusic { track: "combat_theme".into(), looped: true }
        );
        let generation = scheduler.generation();

        let unchanged = director
            .update_intensity(&mut scheduler, &profile, level, 0.25, StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(unchanged, None);
        assert_eq!(scheduler.generation(), generation);

        let raised = director
            .update_intensity(&mut scheduler, &profile, level, 0.75, StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(raised, Some(IntensityLevel::High));
        assert_eq!(scheduler.generation(), generation + 1);
        scheduler.stop();

        // the loop swap never restarts the music
        let music = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::PlayMusic { .. }))
            .count();
        assert_eq!(music, 1);
    }
}
