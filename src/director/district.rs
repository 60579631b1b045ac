//! District ambience: probabilistic procedural and situational one-shots
//! spaced by a danger-scaled random gap.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::scheduler::{Ambience, AmbienceScheduler, MAX_DELAY};
use super::{dispatch_music, dispatch_sound, DirectorError};
use crate::audio::AudioBackend;
use crate::profiles::{DistrictProfile, IntensityModifier};
use crate::{DangerLevel, Situation, TimeOfDay};

/// Base gap between district ticks, before the danger frequency modifier.
pub const DISTRICT_DELAY_SECS: (f64, f64) = (3.0, 15.0);

pub struct DistrictAmbience {
    profile: Arc<DistrictProfile>,
    situation: Situation,
    modifier: IntensityModifier,
    backend: Arc<dyn AudioBackend>,
    rng: StdRng,
}

impl DistrictAmbience {
    pub fn new(
        profile: Arc<DistrictProfile>,
        time_of_day: TimeOfDay,
        danger: DangerLevel,
        backend: Arc<dyn AudioBackend>,
        rng: StdRng,
    ) -> Self {
        Self {
            situation: Situation::for_conditions(time_of_day, danger),
            modifier: profile.intensity_modifiers.get(danger),
            profile,
            backend,
            rng,
        }
    }

    pub fn situation(&self) -> Situation {
        self.situation
    }

    /// Danger-bucket modifier this loop was built with.
    pub fn modifier(&self) -> IntensityModifier {
        self.modifier
    }

    pub fn freq_mod(&self) -> f64 {
        self.modifier.freq_mod
    }

    /// Both gates are drawn every tick, independently of each other.
    fn draw(&mut self) -> [Option<String>; 2] {
        let weights = self.profile.weights;

        let procedural = if self.rng.gen::<f64>() < weights.procedural {
            self.profile.procedural_sounds.choose(&mut self.rng).cloned()
        } else {
            None
        };

        let situational = if self.rng.gen::<f64>() < weights.situational {
            self.profile
                .situational_sounds
                .for_situation(self.situation)
                .choose(&mut self.rng)
                .cloned()
        } else {
            None
        };

        [procedural, situational]
    }
}

impl Ambience for DistrictAmbience {
    fn tick(&mut self) {
        for sound in self.draw().into_iter().flatten() {
            debug!("{} [{}]: {sound}", self.profile.id, self.situation.name());
            dispatch_sound(self.backend.as_ref(), &sound);
        }
    }

    fn next_delay(&mut self) -> Duration {
        let (lo, hi) = DISTRICT_DELAY_SECS;
        Duration::try_from_secs_f64(self.rng.gen_range(lo..=hi) / self.modifier.freq_mod).unwrap_or(MAX_DELAY)
    }
}

pub struct DistrictDirector {
    backend: Arc<dyn AudioBackend>,
}

impl DistrictDirector {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self { backend }
    }

    /// Start the district's music, then its ambience loop. Returns the
    /// modifier the loop paces itself with.
    pub fn activate(
        &self,
        scheduler: &mut AmbienceScheduler,
        profile: &Arc<DistrictProfile>,
        time_of_day: TimeOfDay,
        danger: DangerLevel,
        rng: StdRng,
    ) -> Result<IntensityModifier, DirectorError> {
        dispatch_music(self.backend.as_ref(), &profile.music_track);
        self.resume(scheduler, profile, time_of_day, danger, rng)
    }

    /// (Re)install only the ambience loop; music is left alone.
    pub fn resume(
        &self,
        scheduler: &mut AmbienceScheduler,
        profile: &Arc<DistrictProfile>,
        time_of_day: TimeOfDay,
        danger: DangerLevel,
        rng: StdRng,
    ) -> Result<IntensityModifier, DirectorError> {
        let ambience = DistrictAmbience::new(
            Arc::clone(profile),
            time_of_day,
            danger,
            Arc::clone(&self.backend),
            rng,
        );
        let modifier = ambience.modifier();
        scheduler.start(&profile.id, ambience)?;
        Ok(modifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingBackend;
    use crate::profiles::{IntensityModifiers, ProbabilityWeights, SituationalSounds};
    use rand::SeedableRng;

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn alley(procedural: f64, situational: f64) -> Arc<DistrictProfile> {
        Arc::new(DistrictProfile {
            id: "alley".into(),
            ambient_track: "alley_ambient".into(),
            music_track: "alley_theme".into(),
            procedural_sounds: strings(&["drip", "rat"]),
            situational_sounds: SituationalSounds {
                day: strings(&["vendor"]),
                night: strings(&["neon_buzz"]),
                danger: strings(&["siren", "gunfire"]),
            },
            weights: ProbabilityWeights { procedural, situational },
            intensity_modifiers: IntensityModifiers {
                low: IntensityModifier { volume_mod: 0.6, freq_mod: 0.5 },
                medium: IntensityModifier::default(),
                high: IntensityModifier { volume_mod: 1.2, freq_mod: 2.0 },
            },
        })
    }

    fn ambience(
        profile: Arc<DistrictProfile>,
        time_of_day: TimeOfDay,
        danger: DangerLevel,
        seed: u64,
    ) -> (DistrictAmbience, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::new());
        let ambience = DistrictAmbience::new(
            profile,
            time_of_day,
            danger,
            backend.clone(),
            StdRng::seed_from_u64(seed),
        );
        (ambience, backend)
    }

    #[test]
    fn certain_weights_fire_both_draws_every_tick() {
        let (mut district, backend) = ambience(alley(1.0, 1.0), TimeOfDay::Night, DangerLevel::Low, 7);
        for _ in 0..10 {
            district.tick();
        }
        let sounds = backend.sounds();
        assert_eq!(sounds.len(), 20);
        for pair in sounds.chunks(2) {
            assert!(pair[0] == "drip" || pair[0] == "rat");
            assert_eq!(pair[1], "neon_buzz");
        }
    }

    #[test]
    fn zero_weights_never_dispatch() {
        let (mut district, backend) = ambience(alley(0.0, 0.0), TimeOfDay::Day, DangerLevel::Medium, 3);
        for _ in 0..50 {
            district.tick();
        }
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn high_danger_draws_from_danger_set() {
        let (mut district, backend) = ambience(alley(0.0, 1.0), TimeOfDay::Day, DangerLevel::High, 11);
        assert_eq!(district.situation(), Situation::Danger);
        for _ in 0..20 {
            district.tick();
        }
        assert!(backend.sounds().iter().all(|s| s == "siren" || s == "gunfire"));
    }

    #[test]
    fn empty_situational_set_is_silent() {
        let mut profile = (*alley(0.0, 1.0)).clone();
        profile.situational_sounds.night.clear();
        let (mut district, backend) = ambience(Arc::new(profile), TimeOfDay::Night, DangerLevel::Low, 5);
        for _ in 0..10 {
            district.tick();
        }
        assert!(backend.sounds().is_empty());
    }

    #[test]
    fn delay_is_divided_by_frequency_modifier() {
        let (mut calm, _) = ambience(alley(1.0, 1.0), TimeOfDay::Day, DangerLevel::Low, 1);
        let (mut busy, _) = ambience(alley(1.0, 1.0), TimeOfDay::Day, DangerLevel::High, 1);
        assert_eq!(calm.freq_mod(), 0.5);
        assert_eq!(busy.freq_mod(), 2.0);
        for _ in 0..100 {
            let slow = calm.next_delay().as_secs_f64();
            let fast = busy.next_delay().as_secs_f64();
            assert!((6.0..=30.0).contains(&slow), "{slow}");
            assert!((1.5..=7.5).contains(&fast), "{fast}");
            // same seed, same draw, different divisor
            assert!((slow - fast * 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_replays_the_same_soundscape() {
        let (mut a, backend_a) = ambience(alley(0.5, 0.5), TimeOfDay::Night, DangerLevel::Low, 99);
        let (mut b, backend_b) = ambience(alley(0.5, 0.5), TimeOfDay::Night, DangerLevel::Low, 99);
        for _ in 0..30 {
            a.tick();
            b.tick();
            assert_eq!(a.next_delay(), b.next_delay());
        }
        assert_eq!(backend_a.sounds(), backend_b.sounds());
        assert!(!backend_a.sounds().is_empty());
    }

    #[test]
    fn resume_installs_loop_for_current_danger_without_music() {
        let backend = Arc::new(RecordingBackend::new());
        let director = DistrictDirector::new(backend.clone());
        let mut scheduler = AmbienceScheduler::new(1.0);
        let profile = alley(0.0, 0.0);

        let busy = director
            .activate(&mut scheduler, &profile, TimeOfDay::Day, DangerLevel::High, StdRng::seed_from_u64(1))
            .unwrap();
        let calm = director
            .resume(&mut scheduler, &profile, TimeOfDay::Day, DangerLevel::Low, StdRng::seed_from_u64(2))
            .unwrap();
        scheduler.stop();

        assert_eq!(busy.freq_mod, 2.0);
        assert_eq!(calm, IntensityModifier { volume_mod: 0.6, freq_mod: 0.5 });
        assert_eq!(scheduler.generation(), 3);
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn missing_asset_does_not_abort_the_tick() {
        let backend = Arc::new(RecordingBackend::with_missing(["drip", "rat"]));
        let mut district = DistrictAmbience::new(
            alley(1.0, 1.0),
            TimeOfDay::Day,
            DangerLevel::Low,
            backend.clone(),
            StdRng::seed_from_u64(2),
        );
        district.tick();
        assert_eq!(backend.sounds(), vec!["vendor".to_string()]);
    }
}
