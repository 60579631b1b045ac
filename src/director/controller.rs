//! Facade game logic drives: owns the state machine, the single scheduler
//! and the backend reference, and routes one-shot cues.
//!
//! States are `Idle`, `District` and `Context`. District and context loops
//! are mutually exclusive; the last district id survives a context so
//! [`DirectorController::return_to_district_ambience`] can restore it.
//! The controller is meant to be driven from one thread; loops only read the
//! scheduler's generation counter.

use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::context::ContextDirector;
use super::district::DistrictDirector;
use super::scheduler::AmbienceScheduler;
use super::{dispatch_sound, DirectorError, DirectorSettings};
use crate::audio::AudioBackend;
use crate::config::Config;
use crate::profiles::{IntensityModifier, ProfileRegistry};
use crate::settings::clamp_volume;
use crate::{DangerLevel, IntensityLevel, TimeOfDay};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorState {
    Idle,
    /// An unknown id still enters this state, just with no loop running.
    District { id: String },
    /// `level` is `None` when the context id has no profile.
    Context { id: String, level: Option<IntensityLevel> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopKind {
    #[default]
    None,
    District,
    Context,
}

struct Backends {
    audio: Arc<dyn AudioBackend>,
    district: DistrictDirector,
    context: ContextDirector,
}

pub struct DirectorController {
    registry: Arc<ProfileRegistry>,
    // `None` once shut down.
    backends: Option<Backends>,
    scheduler: AmbienceScheduler,
    rng: StdRng,
    state: DirectorState,
    current_district: Option<String>,
    time_of_day: TimeOfDay,
    danger_level: DangerLevel,
    loop_kind: LoopKind,
    district_modifier: IntensityModifier,
}

impl DirectorController {
    pub fn new(registry: Arc<ProfileRegistry>, backend: Arc<dyn AudioBackend>, settings: DirectorSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry,
            backends: Some(Backends {
                district: DistrictDirector::new(Arc::clone(&backend)),
                context: ContextDirector::new(Arc::clone(&backend)),
                audio: backend,
            }),
            scheduler: AmbienceScheduler::new(settings.delay_scale),
            rng,
            state: DirectorState::Idle,
            current_district: None,
            time_of_day: TimeOfDay::default(),
            danger_level: DangerLevel::default(),
            loop_kind: LoopKind::None,
            district_modifier: IntensityModifier::default(),
        }
    }

    /// Build from config, loading the profile registry it names. A bad
    /// catalogue is fatal here rather than at the first transition.
    pub fn from_config(config: &Config, backend: Arc<dyn AudioBackend>) -> Result<Self, DirectorError> {
        let registry = Arc::new(config.registry()?);
        Ok(Self::new(registry, backend, config.director_settings()))
    }

    pub fn state(&self) -> &DirectorState {
        &self.state
    }

    pub fn current_district(&self) -> Option<&str> {
        self.current_district.as_deref()
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.time_of_day
    }

    pub fn danger_level(&self) -> DangerLevel {
        self.danger_level
    }

    pub fn active_loop_kind(&self) -> LoopKind {
        self.loop_kind
    }

    /// Danger modifier pacing the running district loop, if one is running.
    pub fn district_modifier(&self) -> Option<IntensityModifier> {
        (self.loop_kind == LoopKind::District).then_some(self.district_modifier)
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn set_district(&mut self, id: &str) -> Result<(), DirectorError> {
        let Some(backends) = &self.backends else {
            return Ok(());
        };
        info!("entering district '{id}'");
        self.current_district = Some(id.to_string());
        self.state = DirectorState::District { id: id.to_string() };

        match self.registry.district(id).cloned() {
            Some(profile) => {
                let rng = loop_rng(&mut self.rng);
                self.loop_kind = LoopKind::None;
                self.district_modifier = backends.district.activate(
                    &mut self.scheduler,
                    &profile,
                    self.time_of_day,
                    self.danger_level,
                    rng,
                )?;
                self.loop_kind = LoopKind::District;
            }
            None => {
                debug!("no sound profile for district '{id}'");
                self.scheduler.stop();
                self.loop_kind = LoopKind::None;
                backends.audio.stop_music();
            }
        }
        Ok(())
    }

    /// Suspends district ambience; the district id is kept for later.
    pub fn set_context(&mut self, id: &str, intensity: f64) -> Result<(), DirectorError> {
        let Some(backends) = &self.backends else {
            return Ok(());
        };
        info!("entering context '{id}' at intensity {intensity:.2}");

        match self.registry.context(id).cloned() {
            Some(profile) => {
                let rng = loop_rng(&mut self.rng);
                self.loop_kind = LoopKind::None;
                self.state = DirectorState::Context { id: id.to_string(), level: None };
                let level = backends.context.activate(&mut self.scheduler, &profile, intensity, rng)?;
                self.state = DirectorState::Context { id: id.to_string(), level: Some(level) };
                self.loop_kind = LoopKind::Context;
            }
            None => {
                debug!("no sound profile for context '{id}'");
                self.scheduler.stop();
                self.loop_kind = LoopKind::None;
                self.state = DirectorState::Context { id: id.to_string(), level: None };
                backends.audio.stop_music();
            }
        }
        Ok(())
    }

    /// No-op outside a profiled context.
    pub fn update_intensity(&mut self, intensity: f64) -> Result<(), DirectorError> {
        let Some(backends) = &self.backends else {
            return Ok(());
        };
        let DirectorState::Context { id, level: Some(current) } = &self.state else {
            debug!("intensity {intensity:.2} ignored outside a context");
            return Ok(());
        };
        let Some(profile) = self.registry.context(id).cloned() else {
            return Ok(());
        };

        let current = *current;
        let rng = loop_rng(&mut self.rng);
        if let Some(level) = backends
            .context
            .update_intensity(&mut self.scheduler, &profile, current, intensity, rng)?
        {
            info!("context '{}' intensity {} -> {}", profile.id, current.name(), level.name());
            self.state = DirectorState::Context {
                id: profile.id.clone(),
                level: Some(level),
            };
        }
        Ok(())
    }

    pub fn set_time_of_day(&mut self, time_of_day: TimeOfDay) -> Result<(), DirectorError> {
        self.time_of_day = time_of_day;
        self.refresh_district_loop()
    }

    pub fn set_danger_level(&mut self, danger: DangerLevel) -> Result<(), DirectorError> {
        self.danger_level = danger;
        self.refresh_district_loop()
    }

    /// Leave the current context for the remembered district, or go idle if
    /// none was ever set. Does nothing outside a context.
    pub fn return_to_district_ambience(&mut self) -> Result<(), DirectorError> {
        if !matches!(self.state, DirectorState::Context { .. }) {
            return Ok(());
        }
        match self.current_district.clone() {
            Some(id) => self.set_district(&id),
            None => {
                self.scheduler.stop();
                self.loop_kind = LoopKind::None;
                self.state = DirectorState::Idle;
                if let Some(backends) = &self.backends {
                    backends.audio.stop_music();
                }
                Ok(())
            }
        }
    }

    /// Lookup-and-dispatch; never touches controller state.
    pub fn play_event_sound(&self, key: &str) {
        self.play_cue("event", self.registry.event_sound(key), key);
    }

    pub fn play_emotional_cue(&self, key: &str) {
        self.play_cue("emotional cue", self.registry.emotional_cue(key), key);
    }

    pub fn set_music_volume(&self, volume: f32) {
        if let Some(backends) = &self.backends {
            backends.audio.set_music_volume(clamp_volume(volume));
        }
    }

    pub fn set_effects_volume(&self, volume: f32) {
        if let Some(backends) = &self.backends {
            backends.audio.set_effects_volume(clamp_volume(volume));
        }
    }

    /// Disabling stops the current track; enabling resumes the last one requested.
    pub fn set_music_enabled(&self, enabled: bool) {
        if let Some(backends) = &self.backends {
            info!("music {}", if enabled { "enabled" } else { "disabled" });
            backends.audio.set_music_enabled(enabled);
        }
    }

    pub fn set_effects_enabled(&self, enabled: bool) {
        if let Some(backends) = &self.backends {
            info!("effects {}", if enabled { "enabled" } else { "disabled" });
            backends.audio.set_effects_enabled(enabled);
        }
    }

    /// Cancel and join the running loop, stop music and release the backend.
    /// Later calls are no-ops.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.loop_kind = LoopKind::None;
        self.state = DirectorState::Idle;
        if let Some(backends) = self.backends.take() {
            backends.audio.stop_music();
            info!("ambient director shut down");
        }
    }

    fn play_cue(&self, kind: &str, sound: Option<&str>, key: &str) {
        let Some(backends) = &self.backends else {
            return;
        };
        match sound {
            Some(sound) => {
                dispatch_sound(backends.audio.as_ref(), sound);
            }
            None => debug!("no {kind} sound for '{key}'"),
        }
    }

    // Context audio ignores time of day and danger, so only district state restarts.
    fn refresh_district_loop(&mut self) -> Result<(), DirectorError> {
        let Some(backends) = &self.backends else {
            return Ok(());
        };
        let DirectorState::District { id } = &self.state else {
            return Ok(());
        };
        let Some(profile) = self.registry.district(id).cloned() else {
            return Ok(());
        };
        debug!(
            "restarting '{}' for {} / {} danger",
            profile.id, self.time_of_day, self.danger_level
        );
        let rng = loop_rng(&mut self.rng);
        self.loop_kind = LoopKind::None;
        self.district_modifier = backends
            .district
            .resume(&mut self.scheduler, &profile, self.time_of_day, self.danger_level, rng)?;
        self.loop_kind = LoopKind::District;
        Ok(())
    }
}

impl Drop for DirectorController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Each loop gets its own stream split off the controller's seeded one.
fn loop_rng(master: &mut StdRng) -> StdRng {
    StdRng::seed_from_u64(master.gen())
}
