use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::toggles::{MusicAction, PlaybackToggles};
use super::{AudioBackend, BackendError};
use crate::settings::{clamp_volume, AudioSettings};

const MUSIC_EXTENSIONS: [&str; 3] = ["ogg", "mp3", "wav"];

enum Command {
    PlayMusic { track: String, looped: bool },
    StopMusic,
    PlaySound(String),
    MusicVolume(f32),
    EffectsVolume(f32),
    MusicEnabled(bool),
    EffectsEnabled(bool),
    Shutdown,
}

/// Rodio playback on a dedicated thread.
///
/// The output stream is not `Send`, so it lives on the playback thread and
/// this handle only forwards commands over a channel. Every trait call is a
/// non-blocking send; missing or undecodable assets are logged by the
/// playback thread and otherwise ignored.
pub struct RodioBackend {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl RodioBackend {
    /// Opens the default output device. Failure to do so is a startup error.
    pub fn new(sounds_dir: impl Into<PathBuf>, settings: AudioSettings) -> Result<Self, BackendError> {
        let sounds_dir = sounds_dir.into();
        let (commands, inbox) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let worker = thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(err) => {
                        let _ = ready_tx.send(Err(BackendError::Device(err.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                Player::new(handle, &sounds_dir, settings.clamped()).run(inbox);
            })
            .map_err(|err| BackendError::Device(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("rodio output stream ready");
                Ok(Self {
                    commands,
                    worker: Some(worker),
                })
            }
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => Err(BackendError::Disconnected),
        }
    }

    fn send(&self, command: Command) -> Result<(), BackendError> {
        self.commands.send(command).map_err(|_| BackendError::Disconnected)
    }

    fn post(&self, command: Command) {
        if self.send(command).is_err() {
            debug!("playback thread gone, command dropped");
        }
    }
}

impl AudioBackend for RodioBackend {
    fn play_music(&self, track_id: &str, looped: bool) -> Result<(), BackendError> {
        self.send(Command::PlayMusic {
            track: track_id.to_string(),
            looped,
        })
    }

    fn stop_music(&self) {
        self.post(Command::StopMusic);
    }

    fn play_sound(&self, sound_id: &str) -> Result<(), BackendError> {
        self.send(Command::PlaySound(sound_id.to_string()))
    }

    fn set_music_volume(&self, volume: f32) {
        self.post(Command::MusicVolume(volume));
    }

    fn set_effects_volume(&self, volume: f32) {
        self.post(Command::EffectsVolume(volume));
    }

    fn set_music_enabled(&self, enabled: bool) {
        self.post(Command::MusicEnabled(enabled));
    }

    fn set_effects_enabled(&self, enabled: bool) {
        self.post(Command::EffectsEnabled(enabled));
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("playback thread panicked");
            }
        }
    }
}

/// State owned by the playback thread.
struct Player {
    handle: OutputStreamHandle,
    music_dir: PathBuf,
    effects_dir: PathBuf,
    settings: AudioSettings,
    toggles: PlaybackToggles,
    music: Option<Sink>,
    effects: HashMap<String, Arc<[u8]>>,
}

impl Player {
    fn new(handle: OutputStreamHandle, sounds_dir: &Path, settings: AudioSettings) -> Self {
        Self {
            handle,
            music_dir: sounds_dir.join("music"),
            effects_dir: sounds_dir.join("effects"),
            toggles: PlaybackToggles::new(&settings),
            settings,
            music: None,
            effects: HashMap::new(),
        }
    }

    fn run(mut self, inbox: Receiver<Command>) {
        for command in inbox.iter() {
            let result = match command {
                Command::Shutdown => break,
                Command::PlayMusic { track, looped } => {
                    let action = self.toggles.request_music(&track, looped);
                    self.apply(action)
                }
                Command::StopMusic => {
                    let action = self.toggles.stop_music();
                    self.apply(action)
                }
                Command::PlaySound(id) => self.play_effect(&id),
                Command::MusicVolume(volume) => {
                    self.settings.music_volume = clamp_volume(volume);
                    if let Some(sink) = &self.music {
                        sink.set_volume(self.settings.music_volume);
                    }
                    Ok(())
                }
                Command::EffectsVolume(volume) => {
                    self.settings.effects_volume = clamp_volume(volume);
                    Ok(())
                }
                Command::MusicEnabled(enabled) => {
                    let action = self.toggles.set_music_enabled(enabled, self.music.is_some());
                    self.apply(action)
                }
                Command::EffectsEnabled(enabled) => {
                    self.toggles.set_effects_enabled(enabled);
                    Ok(())
                }
            };
            if let Err(err) = result {
                warn!("{err}");
            }
        }
        self.halt_music();
        debug!("playback thread exiting");
    }

    fn apply(&mut self, action: MusicAction) -> Result<(), BackendError> {
        match action {
            MusicAction::Start(request) => self.start_music(&request.track, request.looped),
            MusicAction::Halt => {
                self.halt_music();
                Ok(())
            }
            MusicAction::Keep => Ok(()),
        }
    }

    fn start_music(&mut self, track: &str, looped: bool) -> Result<(), BackendError> {
        self.halt_music();
        let path = resolve_music_path(&self.music_dir, track)
            .ok_or_else(|| BackendError::UnknownTrack(track.to_string()))?;

        let file = File::open(&path).map_err(|err| decode_error(&path, err))?;
        let source = Decoder::new(BufReader::new(file)).map_err(|err| decode_error(&path, err))?;
        let sink = Sink::try_new(&self.handle).map_err(|err| BackendError::Device(err.to_string()))?;
        sink.set_volume(self.settings.music_volume);
        if looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        debug!("music {} playing", path.display());
        self.music = Some(sink);
        Ok(())
    }

    fn halt_music(&mut self) {
        if let Some(sink) = self.music.take() {
            sink.stop();
        }
    }

    fn play_effect(&mut self, id: &str) -> Result<(), BackendError> {
        if !self.toggles.effects_enabled() {
            return Ok(());
        }
        let bytes = match self.effects.get(id) {
            Some(bytes) => Arc::clone(bytes),
            None => {
                let path = effect_path(&self.effects_dir, id);
                let data: Arc<[u8]> = fs::read(&path)
                    .map_err(|_| BackendError::UnknownSound(id.to_string()))?
                    .into();
                self.effects.insert(id.to_string(), Arc::clone(&data));
                data
            }
        };
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|err| decode_error(&effect_path(&self.effects_dir, id), err))?;
        let sink = Sink::try_new(&self.handle).map_err(|err| BackendError::Device(err.to_string()))?;
        sink.set_volume(self.settings.effects_volume);
        sink.append(source);
        sink.detach();
        Ok(())
    }
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn effect_path(effects_dir: &Path, id: &str) -> PathBuf {
    effects_dir.join(format!("{id}.wav"))
}

/// First of `<track>.ogg`, `<track>.mp3`, `<track>.wav` that exists.
fn resolve_music_path(music_dir: &Path, track: &str) -> Option<PathBuf> {
    MUSIC_EXTENSIONS
        .iter()
        .map(|ext| music_dir.join(format!("{track}.{ext}")))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_lookup_prefers_ogg_then_mp3_then_wav() {
        let dir = std::env::temp_dir().join(format!("ambient_director_music_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("combat_theme.wav"), b"").unwrap();
        fs::write(dir.join("combat_theme.mp3"), b"").unwrap();

        let found = resolve_music_path(&dir, "combat_theme");
        let missing = resolve_music_path(&dir, "stealth_theme");
        fs::remove_dir_all(&dir).ok();

        assert_eq!(found, Some(dir.join("combat_theme.mp3")));
        assert_eq!(missing, None);
    }

    #[test]
    fn effects_are_wav_files_under_effects_dir() {
        let path = effect_path(Path::new("sounds/effects"), "door_open");
        assert_eq!(path, PathBuf::from("sounds/effects/door_open.wav"));
    }
}
