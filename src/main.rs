use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info};

use ambient_director::audio::{AudioBackend, RecordingBackend};
use ambient_director::{Config, DangerLevel, DirectorController, DirectorError, TimeOfDay};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the ambient director from the command line", long_about = None)]
struct Cli {
    /// Config file path (defaults to ./ambient_director.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log backend calls instead of opening an audio device
    #[arg(long)]
    dry_run: bool,

    /// Start with music muted
    #[arg(long)]
    no_music: bool,

    /// Start with one-shot effects muted
    #[arg(long)]
    no_effects: bool,

    /// Seconds to linger on each step
    #[arg(long, default_value_t = 8.0)]
    step_secs: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through districts, contexts and cues
    Tour,
    /// Hold a single district
    District {
        id: String,
        #[arg(long, default_value = "day")]
        time: TimeOfDay,
        #[arg(long, default_value = "low")]
        danger: DangerLevel,
    },
    /// Hold a single context at a fixed intensity
    Context {
        id: String,
        #[arg(long, default_value_t = 0.5)]
        intensity: f64,
    },
    /// Print the profile catalogue
    List,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    if let Err(err) = run(&cli, &config) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: &Cli, config: &Config) -> Result<(), DirectorError> {
    if let Command::List = cli.command {
        return list(config);
    }

    let backend = open_backend(cli, config)?;
    let mut director = DirectorController::from_config(config, backend)?;
    director.set_music_volume(config.audio.music_volume);
    director.set_effects_volume(config.audio.effects_volume);
    director.set_music_enabled(config.audio.music_enabled && !cli.no_music);
    director.set_effects_enabled(config.audio.effects_enabled && !cli.no_effects);
    let step = Duration::try_from_secs_f64(cli.step_secs).unwrap_or(Duration::from_secs(8));

    match &cli.command {
        Command::Tour => tour(&mut director, step)?,
        Command::District { id, time, danger } => {
            director.set_time_of_day(*time)?;
            director.set_danger_level(*danger)?;
            director.set_district(id)?;
            thread::sleep(step);
        }
        Command::Context { id, intensity } => {
            director.set_context(id, *intensity)?;
            thread::sleep(step);
        }
        Command::List => {}
    }

    director.shutdown();
    Ok(())
}

#[cfg(feature = "playback")]
fn open_backend(cli: &Cli, config: &Config) -> Result<Arc<dyn AudioBackend>, DirectorError> {
    use ambient_director::audio::RodioBackend;

    if cli.dry_run {
        return Ok(Arc::new(RecordingBackend::new()));
    }
    let backend = RodioBackend::new(config.sounds_dir.clone(), config.audio.clamped())?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "playback"))]
fn open_backend(cli: &Cli, _config: &Config) -> Result<Arc<dyn AudioBackend>, DirectorError> {
    if !cli.dry_run {
        info!("built without playback, logging backend calls instead");
    }
    Ok(Arc::new(RecordingBackend::new()))
}

fn tour(director: &mut DirectorController, step: Duration) -> Result<(), DirectorError> {
    director.play_event_sound("district_enter");
    director.set_district("downtown")?;
    thread::sleep(step);

    info!("night falls");
    director.set_time_of_day(TimeOfDay::Night)?;
    thread::sleep(step);

    info!("the streets turn hostile");
    director.set_danger_level(DangerLevel::High)?;
    thread::sleep(step);

    director.play_emotional_cue("tension");
    director.set_context("combat", 0.3)?;
    thread::sleep(step);

    for intensity in [0.75, 0.95] {
        director.update_intensity(intensity)?;
        thread::sleep(step);
    }

    director.play_emotional_cue("victory");
    director.set_danger_level(DangerLevel::Low)?;
    director.return_to_district_ambience()?;
    thread::sleep(step);
    Ok(())
}

fn list(config: &Config) -> Result<(), DirectorError> {
    let registry = config.registry()?;

    println!("districts: {}", registry.district_ids().join(", "));
    for id in registry.context_ids() {
        let levels = registry
            .context(id)
            .map(|profile| {
                profile
                    .intensity_curve
                    .points()
                    .iter()
                    .map(|point| format!("{}@{:.2}", point.level, point.threshold))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        println!("context {id}: {levels}");
    }
    println!("events: {}", registry.event_keys().join(", "));
    println!("emotions: {}", registry.emotion_keys().join(", "));
    Ok(())
}
