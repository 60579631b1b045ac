//! Cancellable periodic loop shared by district and context ambience.
//!
//! Each loop runs on its own thread and repeats: check generation, tick,
//! sleep for a data-driven delay. The scheduler owns a generation counter;
//! starting or stopping a loop bumps it, and a loop whose captured generation
//! is no longer current exits at its next wake-up without ticking again.
//! Retiring a loop also drops its wake channel so the sleep ends early, then
//! joins the thread, so once `start`/`stop` return the previous loop can no
//! longer dispatch.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};

use super::DirectorError;

/// Upper bound for a single sleep, whatever the profile data says.
pub const MAX_DELAY: Duration = Duration::from_secs(600);
/// Lower bound for a single sleep; a loop never spins.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Body of a periodic loop.
pub trait Ambience: Send + 'static {
    /// One scheduling step. Must not block beyond fire-and-forget dispatch.
    fn tick(&mut self);
    /// How long to wait before the next tick.
    fn next_delay(&mut self) -> Duration;
}

/// Closure-backed ambience, mostly handy in tests.
pub struct FnAmbience<A, D> {
    action: A,
    delay: D,
}

pub fn from_fns<A, D>(action: A, delay: D) -> FnAmbience<A, D>
where
    A: FnMut() + Send + 'static,
    D: FnMut() -> Duration + Send + 'static,
{
    FnAmbience { action, delay }
}

impl<A, D> Ambience for FnAmbience<A, D>
where
    A: FnMut() + Send + 'static,
    D: FnMut() -> Duration + Send + 'static,
{
    fn tick(&mut self) {
        (self.action)()
    }

    fn next_delay(&mut self) -> Duration {
        (self.delay)()
    }
}

struct ActiveLoop {
    generation: u64,
    wake: Sender<()>,
    handle: JoinHandle<()>,
}

impl ActiveLoop {
    /// Caller must already have bumped the generation.
    fn retire(self) {
        drop(self.wake);
        if self.handle.join().is_err() {
            error!("ambience loop {} terminated abnormally", self.generation);
        }
    }
}

pub struct AmbienceScheduler {
    generation: Arc<AtomicU64>,
    delay_scale: f64,
    active: Option<ActiveLoop>,
}

impl AmbienceScheduler {
    pub fn new(delay_scale: f64) -> Self {
        let delay_scale = if delay_scale.is_finite() && delay_scale > 0.0 {
            delay_scale
        } else {
            warn!("delay scale {delay_scale} is not positive; using 1.0");
            1.0
        };
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            delay_scale,
            active: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Replace whatever loop is running with `ambience`. Returns the new
    /// loop's generation.
    pub fn start<A: Ambience>(&mut self, name: &str, ambience: A) -> Result<u64, DirectorError> {
        let mine = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(previous) = self.active.take() {
            previous.retire();
        }

        let (wake, wake_rx) = crossbeam_channel::bounded(1);
        let generation = Arc::clone(&self.generation);
        let delay_scale = self.delay_scale;
        let thread_name = format!("ambience-{name}");
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_loop(ambience, generation, mine, wake_rx, delay_scale, thread_name))
            .map_err(DirectorError::Spawn)?;

        debug!("ambience loop {mine} ({name}) started");
        self.active = Some(ActiveLoop {
            generation: mine,
            wake,
            handle,
        });
        Ok(mine)
    }

    /// Cancel the running loop, if any, without starting a replacement.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(previous) = self.active.take() {
            debug!("ambience loop {} stopped", previous.generation);
            previous.retire();
        }
    }
}

impl Drop for AmbienceScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<A: Ambience>(
    mut ambience: A,
    generation: Arc<AtomicU64>,
    mine: u64,
    wake: Receiver<()>,
    delay_scale: f64,
    name: String,
) {
    while generation.load(Ordering::Acquire) == mine {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| ambience.tick())) {
            error!("{name}: tick panicked: {}", panic_message(payload.as_ref()));
        }

        let delay = scale_delay(ambience.next_delay(), delay_scale);
        debug!("{name}: next tick in {:.2}s", delay.as_secs_f64());
        // Retiring drops the sender; the generation check below decides either way.
        if let Err(RecvTimeoutError::Disconnected) = wake.recv_timeout(delay) {
            debug!("{name}: woken for retirement");
        }
    }
    debug!("{name}: generation {mine} is stale, exiting");
}

fn scale_delay(delay: Duration, scale: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * scale)
        .unwrap_or(MAX_DELAY)
        .clamp(MIN_DELAY, MAX_DELAY)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "non-string panic payload"
    }
}
