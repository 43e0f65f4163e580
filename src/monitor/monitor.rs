use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::MonitorConfig;
use super::warning::{AudioQuality, Warning, WarningKind};

/// Number of level samples kept for each check
pub const WINDOW_CAPACITY: usize = 10;

/// A warning kind is not re-emitted within this span
pub const DEDUP_WINDOW: Duration = Duration::from_secs(10);

/// Emitted warnings retained for [`LevelMonitor::get_recent_warnings`]
pub const MAX_WARNING_HISTORY: usize = 50;

/// Count returned by callers that have no preference
pub const DEFAULT_RECENT_WARNINGS: usize = 5;

/// Observer invoked with every emitted warning
pub type WarningCallback = Arc<dyn Fn(&Warning) -> Result<()> + Send + Sync>;

/// Handle returned by [`LevelMonitor::on_warning`] for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarningCallbackId(u64);

struct HistoryEntry {
    emitted_at: Instant,
    warning: Warning,
}

struct MonitorState {
    /// Most recent level samples, oldest first
    window: VecDeque<f32>,

    /// Last time a level above the silence threshold arrived
    last_audio_at: Instant,

    history: VecDeque<HistoryEntry>,

    callbacks: Vec<(WarningCallbackId, WarningCallback)>,

    next_callback_id: u64,

    /// Periodic check task while running
    timer: Option<JoinHandle<()>>,

    disposed: bool,
}

struct Inner {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

/// Window statistics used by both the periodic check and the quality verdict
struct Levels {
    avg: f32,
    max: f32,
    since_audio: Duration,
}

/// Streaming signal-health monitor.
///
/// Feed it level samples with [`update_audio_level`](Self::update_audio_level);
/// while running it classifies the recent window every `check_interval` and
/// notifies registered observers of silence, low level and clipping.
///
/// Cloning yields another handle to the same monitor, so the capture consumer
/// and the owner of the observers can hold it independently.
#[derive(Clone)]
pub struct LevelMonitor {
    inner: Arc<Inner>,
}

impl LevelMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(MonitorState {
                    window: VecDeque::with_capacity(WINDOW_CAPACITY),
                    last_audio_at: Instant::now(),
                    history: VecDeque::new(),
                    callbacks: Vec::new(),
                    next_callback_id: 0,
                    timer: None,
                    disposed: false,
                }),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Start periodic checks, discarding any previous levels and warnings.
    ///
    /// Restarts cleanly when already running. Outside a Tokio runtime the
    /// call is logged and ignored.
    pub fn start(&self) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot start level monitor outside a Tokio runtime: {}", e);
                return;
            }
        };

        let mut state = self.lock();
        if state.disposed {
            warn!("Ignoring start on a disposed level monitor");
            return;
        }

        if let Some(timer) = state.timer.take() {
            debug!("Level monitor already running, restarting");
            timer.abort();
        }

        state.window.clear();
        state.history.clear();
        state.last_audio_at = Instant::now();
        state.timer = Some(self.spawn_checker(&runtime));

        info!(
            "Level monitor started (check every {}ms)",
            self.inner.config.check_interval().as_millis()
        );
    }

    /// Cancel periodic checks. Levels and warnings are kept until the next start.
    pub fn stop(&self) {
        if let Some(timer) = self.lock().timer.take() {
            timer.abort();
            info!("Level monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().timer.is_some()
    }

    /// Record one level sample in [0, 1]. Out-of-range values are clamped and NaN counts as silence.
    pub fn update_audio_level(&self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };

        let mut state = self.lock();
        if state.disposed {
            return;
        }

        if state.window.len() == WINDOW_CAPACITY {
            state.window.pop_front();
        }
        state.window.push_back(level);

        if level > self.inner.config.no_audio_threshold {
            state.last_audio_at = Instant::now();
        }
    }

    /// Number of level samples currently held.
    pub fn window_len(&self) -> usize {
        self.lock().window.len()
    }

    /// Classify the current window and emit any new warnings.
    ///
    /// This is what the periodic timer runs; it can also be called directly.
    pub fn check(&self) {
        let config = &self.inner.config;
        let levels = {
            let state = self.lock();
            match Self::levels(&state, Instant::now()) {
                Some(levels) => levels,
                None => return,
            }
        };

        if levels.since_audio > config.no_audio_duration() && levels.avg < config.no_audio_threshold
        {
            self.emit(WarningKind::NoAudio);
        } else if levels.avg > config.no_audio_threshold && levels.avg < config.low_audio_threshold
        {
            self.emit(WarningKind::LowAudio);
        }

        if levels.max > config.clipping_threshold {
            self.emit(WarningKind::Clipping);
        }
    }

    /// Register an observer. Observers run in registration order.
    ///
    /// An observer that returns an error or panics is logged and skipped; the
    /// remaining observers still run.
    pub fn on_warning<F>(&self, callback: F) -> WarningCallbackId
    where
        F: Fn(&Warning) -> Result<()> + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = WarningCallbackId(state.next_callback_id);
        state.next_callback_id += 1;

        if state.disposed {
            warn!("Ignoring warning callback registered on a disposed level monitor");
            return id;
        }

        state.callbacks.push((id, Arc::new(callback)));
        id
    }

    /// Remove an observer. Returns false when `id` was not registered.
    pub fn remove_warning_callback(&self, id: WarningCallbackId) -> bool {
        let mut state = self.lock();
        let before = state.callbacks.len();
        state.callbacks.retain(|(registered, _)| *registered != id);
        state.callbacks.len() != before
    }

    /// The last `n` emitted warnings, oldest first.
    pub fn get_recent_warnings(&self, n: usize) -> Vec<Warning> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(n);
        state
            .history
            .iter()
            .skip(skip)
            .map(|entry| entry.warning.clone())
            .collect()
    }

    /// Verdict on the current window.
    pub fn get_audio_quality(&self) -> AudioQuality {
        let config = &self.inner.config;
        let levels = match Self::levels(&self.lock(), Instant::now()) {
            Some(levels) => levels,
            None => return AudioQuality::NoSignal,
        };

        if levels.since_audio > config.no_audio_duration() {
            AudioQuality::NoSignal
        } else if levels.avg < config.no_audio_threshold {
            AudioQuality::Poor
        } else if levels.avg < config.low_audio_threshold || levels.max > config.clipping_threshold {
            AudioQuality::Fair
        } else if (0.3..=0.7).contains(&levels.avg) {
            AudioQuality::Excellent
        } else {
            AudioQuality::Good
        }
    }

    /// Stop checks and drop all observers, levels and warnings.
    ///
    /// The monitor ignores further use.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.callbacks.clear();
        state.window.clear();
        state.history.clear();
        state.disposed = true;

        info!("Level monitor disposed");
    }

    fn levels(state: &MonitorState, now: Instant) -> Option<Levels> {
        if state.window.is_empty() {
            return None;
        }

        let sum: f32 = state.window.iter().sum();
        let max = state.window.iter().copied().fold(0.0_f32, f32::max);

        Some(Levels {
            avg: sum / state.window.len() as f32,
            max,
            since_audio: now.saturating_duration_since(state.last_audio_at),
        })
    }

    fn emit(&self, kind: WarningKind) {
        let (warning, callbacks) = {
            let mut state = self.lock();
            let now = Instant::now();

            let duplicate = state.history.iter().rev().any(|entry| {
                entry.warning.kind == kind && now.saturating_duration_since(entry.emitted_at) < DEDUP_WINDOW
            });
            if duplicate {
                debug!("Suppressing duplicate {} warning", kind);
                return;
            }

            let warning = Warning::new(kind);
            state.history.push_back(HistoryEntry {
                emitted_at: now,
                warning: warning.clone(),
            });
            while state.history.len() > MAX_WARNING_HISTORY {
                state.history.pop_front();
            }

            let callbacks: Vec<WarningCallback> =
                state.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect();
            (warning, callbacks)
        };

        warn!("Audio warning [{}]: {}", warning.kind, warning.message);

        for callback in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&warning))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Warning callback failed: {:#}", e),
                Err(_) => error!("Warning callback panicked while handling {}", warning.kind),
            }
        }
    }

    fn spawn_checker(&self, runtime: &Handle) -> JoinHandle<()> {
        let monitor: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.check_interval();
        let first_tick = Instant::now() + period;

        runtime.spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match monitor.upgrade() {
                    Some(inner) => LevelMonitor { inner }.check(),
                    None => break,
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LevelMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
