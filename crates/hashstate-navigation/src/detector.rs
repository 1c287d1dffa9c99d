//! Change detection
//!
//! Native mode registers one listener with the location. Polling mode runs
//! a tokio interval that compares the current token with the last known
//! one. Both end in `Engine::on_location_signal`.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::Engine;
use crate::error::NavigationError;
use crate::Result;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    Native,
    Polling(Duration),
}

impl DetectionMode {
    pub fn is_native(&self) -> bool {
        matches!(self, DetectionMode::Native)
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMode::Native => write!(f, "native"),
            DetectionMode::Polling(interval) => write!(f, "polling every {}ms", interval.as_millis()),
        }
    }
}

/// The running polling task. Dropping the handle detaches the task; only
/// `cancel` stops it.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
    interval: Duration,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

pub struct ChangeDetector {
    engine: Engine,
    poll_interval: Duration,
}

impl ChangeDetector {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Attach to the engine's location. With `native` set, a listener is
    /// tried first; a location that cannot deliver events falls back to
    /// polling.
    pub fn start(self, native: bool) -> Result<DetectionMode> {
        if native {
            if self.attach_native() {
                tracing::info!("Using native change events");
                return Ok(DetectionMode::Native);
            }
            tracing::warn!("Location has no native change events, falling back to polling");
        }

        self.start_polling()?;
        tracing::info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Using manual change detection"
        );
        Ok(DetectionMode::Polling(self.poll_interval))
    }

    fn attach_native(&self) -> bool {
        let weak = self.engine.downgrade();
        self.engine.location().listen(Arc::new(move || {
            if let Some(engine) = weak.upgrade() {
                engine.on_location_signal();
            }
        }))
    }

    fn start_polling(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| NavigationError::NoRuntime)?;

        let weak = self.engine.downgrade();
        let interval = self.poll_interval;
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(engine) => engine.poll(),
                    None => break,
                }
            }
        });

        self.engine.set_poll_handle(PollHandle { task, interval });
        Ok(())
    }
}
