//! The control plane's clock.
//!
//! Two cadences drive everything else: hourly (top of the hour) and daily
//! (local midnight). Each starts with a delay up to its next wall-clock
//! boundary and then fires on a fixed interval, so a restart re-aligns to the
//! next boundary instead of drifting from the start time.
//!
//! Each cadence carries its own [`SingleFlight`] guard: a tick that fires
//! while the previous tick of the same cadence is still running is skipped.
//! Progress through the incident log is checkpointed in
//! [`OrchestratorState`] after every trigger pass.

mod alignment;
mod flight;
mod orchestrator;
mod state;


pub use alignment::{delay_until, next_hour_boundary, next_midnight};
pub use flight::{FlightPermit, SingleFlight};
pub use orchestrator::{Housekeeping, Orchestrator, TickKind, TickReport};
pub use state::OrchestratorState;

use chrono::Local;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub const HOURLY_PERIOD: Duration = Duration::from_secs(60 * 60);
pub const DAILY_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Owns the cadence timers of one [`Orchestrator`].
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Start both cadences. Returns false when the orchestrator is disabled
    /// or the scheduler is already running. Must be called inside a tokio
    /// runtime.
    pub fn start(&self) -> bool {
        if !self.orchestrator.config().orchestrator.enabled {
            info!("orchestrator disabled, scheduler not started");
            return false;
        }

        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        if !timers.is_empty() {
            return false;
        }

        let now = Local::now();
        let hourly_delay = delay_until(&now, &next_hour_boundary(&now));
        let daily_delay = delay_until(&now, &next_midnight(&now));

        let orchestrator = Arc::clone(&self.orchestrator);
        timers.push(spawn_cadence(
            TickKind::Hourly,
            hourly_delay,
            HOURLY_PERIOD,
            SingleFlight::new(),
            move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    if let Err(e) = orchestrator.hourly_tick().await {
                        warn!(error = %e, "hourly tick failed");
                    }
                }
            },
        ));

        let orchestrator = Arc::clone(&self.orchestrator);
        timers.push(spawn_cadence(
            TickKind::Daily,
            daily_delay,
            DAILY_PERIOD,
            SingleFlight::new(),
            move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    if let Err(e) = orchestrator.daily_tick().await {
                        warn!(error = %e, "daily tick failed");
                    }
                }
            },
        ));

        info!(
            hourly_in_secs = hourly_delay.as_secs(),
            daily_in_secs = daily_delay.as_secs(),
            "scheduler started"
        );
        true
    }

    /// Cancel both timers. A tick already running finishes on its own.
    pub fn stop(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        if timers.is_empty() {
            return;
        }
        for timer in timers.drain(..) {
            timer.abort();
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        !self
            .timers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep `initial`, then call `tick` every `period`. Each tick runs on its
/// own task under `flight`; a tick due while one is in flight is skipped.
pub(crate) fn spawn_cadence<F, Fut>(
    kind: TickKind,
    initial: Duration,
    period: Duration,
    flight: SingleFlight,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(initial).await;

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(permit) = flight.try_acquire() else {
                warn!(tick = %kind, "previous tick still running, skipping");
                continue;
            };
            let run = tick();
            tokio::spawn(async move {
                run.await;
                drop(permit);
            });
        }
    })
}
