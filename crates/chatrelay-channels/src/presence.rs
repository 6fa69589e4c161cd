use std::sync::Arc;
use std::time::Duration;

use chatrelay_common::ThreadId;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Ranges the randomized typing plan is drawn from. All bounds inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceBounds {
    pub initial_delay: (Duration, Duration),
    pub pulses: (u32, u32),
    pub pause: (Duration, Duration),
    pub max_duration: (Duration, Duration),
}

impl Default for PresenceBounds {
    fn default() -> Self {
        Self {
            initial_delay: (Duration::from_secs(5), Duration::from_secs(9)),
            pulses: (1, 10),
            pause: (Duration::from_secs(1), Duration::from_secs(2)),
            max_duration: (Duration::from_secs(5), Duration::from_secs(24)),
        }
    }
}

/// A concrete, finite typing schedule: signal, wait `initial_delay`, then one
/// more signal after each pause until the pauses run out or `max_duration`
/// has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PresencePlan {
    pub initial_delay: Duration,
    pub pauses: Vec<Duration>,
    pub max_duration: Duration,
}

impl PresencePlan {
    pub fn random<R: Rng + ?Sized>(bounds: &PresenceBounds, rng: &mut R) -> Self {
        let pulses = pick_u32(rng, bounds.pulses);
        Self {
            initial_delay: pick_duration(rng, bounds.initial_delay),
            pauses: (0..pulses).map(|_| pick_duration(rng, bounds.pause)).collect(),
            max_duration: pick_duration(rng, bounds.max_duration),
        }
    }
}

fn pick_duration<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (Duration, Duration)) -> Duration {
    if hi <= lo { lo } else { rng.random_range(lo..=hi) }
}

fn pick_u32<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (u32, u32)) -> u32 {
    if hi <= lo { lo } else { rng.random_range(lo..=hi) }
}

/// Keeps the chat surface's typing indicator alive while a completion is pending.
pub struct PresenceSimulator;

impl PresenceSimulator {
    /// Spawn the typing task for `thread_id`. Signal failures are ignored.
    pub fn start(
        surface: Arc<dyn crate::traits::ChatSurface>,
        thread_id: ThreadId,
        plan: PresencePlan,
    ) -> PresenceHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_plan(surface, thread_id, plan, stop_rx));
        PresenceHandle { stop_tx, task }
    }
}

/// Owner of a running typing task. Dropping it without `stop` also ends the task.
pub struct PresenceHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<u32>,
}

impl PresenceHandle {
    /// Cancel the remaining schedule and wait for the task. Returns the number
    /// of typing signals sent.
    pub async fn stop(self) -> u32 {
        let _ = self.stop_tx.send(true);
        self.join().await
    }

    /// Wait for the schedule to run out on its own.
    pub async fn finished(self) -> u32 {
        self.join().await
    }

    async fn join(self) -> u32 {
        let PresenceHandle { stop_tx, task } = self;
        let pulses = task.await.unwrap_or_else(|e| {
            debug!("presence task ended abnormally: {e}");
            0
        });
        drop(stop_tx);
        pulses
    }
}

async fn run_plan(
    surface: Arc<dyn crate::traits::ChatSurface>,
    thread_id: ThreadId,
    plan: PresencePlan,
    mut stop_rx: watch::Receiver<bool>,
) -> u32 {
    let started = Instant::now();
    let mut pulses = 0;

    if *stop_rx.borrow() {
        return pulses;
    }
    if signal(surface.as_ref(), &thread_id, &mut pulses, &mut stop_rx).await {
        return pulses;
    }

    if pause(&mut stop_rx, plan.initial_delay).await {
        return pulses;
    }

    for delay in plan.pauses {
        if pause(&mut stop_rx, delay).await {
            break;
        }
        if started.elapsed() >= plan.max_duration {
            break;
        }
        if signal(surface.as_ref(), &thread_id, &mut pulses, &mut stop_rx).await {
            break;
        }
    }

    debug!(thread = %thread_id, pulses, "presence schedule finished");
    pulses
}

/// Send one typing signal. A stop request abandons a signal still in flight.
/// Returns true when stopped.
async fn signal(
    surface: &dyn crate::traits::ChatSurface,
    thread_id: &ThreadId,
    pulses: &mut u32,
    stop_rx: &mut watch::Receiver<bool>,
) -> bool {
    *pulses += 1;
    tokio::select! {
        result = surface.signal_typing(thread_id) => {
            if let Err(e) = result {
                debug!(thread = %thread_id, "typing signal failed: {e}");
            }
            false
        }
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}

/// Sleep for `duration` unless stopped first. Returns true when stopped.
async fn pause(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}
