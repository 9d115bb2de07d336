//! Readiness poller
//!
//! Some transports report "open" before the outbound buffer is drainable.
//! The poller re-samples readiness on a short fixed interval until the
//! probe confirms it (or gives up because the channel closed), then the
//! task exits on its own. The owning controller can stop it at any time.

use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Outcome of one readiness sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollStatus {
    /// Not ready yet, keep sampling
    Pending,
    /// Readiness confirmed (now or earlier)
    Confirmed,
    /// Channel no longer open, stop without confirming
    Abandoned,
}

/// Something whose readiness can be sampled
pub(crate) trait ReadinessProbe: Send + Sync + 'static {
    /// Sample readiness once. Must never fail; unknown state is `Pending`.
    fn poll_readiness(&self) -> PollStatus;
}

/// Controller-owned, cancellable repeating readiness timer
#[derive(Debug)]
pub(crate) struct ReadinessPoller {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl ReadinessPoller {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Whether a timer is currently armed
    pub(crate) fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Arm the repeating timer
    ///
    /// The first tick fires one interval from now; the caller performs the
    /// immediate check itself before arming. Arming an active poller is a no-op.
    /// The task holds only a weak reference, so it ends once the probe is gone.
    pub(crate) fn arm<P: ReadinessProbe>(&mut self, runtime: &Handle, probe: Weak<P>) {
        if self.task.is_some() {
            return;
        }

        let interval = self.interval;
        // Schedule is anchored at arm time, not at the task's first poll.
        let first_tick = Instant::now() + interval;

        self.task = Some(runtime.spawn(async move {
            let mut ticker = time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(probe) = probe.upgrade() else {
                    break;
                };

                if probe.poll_readiness() != PollStatus::Pending {
                    break;
                }
            }
        }));
    }

    /// Forget the timer without aborting it
    ///
    /// Used by the probe when it has just returned a terminal status from
    /// inside the task, which then exits by itself.
    pub(crate) fn release(&mut self) {
        self.task = None;
    }

    /// Cancel the timer if armed. No tick fires after this returns.
    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ReadinessPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
