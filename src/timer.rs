//! Clock and countdown: the time sources the session engine consumes.
//!
//! - `Clock` supplies monotonic "now" (wall clock in production, a manual double in tests).
//! - `spawn_countdown` delivers one `Tick` per period until its token is cancelled.
//!   The token is a child of the session's own token, so a finished session
//!   can never receive another tick.

use std::time::Duration;

use tokio::{
  sync::mpsc::{self, error::TrySendError},
  task::JoinHandle,
  time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Countdown resolution. Time limits are whole seconds.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

/// Process clock (follows tokio's paused clock under test).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// One countdown event, addressed to the session that armed the timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
  pub session_id: Uuid,
}

/// Spawn the countdown for `session_id`. The first tick fires one `period` after arming.
pub fn spawn_countdown(
  session_id: Uuid,
  period: Duration,
  token: CancellationToken,
  ticks: mpsc::Sender<Tick>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(target: "session", %session_id, period_ms = period.as_millis() as u64, "Countdown armed");
    loop {
      tokio::select! {
        biased;
        _ = token.cancelled() => break,
        _ = interval.tick() => match ticks.try_send(Tick { session_id }) {
          Ok(()) => {}
          // Owner is busy; the session catches up from its clock on the next tick.
          Err(TrySendError::Full(_)) => {
            debug!(target: "session", %session_id, "Tick dropped, owner busy");
          }
          // Owner went away.
          Err(TrySendError::Closed(_)) => break,
        },
      }
    }
    debug!(target: "session", %session_id, "Countdown stopped");
  })
}
