// Timed sequences driven by the session: the pre-roll countdown and the
// stop grace period. The state here is pure; `spawn_repeating` supplies the
// ticks and the session decides what each tick means.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Pre-roll countdown (3-2-1 by default)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    native_start_at: u32,
    native_start_issued: bool,
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub remaining: u32,
    /// True on exactly one tick per countdown
    pub issue_native_start: bool,
    pub finished: bool,
}

impl Countdown {
    pub fn new(from: u32, native_start_at: u32) -> Self {
        Self {
            remaining: from,
            native_start_at,
            native_start_issued: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn native_start_issued(&self) -> bool {
        self.native_start_issued
    }

    pub fn tick(&mut self) -> CountdownTick {
        self.remaining = self.remaining.saturating_sub(1);

        let issue_native_start =
            !self.native_start_issued && self.remaining <= self.native_start_at;
        if issue_native_start {
            self.native_start_issued = true;
        }

        CountdownTick {
            remaining: self.remaining,
            issue_native_start,
            finished: self.remaining == 0,
        }
    }
}

/// Grace period before teardown. Progress is derived from the deadline, not
/// from counting ticks, so late ticks never skew it.
#[derive(Debug, Clone, PartialEq)]
pub struct StopSequence {
    pub deadline: Instant,
    pub duration: Duration,
    pub progress: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopTick {
    pub progress: f64,
    pub elapsed: bool,
}

impl StopSequence {
    pub fn begin(now: Instant, duration: Duration) -> Self {
        Self {
            deadline: now + duration,
            duration,
            progress: 0.0,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn advance(&mut self, now: Instant) -> StopTick {
        let remaining = self.remaining(now);
        let elapsed = remaining.is_zero();

        let progress = if elapsed {
            1.0
        } else {
            let total = self.duration.as_secs_f64();
            ((total - remaining.as_secs_f64()) / total).clamp(0.0, 1.0)
        };
        self.progress = self.progress.max(progress);

        StopTick {
            progress: self.progress,
            elapsed,
        }
    }
}

/// Call `on_tick` every `period` (first call one period from now) until it
/// returns `false`.
pub(crate) fn spawn_repeating<F, Fut>(period: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !on_tick().await {
                break;
            }
        }
    })
}
