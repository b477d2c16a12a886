//! Two independent periodic loops driving the autonomous parts of the world.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Which loop fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    MonsterDrift,
    EffectSweep,
}

pub struct TickScheduler {
    drift: Interval,
    sweep: Interval,
}

impl TickScheduler {
    /// Both loops first fire one full period after creation.
    pub fn new(drift_every: Duration, sweep_every: Duration) -> Self {
        Self {
            drift: Self::periodic(drift_every),
            sweep: Self::periodic(sweep_every),
        }
    }

    fn periodic(period: Duration) -> Interval {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// Waits for the next firing of either loop. Cancel safe.
    pub async fn next(&mut self) -> Tick {
        tokio::select! {
            _ = self.drift.tick() => Tick::MonsterDrift,
            _ = self.sweep.tick() => Tick::EffectSweep,
        }
    }
}
