//! Short-lived combat effects with time-based expiry.
//!
//! Timestamps are wall-clock milliseconds. An effect created at `T` is live
//! for every `now < T + ttl` and expired from `T + ttl` onwards.

use shared::{EffectKind, EffectView};

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    pub created_at: u64,
}

impl Effect {
    pub fn attack(x: f32, y: f32, created_at: u64) -> Self {
        Effect {
            kind: EffectKind::Attack,
            x,
            y,
            created_at,
        }
    }

    pub fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.created_at) >= ttl_ms
    }

    pub fn view(&self) -> EffectView {
        EffectView {
            kind: self.kind,
            x: self.x,
            y: self.y,
            timestamp: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectLog {
    effects: Vec<Effect>,
    ttl_ms: u64,
}

impl EffectLog {
    pub fn new(ttl_ms: u64) -> Self {
        EffectLog {
            effects: Vec::new(),
            ttl_ms,
        }
    }

    /// Appends an effect, discarding anything already expired at `now`.
    pub fn record(&mut self, effect: Effect, now: u64) {
        self.sweep(now);
        self.effects.push(effect);
    }

    /// Drops every expired effect and returns how many were removed.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.effects.len();
        let ttl_ms = self.ttl_ms;
        self.effects.retain(|effect| !effect.is_expired(now, ttl_ms));
        before - self.effects.len()
    }

    /// Effects still live at `now`, oldest first.
    pub fn active(&self, now: u64) -> Vec<EffectView> {
        self.effects
            .iter()
            .filter(|effect| !effect.is_expired(now, self.ttl_ms))
            .map(Effect::view)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
