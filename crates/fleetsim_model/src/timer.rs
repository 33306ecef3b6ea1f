use serde::{Deserialize, Serialize};

/// Countdown timer driving vehicle state transitions, in simulated seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Timer {
    remaining: f64,
}

impl Timer {
    pub fn elapsed() -> Self {
        Timer { remaining: 0.0 }
    }

    pub fn set(&mut self, seconds: f64) {
        self.remaining = seconds.max(0.0);
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Advances the timer by one tick of `dt` simulated seconds.
    pub fn tick(&mut self, dt: f64) {
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
    }
}
