//! The agent contract and the cooldown timer agents pace themselves with.

use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks};
use telco_core::rng::SimRng;

/// Score of an agent that staged a purchase it can afford.
pub const PURCHASE_SCORE: Fixed64 = Fixed64::const_from_int(100);
/// Score of a staged node placement.
pub const NODE_SCORE: Fixed64 = Fixed64::const_from_int(80);
/// Upper bound of the cable placement score.
pub const CABLE_SCORE_CAP: Fixed64 = Fixed64::const_from_int(90);

/// One strategy of an AI company.
///
/// `score` is called while the executor is idle. It may stage a decision
/// and restart its own cooldown, and returns zero when it has nothing to
/// do. `execute` commits the staged decision once the agent was selected
/// and returns true when the job is finished; returning false keeps the
/// agent selected for the next step.
pub trait Agent {
    fn name(&self) -> &'static str;

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64;

    fn execute(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> bool;
}

// ---------------------------------------------------------------------------
// Cooldown
// ---------------------------------------------------------------------------

/// Countdown restarted at a random length in `[band / 2, band * 3 / 2)`,
/// so agents sharing a band drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    band: Ticks,
    remaining: Ticks,
}

impl Cooldown {
    /// A cooldown that is ready immediately.
    pub fn new(band: Ticks) -> Self {
        Self { band, remaining: 0 }
    }

    pub fn band(&self) -> Ticks {
        self.band
    }

    pub fn remaining(&self) -> Ticks {
        self.remaining
    }

    pub fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    /// Count down by `dt`. Returns whether the cooldown has run out.
    pub fn tick(&mut self, dt: Ticks) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.is_ready()
    }

    pub fn reset(&mut self, rng: &mut SimRng) {
        let low = self.band / 2;
        let high = self.band.saturating_mul(3) / 2;
        self.remaining = rng.range_u64(low, high);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_stays_in_band() {
        let mut rng = SimRng::new(9);
        let mut cooldown = Cooldown::new(100);
        assert!(cooldown.is_ready());
        for _ in 0..200 {
            cooldown.reset(&mut rng);
            assert!((50..150).contains(&cooldown.remaining()));
        }
    }

    #[test]
    fn cooldown_counts_down() {
        let mut rng = SimRng::new(1);
        let mut cooldown = Cooldown::new(2);
        cooldown.reset(&mut rng);
        // Band 2 gives a countdown in [1, 3).
        let start = cooldown.remaining();
        assert!(start == 1 || start == 2);
        assert!(cooldown.tick(start));
        assert!(cooldown.tick(5));
    }

    #[test]
    fn zero_band_is_always_ready() {
        let mut rng = SimRng::new(1);
        let mut cooldown = Cooldown::new(0);
        cooldown.reset(&mut rng);
        assert!(cooldown.is_ready());
    }

    #[test]
    fn score_constants_are_ordered() {
        assert!(PURCHASE_SCORE > CABLE_SCORE_CAP);
        assert!(CABLE_SCORE_CAP > NODE_SCORE);
    }
}
