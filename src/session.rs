//! Per-user generation state.
//!
//! A [`Session`] is the only thing that lives between two generations: the
//! angle used last time, the random source for the next draw, and the last
//! successful result. It is passed explicitly as `&mut Session`; there is no
//! process-wide state, so a server can keep one per visitor.

use crate::output::GenerationOutput;
use crate::variation::{VariationAngle, VariationTracker};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug)]
pub struct Session {
    tracker: VariationTracker,
    rng: StdRng,
    last_output: Option<GenerationOutput>,
}

impl Session {
    /// A fresh session seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A session with a fixed seed, for reproducible angle draws.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tracker: VariationTracker::Unset,
            rng,
            last_output: None,
        }
    }

    pub fn tracker(&self) -> &VariationTracker {
        &self.tracker
    }

    /// Angle of the last successful generation, if any.
    pub fn last_angle(&self) -> Option<VariationAngle> {
        self.tracker.last()
    }

    pub fn last_output(&self) -> Option<&GenerationOutput> {
        self.last_output.as_ref()
    }

    pub(crate) fn tracker_and_rng(&mut self) -> (&VariationTracker, &mut StdRng) {
        (&self.tracker, &mut self.rng)
    }

    /// Store a successful result; the tracker only moves when an angle was used.
    pub(crate) fn record_success(&mut self, output: &GenerationOutput) {
        if let Some(angle) = output.angle {
            self.tracker.record(angle);
        }
        self.last_output = Some(output.clone());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
