//! Weighted-random load balancing strategy.

use rand::Rng;
use std::sync::Arc;

use crate::load_balancer::backend::{Backend, BackendSet};

/// Upper bound (exclusive) of the selection range.
const RANGE: f64 = 100.0;

/// Weighted selector.
/// Picks a backend by walking cumulative percentages against a random draw.
/// Holds no state, so one instance can be shared by every connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedSelector;

impl WeightedSelector {
    pub fn new() -> Self {
        Self
    }

    /// Draw `r` in `[0, 100)` from `rng` and select with it.
    pub fn select<'a, R: Rng>(&self, set: &'a BackendSet, rng: &mut R) -> &'a Arc<Backend> {
        let draw = rng.gen_range(0.0..RANGE);
        self.select_with_draw(set, draw)
    }

    /// Return the first backend whose cumulative weight reaches `draw`.
    ///
    /// Zero-weight backends never match. A draw beyond the cumulative total
    /// (possible after rounding) returns [`BackendSet::fallback`]: the last
    /// positive-weight backend, which is not the last backend in the set when
    /// trailing entries have weight 0.
    pub fn select_with_draw<'a>(&self, set: &'a BackendSet, draw: f64) -> &'a Arc<Backend> {
        let mut cumulative = 0.0;
        for backend in set.backends() {
            if backend.weight <= 0.0 {
                continue;
            }
            cumulative += backend.weight;
            if cumulative >= draw {
                return backend;
            }
        }
        set.fallback()
    }
}
