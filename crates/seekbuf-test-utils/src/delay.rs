//! Emulated transport latency.

use std::time::Duration;

use crate::rng::Xorshift64;

const MIB: f64 = 1024.0 * 1024.0;

/// A duration drawn uniformly from `[min, max]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delay {
    min: Duration,
    max: Duration,
}

impl Delay {
    pub const NONE: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn between(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[must_use]
    pub fn millis(min: u64, max: u64) -> Self {
        Self::between(Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub fn sample(&self, rng: &mut Xorshift64) -> Duration {
        let spread = (self.max - self.min).as_nanos() as u64;
        self.min + Duration::from_nanos(rng.range_u64(0, spread.saturating_add(1)))
    }
}

/// Per-call, per-MiB-loaded and per-MiB-skipped delays of a fake transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Latency {
    pub per_call: Delay,
    pub per_mib_load: Delay,
    pub per_mib_skip: Delay,
}

impl Latency {
    pub fn is_zero(&self) -> bool {
        self.per_call.is_zero() && self.per_mib_load.is_zero() && self.per_mib_skip.is_zero()
    }

    /// Time one call moving `loaded` bytes and skipping `skipped` bytes takes.
    pub fn cost(&self, rng: &mut Xorshift64, loaded: u64, skipped: u64) -> Duration {
        let mut total = self.per_call.sample(rng);
        if loaded > 0 {
            total += self.per_mib_load.sample(rng).mul_f64(loaded as f64 / MIB);
        }
        if skipped > 0 {
            total += self.per_mib_skip.sample(rng).mul_f64(skipped as f64 / MIB);
        }
        total
    }
}
