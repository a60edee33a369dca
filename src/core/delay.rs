//! Injectable delay sources.
//!
//! Every artificial pause in the kernel (the simulated computation behind a
//! future, a philosopher's think and eat phases) is drawn from a
//! [`DelaySource`]. Production runs use [`ReferenceDelays`]; tests swap in
//! [`ScaledDelays`], [`JitterDelays`] or [`NoDelay`] to control timing.

use crate::core::config::FutureConfig;
use std::sync::Mutex;
use std::time::Duration;

/// Source of artificial delays
pub trait DelaySource: Send + Sync {
    /// Pause before a future delivers its value
    fn compute_delay(&self) -> Duration;

    /// Length of a philosopher's think phase
    fn think_delay(&self, philosopher: usize) -> Duration;

    /// Length of a philosopher's eat phase
    fn eat_delay(&self, philosopher: usize) -> Duration;
}

fn draw_millis(rng: &Mutex<fastrand::Rng>, min: u64, max: u64) -> Duration {
    if min >= max {
        return Duration::from_millis(min);
    }
    let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Duration::from_millis(rng.u64(min..max))
}

/// Reference timings: compute delay drawn uniformly from the configured range,
/// think and eat phases grow with the philosopher's id.
#[derive(Debug)]
pub struct ReferenceDelays {
    min_ms: u64,
    max_ms: u64,
    rng: Mutex<fastrand::Rng>,
}

impl ReferenceDelays {
    pub const THINK_BASE_MS: u64 = 500;
    pub const THINK_STEP_MS: u64 = 100;
    pub const EAT_BASE_MS: u64 = 300;
    pub const EAT_STEP_MS: u64 = 50;

    /// Seeded from OS entropy, so every process sees a different schedule
    pub fn new(config: &FutureConfig) -> Self {
        Self {
            min_ms: config.min_delay_ms,
            max_ms: config.max_delay_ms,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(config: &FutureConfig, seed: u64) -> Self {
        Self {
            min_ms: config.min_delay_ms,
            max_ms: config.max_delay_ms,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for ReferenceDelays {
    fn default() -> Self {
        Self::new(&FutureConfig::default())
    }
}

impl DelaySource for ReferenceDelays {
    fn compute_delay(&self) -> Duration {
        draw_millis(&self.rng, self.min_ms, self.max_ms)
    }

    fn think_delay(&self, philosopher: usize) -> Duration {
        Duration::from_millis(Self::THINK_BASE_MS + Self::THINK_STEP_MS * philosopher as u64)
    }

    fn eat_delay(&self, philosopher: usize) -> Duration {
        Duration::from_millis(Self::EAT_BASE_MS + Self::EAT_STEP_MS * philosopher as u64)
    }
}

/// Divides every delay of an inner source, keeping its shape
pub struct ScaledDelays<D> {
    inner: D,
    divisor: u32,
}

impl<D: DelaySource> ScaledDelays<D> {
    pub fn new(inner: D, divisor: u32) -> Self {
        Self {
            inner,
            divisor: divisor.max(1),
        }
    }
}

impl<D: DelaySource> DelaySource for ScaledDelays<D> {
    fn compute_delay(&self) -> Duration {
        self.inner.compute_delay() / self.divisor
    }

    fn think_delay(&self, philosopher: usize) -> Duration {
        self.inner.think_delay(philosopher) / self.divisor
    }

    fn eat_delay(&self, philosopher: usize) -> Duration {
        self.inner.eat_delay(philosopher) / self.divisor
    }
}

/// Uniform random delays in `0..max_ms`, reproducible from a seed
#[derive(Debug)]
pub struct JitterDelays {
    max_ms: u64,
    rng: Mutex<fastrand::Rng>,
}

impl JitterDelays {
    pub fn with_seed(max: Duration, seed: u64) -> Self {
        Self {
            max_ms: max.as_millis() as u64,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl DelaySource for JitterDelays {
    fn compute_delay(&self) -> Duration {
        draw_millis(&self.rng, 0, self.max_ms)
    }

    fn think_delay(&self, _philosopher: usize) -> Duration {
        draw_millis(&self.rng, 0, self.max_ms)
    }

    fn eat_delay(&self, _philosopher: usize) -> Duration {
        draw_millis(&self.rng, 0, self.max_ms)
    }
}

/// Zero delays everywhere; maximises contention
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelaySource for NoDelay {
    fn compute_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn think_delay(&self, _philosopher: usize) -> Duration {
        Duration::ZERO
    }

    fn eat_delay(&self, _philosopher: usize) -> Duration {
        Duration::ZERO
    }
}
