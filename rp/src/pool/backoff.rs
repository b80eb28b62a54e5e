//! Exponential backoff with jitter
//!
//! The stored backoff grows geometrically from the configured minimum and is
//! clamped to the configured maximum. The delay actually waited is the stored
//! value perturbed uniformly by up to `jitter` in either direction.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::config::PoolConfig;

/// Backoff policy plus the pool's single jitter source
///
/// The random source is seeded once when the pool is built and shared by all
/// retry waits; it is never reseeded.
pub(crate) struct Backoff {
    min: Duration,
    max: Option<Duration>,
    multiplier: f64,
    jitter: f64,
    rng: Mutex<StdRng>,
}

impl Backoff {
    /// Build from an already normalized config
    pub(crate) fn from_config(config: &PoolConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            min: config.min_backoff(),
            max: config.max_backoff(),
            multiplier: config.backoff_multiplier,
            jitter: config.backoff_jitter,
            rng: Mutex::new(rng),
        }
    }

    /// Backoff a fresh runner starts with
    pub(crate) fn initial(&self) -> Duration {
        self.min
    }

    /// Stored backoff to use after `current`: grown by the multiplier, then clamped
    pub(crate) fn grow(&self, current: Duration) -> Duration {
        let grown = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier).unwrap_or(Duration::MAX);
        match self.max {
            Some(max) if grown > max => max,
            _ => grown,
        }
    }

    /// Delay to actually wait for a stored backoff of `base`
    pub(crate) fn jittered(&self, base: Duration) -> Duration {
        let offset = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.random_range(-self.jitter..=self.jitter)
        };
        let delay = apply_jitter(base, offset);
        debug!(?base, ?delay, "Backoff::jittered: computed delay");
        delay
    }

    /// Shortest and longest delay [`Backoff::jittered`] can return for `base`
    #[cfg(test)]
    pub(crate) fn jitter_bounds(&self, base: Duration) -> (Duration, Duration) {
        (apply_jitter(base, -self.jitter), apply_jitter(base, self.jitter))
    }
}

/// `base * (1 + offset)`, saturating at the ends of the `Duration` range
fn apply_jitter(base: Duration, offset: f64) -> Duration {
    Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + offset)).unwrap_or(if offset < 0.0 {
        Duration::ZERO
    } else {
        Duration::MAX
    })
}
