//! Inter-task wait time.
//!
//! After every task, whatever its outcome, a virtual user pauses for a delay
//! drawn uniformly from a closed interval. The wait does NOT count towards
//! probe latency.

use rand::Rng;
use std::time::Duration;

use crate::errors::ConfigError;

/// Upper limit for either bound: one day.
pub const MAX_WAIT_SECS: f64 = 86_400.0;

/// Uniform wait interval `[min_secs, max_secs]`.
///
/// # Examples
/// ```
/// use shop_loadtest::wait_time::WaitTime;
///
/// // Wait between 1 and 3 seconds after each task
/// let wait = WaitTime::between(1.0, 3.0).unwrap();
/// let delay = wait.sample_secs();
/// assert!((1.0..=3.0).contains(&delay));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitTime {
    min_secs: f64,
    max_secs: f64,
}

impl WaitTime {
    /// Build a wait interval.
    ///
    /// # Errors
    /// [`ConfigError::InvalidWaitInterval`] if a bound is negative, not
    /// finite or above [`MAX_WAIT_SECS`], or if `min_secs > max_secs`.
    pub fn between(min_secs: f64, max_secs: f64) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidWaitInterval {
            lo: min_secs,
            hi: max_secs,
            reason: reason.to_string(),
        };

        if !min_secs.is_finite() || !max_secs.is_finite() {
            return Err(invalid("bounds must be finite"));
        }
        if min_secs < 0.0 {
            return Err(invalid("lower bound must be >= 0"));
        }
        if max_secs > MAX_WAIT_SECS {
            return Err(invalid("upper bound exceeds one day (86400s)"));
        }
        if min_secs > max_secs {
            return Err(invalid("lower bound exceeds upper bound"));
        }

        Ok(Self { min_secs, max_secs })
    }

    /// A fixed wait (`min == max`).
    pub fn constant(secs: f64) -> Result<Self, ConfigError> {
        Self::between(secs, secs)
    }

    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }

    /// Sample a delay in seconds using the thread-local RNG.
    pub fn sample_secs(&self) -> f64 {
        self.sample_secs_with(&mut rand::thread_rng())
    }

    /// Sample a delay in seconds using the given RNG.
    pub fn sample_secs_with<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.min_secs == self.max_secs {
            return self.min_secs;
        }
        rng.gen_range(self.min_secs..=self.max_secs)
    }

    /// Sample a delay as a [`Duration`].
    pub fn sample(&self) -> Duration {
        let secs = self.sample_secs();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(MAX_WAIT_SECS as u64))
    }
}
