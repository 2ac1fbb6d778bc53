use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::time::Instant;
use tracing::warn;

use crate::error::DexError;

/// Sliding window counter of placement failures.
///
/// Once `max_errors` failures were recorded within `window`, new orders are
/// refused until the oldest failure ages out. One limiter is owned per
/// connector and can be shared explicitly between connectors that should back
/// off together.
#[derive(Debug)]
pub struct ErrorRateLimiter {
    max_errors: usize,
    window: Duration,
    errors: Mutex<VecDeque<Instant>>,
}

impl Default for ErrorRateLimiter {
    fn default() -> Self { Self::new(10, Duration::from_secs(60)) }
}

impl ErrorRateLimiter {
    pub fn new(max_errors: usize, window: Duration) -> Self {
        Self { max_errors, window, errors: Mutex::new(VecDeque::with_capacity(max_errors + 1)) }
    }

    pub fn max_errors(&self) -> usize { self.max_errors }

    pub fn window(&self) -> Duration { self.window }

    /// Records a failure. Returns `false` when the limit is now reached.
    pub fn record_error(&self) -> bool {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        Self::expire(&mut errors, now, self.window);
        errors.push_back(now);
        if errors.len() >= self.max_errors {
            warn!(errors = errors.len(), window = ?self.window, "error rate limit reached");
            false
        } else {
            true
        }
    }

    /// Failures within the current window.
    pub fn errors(&self) -> usize {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        Self::expire(&mut errors, Instant::now(), self.window);
        errors.len()
    }

    /// Fails with [`DexError::ErrorRateExceeded`] while the limit is reached.
    pub fn check(&self) -> Result<(), DexError> {
        let errors = self.errors();
        if errors >= self.max_errors {
            return Err(DexError::ErrorRateExceeded { errors, window: self.window });
        }
        Ok(())
    }

    fn expire(errors: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while errors.front().is_some_and(|&at| now.duration_since(at) >= window) {
            errors.pop_front();
        }
    }
}
