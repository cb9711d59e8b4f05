/*!
 * Token bucket throttling for outbound provider calls.
 *
 * A requests-per-minute budget becomes a steady refill of rpm/60 tokens per
 * second with a small burst allowance. Callers reserve a token atomically and
 * sleep until it is due; a cancelled wait hands its reservation back.
 */

use log::debug;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;

/// Lowest refill rate accepted, keeps wait times finite
const MIN_RATE: f64 = 1e-6;

#[derive(Debug)]
struct BucketState {
    /// Available tokens; negative while reservations are outstanding
    tokens: f64,
    last_refill: Instant,
}

/// Shared token bucket
#[derive(Debug)]
pub struct TokenBucket {
    /// Tokens added per second
    rate: f64,
    /// Maximum tokens held at once
    burst: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket for `requests_per_minute`, starting full
    ///
    /// Burst capacity is `max(rpm / 30, 10)`.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let burst = (rpm / 30).max(10);
        Self::new(f64::from(rpm) / 60.0, burst)
    }

    /// Create a bucket refilling `rate` tokens per second, holding at most `burst`
    pub fn new(rate: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            rate: rate.max(MIN_RATE),
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst as u32
    }

    /// Wait until a token is available, or until `cancel` fires
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), PipelineError> {
        let wait = self.reserve();
        if wait.is_zero() {
            return Ok(());
        }

        debug!("Rate limit reached, waiting {:?}", wait);
        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = cancel.cancelled() => {
                self.release();
                Err(PipelineError::Cancelled)
            }
        }
    }

    /// Take a token now if available without waiting
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Reserve one token and return how long until it is due
    fn reserve(&self) -> Duration {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens -= 1.0;
        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.rate)
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.tokens = (state.tokens + 1.0).min(self.burst);
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_refill = now;
    }
}
