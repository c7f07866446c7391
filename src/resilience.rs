//! Request resilience module
//!
//! This module holds the control-flow shared by the gateway and the client facade:
//! - Bounded retries with linear backoff
//! - Per-attempt upstream timeout
//! - Client-side cooldown gate between chat submissions

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Attempts per call, on both the gateway and the client side
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// Backoff unit used by the gateway when retrying the upstream provider
pub const SERVER_BACKOFF_UNIT: Duration = Duration::from_millis(250);

/// Backoff unit used by the client facade when retrying the gateway
pub const CLIENT_BACKOFF_UNIT: Duration = Duration::from_millis(300);

/// Hard limit for a single upstream attempt
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum gap between two accepted chat submissions
pub const COOLDOWN_WINDOW: Duration = Duration::from_secs(2);

/// Callback invoked with the 1-based number of a failed attempt, right before
/// the backoff sleep that precedes the next one
pub type RetryObserver<'a> = &'a (dyn Fn(u32) + Send + Sync);

/// Marker error for an attempt that lost the race against its timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("UPSTREAM_TIMEOUT after {}ms", .0.as_millis())]
pub struct TimedOut(pub Duration);

/// Race `fut` against a timer of `limit`.
///
/// The timer is dropped as soon as either side finishes. When the timer wins,
/// `fut` is dropped as well; whatever it was waiting on is abandoned.
pub async fn with_timeout<F: Future>(limit: Duration, fut: F) -> std::result::Result<F::Output, TimedOut> {
    tokio::time::timeout(limit, fut).await.map_err(|_| TimedOut(limit))
}

/// Why a single attempt failed
#[derive(Debug)]
pub enum AttemptFailure<E> {
    /// The attempt did not finish within the configured timeout
    TimedOut(TimedOut),
    /// The operation itself returned an error
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::TimedOut(t) => write!(f, "{}", t),
            AttemptFailure::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Returned once every attempt has failed
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of attempts actually made
    pub attempts: u32,
    /// Failure of the final attempt
    pub last: AttemptFailure<E>,
    /// Whether any attempt in the sequence hit the timeout
    pub timed_out: bool,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempt(s): {}", self.attempts, self.last)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Retry policy: fixed attempt budget, linear backoff, optional per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one is always made)
    pub attempts: u32,
    /// Delay multiplied by the failed attempt's index before the next attempt
    pub backoff_unit: Duration,
    /// Hard limit for each attempt, if any
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Policy the gateway applies to upstream provider calls
    pub fn server() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_unit: SERVER_BACKOFF_UNIT,
            timeout: Some(UPSTREAM_TIMEOUT),
        }
    }

    /// Policy the client facade applies to gateway calls
    pub fn client() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            backoff_unit: CLIENT_BACKOFF_UNIT,
            timeout: None,
        }
    }

    /// Replace the attempt budget
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Replace the backoff unit
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Wrap every attempt with a hard timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sleep that follows the failure of `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `observer` is called with the failed attempt's number before each backoff
    /// sleep. It is not called for the first attempt nor after the last one.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        observer: Option<RetryObserver<'_>>,
    ) -> std::result::Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut timed_out = false;
        let mut attempt = 1;

        loop {
            let outcome = match self.timeout {
                Some(limit) => match with_timeout(limit, op()).await {
                    Ok(result) => result.map_err(AttemptFailure::Failed),
                    Err(elapsed) => {
                        timed_out = true;
                        Err(AttemptFailure::TimedOut(elapsed))
                    }
                },
                None => op().await.map_err(AttemptFailure::Failed),
            };

            let failure = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            if attempt >= attempts {
                warn!("Attempt {}/{} failed, giving up: {}", attempt, attempts, failure);
                return Err(RetryError {
                    attempts: attempt,
                    last: failure,
                    timed_out,
                });
            }

            let delay = self.backoff_for(attempt);
            warn!(
                "Attempt {}/{} failed, retrying in {}ms: {}",
                attempt,
                attempts,
                delay.as_millis(),
                failure
            );
            if let Some(observer) = observer {
                observer(attempt);
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::client()
    }
}

/// Client-side spam gate: rejects a submission that arrives before the
/// previous accepted one's window has passed
#[derive(Debug, Clone)]
pub struct CooldownGate {
    window: Duration,
    until: Option<Instant>,
}

impl CooldownGate {
    /// Create a gate with the given window
    pub fn new(window: Duration) -> Self {
        Self { window, until: None }
    }

    /// Whether a submission at `now` would be suppressed
    pub fn is_cooling_at(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Time left before the gate opens again
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Accept a submission at `now` and re-arm the window, or refuse it
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        if self.is_cooling_at(now) {
            debug!("Cooldown active for another {}ms", self.remaining_at(now).as_millis());
            return false;
        }
        self.until = Some(now + self.window);
        true
    }

    /// [`CooldownGate::try_acquire_at`] with the current time
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// The configured window
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(COOLDOWN_WINDOW)
    }
}
