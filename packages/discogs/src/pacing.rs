//! Request pacing for the Discogs API.
//!
//! Discogs throttles authenticated clients, so every request made during a
//! collection fetch is spaced at least [`MIN_REQUEST_INTERVAL`] apart
//! (4 requests per second). The delay computation is a pure function of
//! elapsed time; the actual suspension goes through a [`Clock`] so tests can
//! run against a manual clock.

use std::time::{Duration, Instant};

/// Minimum spacing between two consecutive requests.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Returns how long to wait before issuing the next request.
///
/// `since_last` is the time elapsed since the previous request was issued,
/// or `None` if no request has been issued yet.
#[must_use]
pub fn pacing_delay(min_interval: Duration, since_last: Option<Duration>) -> Duration {
    since_last.map_or(Duration::ZERO, |elapsed| min_interval.saturating_sub(elapsed))
}

/// Source of time for pacing.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait::async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Spaces out a sequence of requests.
///
/// Call [`Pacer::wait`] immediately before issuing each request.
pub struct Pacer<'a> {
    clock: &'a dyn Clock,
    min_interval: Duration,
    last_issued: Option<Instant>,
}

impl<'a> Pacer<'a> {
    /// Creates a pacer that has not issued any request yet.
    #[must_use]
    pub fn new(clock: &'a dyn Clock, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_issued: None,
        }
    }

    /// Waits until the next request may be issued, then marks it issued.
    pub async fn wait(&mut self) {
        let now = self.clock.now();
        let since_last = self
            .last_issued
            .map(|last| now.saturating_duration_since(last));
        let delay = pacing_delay(self.min_interval, since_last);

        if !delay.is_zero() {
            log::trace!("Pacing Discogs request, sleeping {delay:?}");
            self.clock.sleep(delay).await;
        }

        self.last_issued = Some(self.clock.now());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::Clock;

    /// Clock that only moves when slept on or advanced explicitly.
    pub struct ManualClock {
        origin: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }

        pub fn elapsed(&self) -> Duration {
            *self.offset.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }
}
