//! # Notes Harness Testing
//!
//! Test doubles and helpers shared by the harness crates.
//!
//! This crate provides:
//! - Mock implementations of the core seams ([`FixedClock`], [`InMemoryQueue`])
//! - Generators for long note texts
//! - One-call tracing setup for test binaries
//!
//! ## Example
//!
//! ```
//! use notes_harness_core::clock::Clock;
//! use notes_harness_testing::{InMemoryQueue, test_clock};
//!
//! let queue = InMemoryQueue::new();
//! queue.push("notes", br#"{"text":"hi"}"#.to_vec());
//! assert_eq!(queue.len("notes"), 1);
//!
//! let clock = test_clock();
//! assert_eq!(clock.now(), clock.now());
//! ```

use chrono::{DateTime, Utc};
use notes_harness_core::clock::Clock;

pub mod text;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use notes_harness_core::queue::{MessageQueue, QueueError};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use notes_harness_testing::mocks::FixedClock;
    /// use notes_harness_core::clock::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Fixed clock at `seconds` since the Unix epoch
        #[must_use]
        pub fn at_epoch_seconds(seconds: i64) -> Self {
            Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at_epoch_seconds(1_735_689_600)
    }

    /// In-memory stand-in for the broker.
    ///
    /// Queues are created on first push. Fetching from a queue that was never
    /// pushed to (or declared) fails with [`QueueError::QueueNotFound`], like
    /// the broker does.
    #[derive(Debug, Default)]
    pub struct InMemoryQueue {
        queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
        failure: Mutex<Option<QueueError>>,
    }

    impl InMemoryQueue {
        /// Create an empty broker with no queues
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create `queue` without any messages.
        pub fn declare(&self, queue: &str) {
            lock(&self.queues).entry(queue.to_string()).or_default();
        }

        /// Append a message to `queue`.
        pub fn push(&self, queue: &str, payload: impl Into<Vec<u8>>) {
            lock(&self.queues)
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.into());
        }

        /// Number of messages waiting on `queue`
        #[must_use]
        pub fn len(&self, queue: &str) -> usize {
            lock(&self.queues).get(queue).map_or(0, VecDeque::len)
        }

        /// Whether `queue` has no waiting messages
        #[must_use]
        pub fn is_empty(&self, queue: &str) -> bool {
            self.len(queue) == 0
        }

        /// Make every following fetch fail with `error` (`None` to recover).
        pub fn fail_with(&self, error: Option<QueueError>) {
            *lock(&self.failure) = error;
        }
    }

    impl MessageQueue for InMemoryQueue {
        async fn fetch_one(&self, queue: &str) -> Result<Option<Vec<u8>>, QueueError> {
            if let Some(error) = lock(&self.failure).clone() {
                return Err(error);
            }
            lock(&self.queues)
                .get_mut(queue)
                .map(VecDeque::pop_front)
                .ok_or_else(|| QueueError::QueueNotFound(queue.to_string()))
        }
    }

    // A panicking test poisons the lock; the data is still usable.
    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Install a formatting subscriber for test output.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (for example the
/// configured `log_level`) is used. Output goes through the test writer so
/// it is captured per test. Calling this more than once is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryQueue, test_clock};
pub use text::{generate_long_string, generate_test_string};

#[cfg(test)]
mod tests {
    use super::*;
    use notes_harness_core::queue::{MessageQueue, QueueError};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn in_memory_queue_is_fifo_and_destructive() {
        let queue = InMemoryQueue::new();
        queue.push("notes", b"one".to_vec());
        queue.push("notes", b"two".to_vec());

        assert_eq!(queue.fetch_one("notes").await, Ok(Some(b"one".to_vec())));
        assert_eq!(queue.fetch_one("notes").await, Ok(Some(b"two".to_vec())));
        assert_eq!(queue.fetch_one("notes").await, Ok(None));
        assert!(queue.is_empty("notes"));
    }

    #[tokio::test]
    async fn unknown_queue_is_not_found() {
        let queue = InMemoryQueue::new();
        assert_eq!(
            queue.fetch_one("missing").await,
            Err(QueueError::QueueNotFound("missing".to_string()))
        );

        queue.declare("missing");
        assert_eq!(queue.fetch_one("missing").await, Ok(None));
    }

    #[tokio::test]
    async fn injected_failure_is_returned_until_cleared() {
        let queue = InMemoryQueue::new();
        queue.push("notes", b"kept".to_vec());
        queue.fail_with(Some(QueueError::ConnectionFailed("down".to_string())));

        assert!(queue.fetch_one("notes").await.is_err());
        assert_eq!(queue.len("notes"), 1);

        queue.fail_with(None);
        assert_eq!(queue.fetch_one("notes").await, Ok(Some(b"kept".to_vec())));
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing("debug");
        init_tracing("info");
    }
}
