//! Counting semaphore set with timed waits and scoped rollback.
//!
//! Models a SysV-style semaphore array: several counters allocated under one
//! handle, identified by a numeric key with process-wide visibility (two
//! concurrent creations with the same key collide). Waits block on a
//! condition variable rather than spinning.
//!
//! Every successful decrement is handed back as a [`SemPermit`] guard.
//! Dropping the permit, including during a panic unwind, signals the counter
//! back, so a worker that dies mid-critical-section cannot permanently
//! starve the others. Call [`SemPermit::forget`] when the decrement is meant
//! to stick, e.g. when a reserved `space` slot becomes a filled `item` slot.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Condvar, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Largest number of counters one set may hold (the SEMMSL default on Linux).
pub const MAX_COUNTERS_PER_SET: usize = 250;

/// Identifying key for a semaphore set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemKey(pub u32);

impl fmt::Display for SemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Errors creating or initializing a semaphore set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemError {
    /// A set already exists for this key.
    #[error("a semaphore set already exists for key {0}")]
    Exists(SemKey),
    /// The requested counter count is zero or above [`MAX_COUNTERS_PER_SET`].
    #[error("cannot allocate {requested} counters (limit {limit})")]
    Limit { requested: usize, limit: usize },
    /// Access to the set was denied. Mirrors the `EACCES` category surfaced
    /// at the process boundary; the in-process registry does not produce it.
    #[error("access to the semaphore set for key {0} was denied")]
    Access(SemKey),
    /// Counter index outside the set.
    #[error("counter index {index} out of range for a set of {count}")]
    InvalidIndex { index: usize, count: usize },
}

/// A timed wait gave up before the counter became positive.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("timed out waiting for the counter to become positive")]
pub struct TimedOut;

/// Process-wide registry of live semaphore keys.
fn registry() -> &'static Mutex<HashSet<SemKey>> {
    static REGISTRY: OnceLock<Mutex<HashSet<SemKey>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashSet::new()))
}

struct Counter {
    value: Mutex<u64>,
    available: Condvar,
}

/// A set of counters allocated under one key.
///
/// Dropping the set releases it and frees the key for reuse; only the owner
/// holds the handle, so only the owner can destroy it.
pub struct SemSet {
    key: SemKey,
    counters: Box<[Counter]>,
}

impl SemSet {
    /// Allocates `count` counters (all zero) under `key`.
    ///
    /// # Errors
    ///
    /// [`SemError::Exists`] if a live set already uses `key`;
    /// [`SemError::Limit`] if `count` is zero or above
    /// [`MAX_COUNTERS_PER_SET`].
    pub fn create(key: SemKey, count: usize) -> Result<Self, SemError> {
        if count == 0 || count > MAX_COUNTERS_PER_SET {
            return Err(SemError::Limit {
                requested: count,
                limit: MAX_COUNTERS_PER_SET,
            });
        }

        let mut keys = registry().lock().expect("semaphore registry poisoned");
        if !keys.insert(key) {
            return Err(SemError::Exists(key));
        }
        drop(keys);

        let counters = (0..count)
            .map(|_| Counter {
                value: Mutex::new(0),
                available: Condvar::new(),
            })
            .collect();

        Ok(Self { key, counters })
    }

    #[must_use]
    pub const fn key(&self) -> SemKey {
        self.key
    }

    /// Number of counters in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Initializes counter `index` to `value`.
    ///
    /// # Errors
    ///
    /// [`SemError::InvalidIndex`] if `index` is outside the set.
    pub fn set_value(&self, index: usize, value: u64) -> Result<(), SemError> {
        let counter = self.counters.get(index).ok_or(SemError::InvalidIndex {
            index,
            count: self.counters.len(),
        })?;
        *counter.value.lock().expect("semaphore counter poisoned") = value;
        if value > 0 {
            counter.available.notify_all();
        }
        Ok(())
    }

    /// Current value of counter `index`.
    ///
    /// Meaningful only as a snapshot; other threads may change the counter
    /// immediately after the read.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the set.
    #[must_use]
    pub fn value(&self, index: usize) -> u64 {
        *self.counters[index]
            .value
            .lock()
            .expect("semaphore counter poisoned")
    }

    /// Blocks until counter `index` is positive, then decrements it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the set.
    pub fn wait(&self, index: usize) -> SemPermit<'_> {
        let counter = &self.counters[index];
        let mut value = counter.value.lock().expect("semaphore counter poisoned");
        while *value == 0 {
            value = counter
                .available
                .wait(value)
                .expect("semaphore counter poisoned");
        }
        *value -= 1;
        SemPermit {
            set: self,
            index,
            armed: true,
        }
    }

    /// Like [`SemSet::wait`], but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`TimedOut`] if the counter did not become positive within `timeout`;
    /// the counter is left undecremented.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the set.
    pub fn timed_wait(&self, index: usize, timeout: Duration) -> Result<SemPermit<'_>, TimedOut> {
        let counter = &self.counters[index];
        let deadline = Instant::now() + timeout;

        let mut value = counter.value.lock().expect("semaphore counter poisoned");
        while *value == 0 {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(TimedOut);
            };
            let (guard, result) = counter
                .available
                .wait_timeout(value, remaining)
                .expect("semaphore counter poisoned");
            value = guard;
            if result.timed_out() && *value == 0 {
                return Err(TimedOut);
            }
        }
        *value -= 1;
        Ok(SemPermit {
            set: self,
            index,
            armed: true,
        })
    }

    /// Increments counter `index` and wakes one waiter. Never blocks.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the set.
    pub fn signal(&self, index: usize) {
        let counter = &self.counters[index];
        let mut value = counter.value.lock().expect("semaphore counter poisoned");
        *value += 1;
        counter.available.notify_one();
    }
}

impl Drop for SemSet {
    fn drop(&mut self) {
        let mut keys = registry()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        keys.remove(&self.key);
    }
}

impl fmt::Debug for SemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemSet")
            .field("key", &self.key)
            .field("counters", &self.counters.len())
            .finish()
    }
}

/// Proof of one successful counter decrement.
///
/// Dropping the permit signals the counter back — the decrement is undone on
/// every exit path, including panics. [`SemPermit::forget`] makes the
/// decrement permanent instead.
#[must_use = "dropping the permit immediately restores the counter"]
pub struct SemPermit<'a> {
    set: &'a SemSet,
    index: usize,
    armed: bool,
}

impl SemPermit<'_> {
    /// Index of the counter this permit decremented.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Makes the decrement permanent; the counter is not signaled back.
    pub fn forget(mut self) {
        self.armed = false;
    }

    /// Signals the counter back explicitly. Equivalent to dropping the
    /// permit; exists to make release points visible at call sites.
    pub fn release(self) {}
}

impl Drop for SemPermit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.set.signal(self.index);
        }
    }
}

impl fmt::Debug for SemPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemPermit")
            .field("key", &self.set.key)
            .field("index", &self.index)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::thread;

    // Each test uses its own key: the registry is process-wide and the test
    // harness runs tests in parallel.

    #[test]
    fn create_rejects_duplicate_key() {
        let key = SemKey(0x9001);
        let first = SemSet::create(key, 3).unwrap();
        assert_eq!(SemSet::create(key, 3).unwrap_err(), SemError::Exists(key));

        // The key is reusable once the owner drops the set.
        drop(first);
        assert!(SemSet::create(key, 3).is_ok());
    }

    #[test]
    fn create_rejects_zero_and_oversized_counts() {
        let key = SemKey(0x9002);
        assert!(matches!(
            SemSet::create(key, 0),
            Err(SemError::Limit { requested: 0, .. })
        ));
        assert!(matches!(
            SemSet::create(key, MAX_COUNTERS_PER_SET + 1),
            Err(SemError::Limit { .. })
        ));
    }

    #[test]
    fn set_value_rejects_bad_index() {
        let set = SemSet::create(SemKey(0x9003), 2).unwrap();
        assert_eq!(
            set.set_value(2, 1).unwrap_err(),
            SemError::InvalidIndex { index: 2, count: 2 }
        );
        set.set_value(1, 5).unwrap();
        assert_eq!(set.value(1), 5);
    }

    #[test]
    fn wait_decrements_and_signal_increments() {
        let set = SemSet::create(SemKey(0x9004), 1).unwrap();
        set.set_value(0, 2).unwrap();

        let permit = set.wait(0);
        assert_eq!(set.value(0), 1);
        permit.forget();
        assert_eq!(set.value(0), 1);

        set.signal(0);
        assert_eq!(set.value(0), 2);
    }

    #[test]
    fn wait_blocks_until_signaled() {
        let set = Arc::new(SemSet::create(SemKey(0x9005), 1).unwrap());

        let waiter = {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let permit = set.wait(0);
                permit.forget();
            })
        };

        // Give the waiter time to block, then release it.
        thread::sleep(Duration::from_millis(50));
        set.signal(0);
        waiter.join().unwrap();
        assert_eq!(set.value(0), 0);
    }

    #[test]
    fn timed_wait_expires_without_decrementing() {
        let set = SemSet::create(SemKey(0x9006), 1).unwrap();
        let timeout = Duration::from_millis(100);

        let start = Instant::now();
        assert_eq!(set.timed_wait(0, timeout).unwrap_err(), TimedOut);
        let elapsed = start.elapsed();

        assert!(elapsed >= timeout, "returned before the deadline");
        assert!(
            elapsed < timeout + Duration::from_millis(500),
            "returned long after the deadline: {elapsed:?}"
        );

        // Nothing was decremented: a single signal is enough to succeed.
        set.signal(0);
        set.timed_wait(0, timeout).unwrap().forget();
        assert_eq!(set.value(0), 0);
    }

    #[test]
    fn timed_wait_succeeds_when_signaled_in_time() {
        let set = Arc::new(SemSet::create(SemKey(0x9007), 1).unwrap());

        let signaler = {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                set.signal(0);
            })
        };

        set.timed_wait(0, Duration::from_secs(5)).unwrap().forget();
        signaler.join().unwrap();
        assert_eq!(set.value(0), 0);
    }

    #[test]
    fn dropped_permit_restores_the_counter() {
        let set = SemSet::create(SemKey(0x9008), 1).unwrap();
        set.set_value(0, 1).unwrap();

        {
            let _permit = set.wait(0);
            assert_eq!(set.value(0), 0);
        }
        assert_eq!(set.value(0), 1);
    }

    #[test]
    fn panic_unwind_restores_the_counter() {
        let set = SemSet::create(SemKey(0x9009), 1).unwrap();
        set.set_value(0, 1).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _permit = set.wait(0);
            panic!("worker died mid-critical-section");
        }));

        assert!(result.is_err());
        assert_eq!(set.value(0), 1, "unwind must roll the decrement back");
    }

    #[test]
    fn explicit_release_restores_the_counter() {
        let set = SemSet::create(SemKey(0x900a), 1).unwrap();
        set.set_value(0, 1).unwrap();

        let permit = set.wait(0);
        assert_eq!(set.value(0), 0);
        permit.release();
        assert_eq!(set.value(0), 1);
    }

    #[test]
    fn full_buffer_space_wait_times_out() {
        // With capacity C, after C reservations a further timed wait on
        // `space` must expire.
        let capacity = 2;
        let set = SemSet::create(SemKey(0x900b), 1).unwrap();
        set.set_value(0, capacity).unwrap();

        for _ in 0..capacity {
            set.timed_wait(0, Duration::from_millis(50)).unwrap().forget();
        }
        assert_eq!(
            set.timed_wait(0, Duration::from_millis(50)).unwrap_err(),
            TimedOut
        );
    }
}
