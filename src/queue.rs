//! Bounded circular job queue.
//!
//! The queue stores jobs in a fixed ring of slots addressed by head and tail
//! indices. It performs no locking and no occupancy tracking of its own: the
//! `space` and `item` counters reserve a slot before every call, and the
//! binary `mutex` counter serializes the calls themselves. The unsafe API
//! makes that contract explicit.
//!
//! # Safety
//!
//! [`JobQueue::deposit`] and [`JobQueue::fetch`] are sound only while the
//! caller holds the mutex permit and has performed the matching counter
//! decrement. Debug builds additionally assert that at most one thread is
//! ever inside a mutating call.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::job::Job;

struct Slots {
    head: usize,
    tail: usize,
    data: Box<[Option<Job>]>,
}

/// Fixed-capacity ring of job slots.
pub struct JobQueue {
    slots: UnsafeCell<Slots>,
    capacity: usize,
    /// Debug-build guard catching concurrent mutation.
    busy: AtomicBool,
}

// SAFETY: all mutation goes through the unsafe deposit/fetch API, whose
// contract requires the caller to hold the mutex permit, so at most one
// thread touches `slots` at a time.
unsafe impl Sync for JobQueue {}

impl JobQueue {
    /// Allocates `capacity` empty slots with `head = tail = 0`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-length ring cannot hold a job.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        Self {
            slots: UnsafeCell::new(Slots {
                head: 0,
                tail: 0,
                data: vec![None; capacity].into_boxed_slice(),
            }),
            capacity,
            busy: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next slot index after `index`, wrapping to 0 at capacity.
    const fn bump(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity { 0 } else { next }
    }

    /// Current tail index, used for job id assignment.
    ///
    /// # Safety
    ///
    /// Caller must hold the mutex permit; the tail may otherwise change
    /// between this read and the deposit it feeds.
    #[must_use]
    pub unsafe fn tail_index(&self) -> usize {
        // SAFETY: the mutex permit gives the caller exclusive access.
        unsafe { (*self.slots.get()).tail }
    }

    /// Writes `job` at the tail and advances it.
    ///
    /// # Safety
    ///
    /// Caller must hold the mutex permit and have decremented `space` for
    /// this deposit; the slot at the tail is unread otherwise.
    pub unsafe fn deposit(&self, job: Job) {
        let _writer = SingleWriter::enter(&self.busy);
        // SAFETY: the mutex permit gives the caller exclusive access.
        let slots = unsafe { &mut *self.slots.get() };
        debug_assert!(
            slots.data[slots.tail].is_none(),
            "deposit into an occupied slot"
        );
        slots.data[slots.tail] = Some(job);
        slots.tail = self.bump(slots.tail);
    }

    /// Takes the job at the head and advances it.
    ///
    /// # Safety
    ///
    /// Caller must hold the mutex permit and have decremented `item` for
    /// this fetch; the slot at the head is unfilled otherwise.
    #[must_use]
    pub unsafe fn fetch(&self) -> Job {
        let _writer = SingleWriter::enter(&self.busy);
        // SAFETY: the mutex permit gives the caller exclusive access.
        let slots = unsafe { &mut *self.slots.get() };
        let job = slots.data[slots.head].take();
        slots.head = self.bump(slots.head);
        debug_assert!(job.is_some(), "fetch from an unfilled slot");
        // SAFETY: the item counter guarantees a prior deposit filled this slot.
        unsafe { job.unwrap_unchecked() }
    }
}

/// RAII flag asserting single-writer access in debug builds.
struct SingleWriter<'a>(&'a AtomicBool);

impl<'a> SingleWriter<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        let was_busy = flag.swap(true, Ordering::Acquire);
        debug_assert!(!was_busy, "concurrent queue mutation: mutex discipline violated");
        Self(flag)
    }
}

impl Drop for SingleWriter<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
