//! Bounded blocking MPMC FIFO queue.
//!
//! # Design
//!
//! One mutex guards a `VecDeque`; two condition variables carry the two
//! wait reasons. A single shared condition is insufficient: when producers
//! and consumers wait simultaneously, a wakeup meant for one side must not
//! be aliased onto the other. Each successful `push` signals exactly one
//! `pop` waiter and vice versa.
//!
//! # Contract
//!
//! - `push` blocks while the queue holds `bound` elements.
//! - `pop` blocks while the queue is empty.
//! - FIFO per producer; the global order is the order in which pushes
//!   returned. Every value is popped by exactly one caller.
//! - The queue has no error or closed state. Shutdown is carried in-band
//!   by the element type (callers use `Option<T>` sentinels). Mutex
//!   poisoning means a holder panicked, which is a programming bug and
//!   fatal.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Bounded blocking FIFO channel.
pub struct SyncQueue<T> {
    inner: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    bound: usize,
}

impl<T> SyncQueue<T> {
    /// Creates a queue holding at most `bound` elements.
    ///
    /// # Panics
    /// If `bound` is zero; a zero-capacity queue can never make progress.
    pub fn new(bound: usize) -> Self {
        assert!(bound >= 1, "queue bound must be at least 1");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(bound)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            bound,
        }
    }

    /// Capacity this queue was created with.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Enqueues `value`, blocking while the queue is full.
    pub fn push(&self, value: T) {
        let mut queue = self.inner.lock().expect("sync queue mutex poisoned");
        while queue.len() >= self.bound {
            queue = self
                .not_full
                .wait(queue)
                .expect("sync queue mutex poisoned");
        }

        assert!(queue.len() < self.bound);
        queue.push_back(value);
        drop(queue);

        self.not_empty.notify_one();
    }

    /// Dequeues the oldest value, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut queue = self.inner.lock().expect("sync queue mutex poisoned");
        while queue.is_empty() {
            queue = self
                .not_empty
                .wait(queue)
                .expect("sync queue mutex poisoned");
        }

        let value = queue.pop_front().expect("queue non-empty after wait");
        drop(queue);

        self.not_full.notify_one();
        value
    }

    /// Current length. Racy under concurrency; for diagnostics only.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("sync queue mutex poisoned").len()
    }

    /// Returns true when the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
