//! # Per-Frame Work Counter
//!
//! Replaces the source's callback-based task completion (§9): an atomic
//! counter is set to the number of tasks a frame will submit
//! (`N` remap + `N` blend + `Σ copy_areas`, §4.G step 3), and each task
//! decrements it on completion. The last decrementer wakes the orchestrator
//! thread waiting on `stitch_buffers`. The first task to report a failure
//! wins: later failures are recorded but do not overwrite it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use crate::error::StitchError;

/// Tracks outstanding tasks for one `stitch_buffers` call and the first
/// error (if any) reported by a task.
pub struct WorkCounter {
    remaining: AtomicUsize,
    failure: Mutex<Option<StitchError>>,
    done: Condvar,
    done_lock: Mutex<bool>,
}

impl WorkCounter {
    /// Creates a counter armed for `total` tasks.
    pub fn new(total: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(total),
            failure: Mutex::new(None),
            done: Condvar::new(),
            done_lock: Mutex::new(total == 0),
        }
    }

    /// Records a successful task completion.
    pub fn complete_one(&self) {
        self.decrement();
    }

    /// Records a failed task completion; only the first failure is kept.
    pub fn fail_one(&self, error: StitchError) {
        let mut failure = self.failure.lock().unwrap();
        if failure.is_none() {
            *failure = Some(error);
        }
        drop(failure);
        self.decrement();
    }

    fn decrement(&self) {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            let mut done = self.done_lock.lock().unwrap();
            *done = true;
            self.done.notify_all();
        }
    }

    /// Blocks until every armed task has completed, then returns the first
    /// recorded failure (if any). A frame with zero submitted tasks (e.g.
    /// `N=0`, unreachable in practice but defensive) returns immediately.
    pub fn wait(&self) -> Result<(), StitchError> {
        let mut done = self.done_lock.lock().unwrap();
        while !*done {
            done = self.done.wait(done).unwrap();
        }
        drop(done);
        self.failure.lock().unwrap().take().map_or(Ok(()), Err)
    }

    /// Tasks still outstanding; for diagnostics/testing only.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}
