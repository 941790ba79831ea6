//! The compile queue: pending jobs, per-path generations and the completed
//! list shared with worker threads.
//!
//! Pending jobs are dispatched most-recent-first. Every push bumps the
//! path's generation; a job is current only while its generation equals the
//! latest one for its path. Stale jobs are skipped at dispatch, and stale
//! completions are dropped when drained, so one result per path is applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A request to compile one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Source-file path, relative to the source root.
    pub path: String,
    /// Generation assigned when the job was pushed.
    pub generation: u32,
}

/// The outcome of a compile job, produced on a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    /// Source-file path of the job.
    pub path: String,
    /// Generation of the job.
    pub generation: u32,
    /// Whether compilation and the artifact write succeeded.
    pub success: bool,
    /// Files read while compiling, to be recorded as dependencies.
    pub dependencies: Vec<String>,
    /// Resource paths whose artifacts were written.
    pub outputs: Vec<String>,
}

/// Snapshot of batch progress for UI display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileProgress {
    /// Jobs in the current batch.
    pub total: u32,
    /// Jobs in the current batch not yet finished.
    pub remaining: u32,
    /// The most recently dispatched job, if any is still running.
    pub current: Option<String>,
}

impl CompileProgress {
    /// Returns `true` if no batch is active.
    pub fn is_idle(&self) -> bool {
        self.remaining == 0
    }
}

/// What [`CompileQueue::pop`] found at the top of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The job is current and should run.
    Run(CompileJob),
    /// A newer push exists for the path; the job was dropped.
    Superseded(CompileJob),
}

#[derive(Default)]
struct QueueState {
    generations: HashMap<String, u32>,
    pending: Vec<CompileJob>,
    current: Option<String>,
}

/// Handle through which workers hand finished jobs back.
#[derive(Clone)]
pub struct CompletionSink {
    completed: Arc<Mutex<Vec<CompletedJob>>>,
}

impl CompletionSink {
    /// Appends a finished job.
    pub fn complete(&self, job: CompletedJob) {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
    }
}

/// Pending, in-flight and completed compile jobs.
#[derive(Default)]
pub struct CompileQueue {
    state: Mutex<QueueState>,
    completed: Arc<Mutex<Vec<CompletedJob>>>,
    batch_total: AtomicU32,
    batch_remaining: AtomicU32,
    in_flight: AtomicUsize,
}

impl CompileQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a job for `path`, returning its new generation.
    ///
    /// The first push for a path gets generation 1.
    pub fn push(&self, path: &str) -> u32 {
        let mut state = self.lock_state();
        let generation = {
            let entry = state.generations.entry(path.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        state.pending.push(CompileJob {
            path: path.to_string(),
            generation,
        });
        self.batch_total.fetch_add(1, Ordering::SeqCst);
        self.batch_remaining.fetch_add(1, Ordering::SeqCst);
        generation
    }

    /// Pops the most recently pushed job.
    ///
    /// A superseded job counts as finished for progress purposes. A job
    /// returned as [`Dispatch::Run`] counts as in flight until its
    /// completion is drained.
    pub fn pop(&self) -> Option<Dispatch> {
        let mut state = self.lock_state();
        let job = state.pending.pop()?;
        if state.generations.get(&job.path) != Some(&job.generation) {
            drop(state);
            self.finish_one();
            return Some(Dispatch::Superseded(job));
        }
        state.current = Some(job.path.clone());
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(Dispatch::Run(job))
    }

    /// Invalidates every pending or running job for `path` without queueing
    /// a new one.
    ///
    /// Paths that were never pushed have nothing to invalidate and are left
    /// untouched.
    pub fn supersede(&self, path: &str) {
        if let Some(generation) = self.lock_state().generations.get_mut(path) {
            *generation += 1;
        }
    }

    /// Returns `true` if `generation` is the latest one pushed for `path`.
    pub fn is_current(&self, path: &str, generation: u32) -> bool {
        self.lock_state().generations.get(path) == Some(&generation)
    }

    /// Returns the latest generation pushed for `path`.
    pub fn generation(&self, path: &str) -> Option<u32> {
        self.lock_state().generations.get(path).copied()
    }

    /// Returns a handle workers use to report completions.
    pub fn sink(&self) -> CompletionSink {
        CompletionSink {
            completed: Arc::clone(&self.completed),
        }
    }

    /// Takes every completed job, in completion order.
    pub fn take_completed(&self) -> Vec<CompletedJob> {
        let done = std::mem::take(
            &mut *self
                .completed
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for _ in &done {
            let _ = self
                .in_flight
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
            self.finish_one();
        }
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            self.lock_state().current = None;
        }
        done
    }

    /// Returns the number of jobs waiting for dispatch.
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Returns the number of dispatched jobs whose completion has not been
    /// drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns `true` if nothing is pending, running or waiting to be drained.
    pub fn is_idle(&self) -> bool {
        self.pending_len() == 0 && self.in_flight() == 0
    }

    /// Returns the current batch progress.
    pub fn progress(&self) -> CompileProgress {
        CompileProgress {
            total: self.batch_total.load(Ordering::SeqCst),
            remaining: self.batch_remaining.load(Ordering::SeqCst),
            current: self.lock_state().current.clone(),
        }
    }

    fn finish_one(&self) {
        let previous = self
            .batch_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| {
                Some(r.saturating_sub(1))
            })
            .unwrap_or(0);
        if previous <= 1 {
            self.batch_total.store(0, Ordering::SeqCst);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
