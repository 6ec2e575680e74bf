//! Cancellation boundary for a single run.
//!
//! A [`RunContext`] carries an optional deadline plus cancel flags. Deriving a
//! context with [`RunContext::with_timeout`] keeps the parent's flags, so
//! cancelling a parent reaches every derived context but not the other way
//! around.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Why a run was stopped from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    DeadlineExceeded,
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::DeadlineExceeded => f.write_str("deadline exceeded"),
            Termination::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Option<Instant>,
    flags: Vec<Arc<AtomicBool>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RunContext {
    /// A context that is never done unless cancelled explicitly.
    pub fn background() -> Self {
        Self {
            deadline: None,
            flags: vec![Arc::new(AtomicBool::new(false))],
        }
    }

    /// Derive a context that expires after `timeout` (or earlier, if the
    /// parent's deadline comes first).
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        let mut flags = self.flags.clone();
        flags.push(Arc::new(AtomicBool::new(false)));
        Self {
            deadline: Some(deadline),
            flags,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and everything derived from it.
    pub fn cancel(&self) {
        self.own_flag().store(true, Ordering::SeqCst);
    }

    /// The flag backing [`RunContext::cancel`]; setting it from any thread
    /// (or a signal handler) cancels the context.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(self.own_flag())
    }

    /// `Some` once the context is cancelled or past its deadline.
    pub fn done(&self) -> Option<Termination> {
        if self.flags.iter().any(|flag| flag.load(Ordering::SeqCst)) {
            return Some(Termination::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Termination::DeadlineExceeded),
            _ => None,
        }
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn own_flag(&self) -> &Arc<AtomicBool> {
        // `flags` always holds at least the context's own flag, last.
        &self.flags[self.flags.len() - 1]
    }
}
