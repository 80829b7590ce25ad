use crate::prelude::*;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a guarded call: either it ran, or it was dropped because
/// another device transaction was already in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Ran(T),
    Skipped,
}

impl<T> Outcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn ran(self) -> Option<T> {
        match self {
            Self::Ran(t) => Some(t),
            Self::Skipped => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ran(t) => Outcome::Ran(f(t)),
            Self::Skipped => Outcome::Skipped,
        }
    }
}

/// Single-flight gate shared by every device transaction of one hub.
///
/// Not a queue: whoever flips the flag first runs, everybody arriving while
/// it is set gets `Outcome::Skipped` straight away.
#[derive(Clone, Debug, Default)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

// clears the flag on every exit path, including the guarded future being
// dropped mid-flight
struct Release<'a>(&'a AtomicBool);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BusyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn run<F, T, E>(&self, name: &str, operation: F) -> std::result::Result<Outcome<T>, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("skip {} hub busy", name);
            return Ok(Outcome::Skipped);
        }
        let _release = Release(&self.busy);

        match operation.await {
            Ok(t) => Ok(Outcome::Ran(t)),
            Err(e) => {
                warn!("{} failed: {}", name, e);
                Err(e)
            }
        }
    }
}
