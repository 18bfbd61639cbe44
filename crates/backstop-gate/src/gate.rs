//! Bounded-parallelism admission gate.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::error::GateError;
use crate::kind::GateKind;

/// Point-in-time view of one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateStatus {
    pub kind: GateKind,
    pub capacity: usize,
    pub in_flight: usize,
    pub waiting: usize,
    pub closed: bool,
}

/// Limits how many tasks of one workload class run at the same time.
///
/// A task submitted through [`ConcurrencyGate::run`] starts immediately while
/// fewer than `capacity` tasks are in flight; otherwise the caller waits in a
/// FIFO queue until a running task finishes. The task's output is returned
/// untouched, whether it is a success or an error.
///
/// `run` waits for a slot indefinitely. Callers that need a deadline either
/// wrap the call in their own timeout or use
/// [`ConcurrencyGate::run_with_wait_timeout`], which bounds only the wait.
#[derive(Debug)]
pub struct ConcurrencyGate {
    kind: GateKind,
    capacity: usize,
    // tokio's semaphore queues waiters fairly, which gives FIFO admission
    semaphore: Semaphore,
    in_flight: AtomicUsize,
    waiting: AtomicUsize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` concurrent tasks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or exceeds [`Semaphore::MAX_PERMITS`].
    pub fn new(kind: GateKind, capacity: usize) -> Self {
        assert!(capacity > 0, "gate {kind} needs a capacity of at least 1");
        Self {
            kind,
            capacity,
            semaphore: Semaphore::new(capacity),
            in_flight: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Create a gate with the built-in ceiling for `kind`.
    pub fn with_default_capacity(kind: GateKind) -> Self {
        Self::new(kind, kind.default_capacity())
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Callers queued for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Stop admitting tasks.
    ///
    /// Queued and future callers get [`GateError::Closed`]; tasks already
    /// running are unaffected.
    pub fn close(&self) {
        self.semaphore.close();
        tracing::info!(gate = %self.kind, in_flight = self.in_flight(), "gate closed");
    }

    pub fn status(&self) -> GateStatus {
        GateStatus {
            kind: self.kind,
            capacity: self.capacity,
            in_flight: self.in_flight(),
            waiting: self.waiting(),
            closed: self.is_closed(),
        }
    }

    /// Run `task` once a slot is free.
    ///
    /// The only error is [`GateError::Closed`]; the task's own result is
    /// returned as `Ok(output)`.
    pub async fn run<F, T>(&self, task: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let slot = self.admit().await?;
        let output = task.await;
        drop(slot);
        Ok(output)
    }

    /// Like [`ConcurrencyGate::run`], but give up if no slot frees up within
    /// `wait`.
    ///
    /// Once admitted the task runs to completion; the bound applies to
    /// queueing only. A caller that times out leaves the queue without
    /// affecting the order of the others.
    pub async fn run_with_wait_timeout<F, T>(&self, wait: Duration, task: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let slot = match tokio::time::timeout(wait, self.admit()).await {
            Ok(slot) => slot?,
            Err(_) => {
                tracing::debug!(gate = %self.kind, waited = ?wait, "gate admission timed out");
                return Err(GateError::WaitTimeout {
                    gate: self.kind,
                    waited: wait,
                });
            }
        };
        let output = task.await;
        drop(slot);
        Ok(output)
    }

    async fn admit(&self) -> Result<Slot<'_>, GateError> {
        let queued_at = Instant::now();
        let queued = Queued::enter(self);

        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| GateError::Closed(self.kind))?;
        drop(queued);

        let waited = queued_at.elapsed();
        crate::metrics::record_wait(self.kind.as_str(), waited);

        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        crate::metrics::set_in_flight(self.kind.as_str(), in_flight);
        tracing::trace!(gate = %self.kind, in_flight = in_flight, waited = ?waited, "task admitted");

        Ok(Slot {
            gate: self,
            _permit: permit,
        })
    }
}

/// Marks a caller as queued; leaving the queue (admitted, closed or timed
/// out) decrements the count.
struct Queued<'a> {
    gate: &'a ConcurrencyGate,
}

impl<'a> Queued<'a> {
    fn enter(gate: &'a ConcurrencyGate) -> Self {
        let waiting = gate.waiting.fetch_add(1, Ordering::AcqRel) + 1;
        crate::metrics::set_waiting(gate.kind.as_str(), waiting);
        Self { gate }
    }
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        let waiting = self.gate.waiting.fetch_sub(1, Ordering::AcqRel) - 1;
        crate::metrics::set_waiting(self.gate.kind.as_str(), waiting);
    }
}

/// A held slot. The in-flight count drops before the permit is released, so
/// the next admitted task never observes more than `capacity`.
struct Slot<'a> {
    gate: &'a ConcurrencyGate,
    _permit: SemaphorePermit<'a>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let in_flight = self.gate.in_flight.fetch_sub(1, Ordering::AcqRel) - 1;
        crate::metrics::set_in_flight(self.gate.kind.as_str(), in_flight);
    }
}
