//! Refresh coalescing
//!
//! At most one refresh exchange is in flight at a time. Callers that need a
//! fresh token while an exchange is running queue a continuation here; when
//! the exchange settles every queued caller is released, in queue order,
//! with the same outcome.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use super::token::AccessToken;

/// Result of one refresh exchange: the new token, or `None` on terminal failure
pub type RefreshOutcome = Option<AccessToken>;

/// Receiving half handed to a queued caller
pub type Waiter = oneshot::Receiver<RefreshOutcome>;

/// Refresh-in-flight marker plus its queued continuations
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
pub struct GateState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

impl GateState {
    /// Whether a refresh exchange is currently running
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Mark a refresh as started
    pub fn begin(&mut self) {
        self.in_flight = true;
    }

    /// Queue a continuation for the running (or starting) exchange
    pub fn enqueue(&mut self) -> Waiter {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section. Never held across an await.
    pub fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh exchange is currently running
    pub fn in_flight(&self) -> bool {
        self.lock().in_flight()
    }

    /// Clear the marker and release every queued caller with `outcome`.
    ///
    /// Returns the number of callers released.
    pub fn settle(&self, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        let released = waiters.len();
        for waiter in waiters {
            // The caller may have stopped waiting
            let _ = waiter.send(outcome.clone());
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(value: &str) -> AccessToken {
        AccessToken {
            token: value.to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    #[test]
    fn test_settle_clears_in_flight_marker() {
        let gate = RefreshGate::new();
        assert!(!gate.in_flight());
        gate.lock().begin();
        assert!(gate.in_flight());

        gate.settle(None);
        assert!(!gate.in_flight());
    }

    #[tokio::test]
    async fn test_settle_releases_all_waiters_with_same_token() {
        let gate = RefreshGate::new();
        let (first, second) = {
            let mut state = gate.lock();
            state.begin();
            (state.enqueue(), state.enqueue())
        };

        assert_eq!(gate.settle(Some(token("fresh"))), 2);
        assert_eq!(first.await.unwrap().unwrap().token, "fresh");
        assert_eq!(second.await.unwrap().unwrap().token, "fresh");
    }

    #[tokio::test]
    async fn test_settle_failure_rejects_waiters() {
        let gate = RefreshGate::new();
        let waiter = {
            let mut state = gate.lock();
            state.begin();
            state.enqueue()
        };

        gate.settle(None);
        assert!(waiter.await.unwrap().is_none());
    }

    #[test]
    fn test_settle_tolerates_dropped_waiters() {
        let gate = RefreshGate::new();
        {
            let mut state = gate.lock();
            state.begin();
            drop(state.enqueue());
        }
        assert_eq!(gate.settle(Some(token("fresh"))), 1);
        assert!(!gate.in_flight());
    }

    #[test]
    fn test_settle_drains_queue() {
        let gate = RefreshGate::new();
        {
            let mut state = gate.lock();
            state.begin();
            let _ = state.enqueue();
        }
        gate.settle(None);
        assert_eq!(gate.settle(None), 0);
    }
}
