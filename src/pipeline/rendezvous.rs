//! Rendezvous Barrier
//!
//! A reusable two-party synchronization point. An intercepted command task
//! and an external controller task each call [`RendezvousBarrier::arrive`];
//! whichever arrives second releases both. Coordination interceptors perform
//! two rendezvous cycles per pause: the first synchronizes with the
//! controller, the second waits for release.
//!
//! Breaking the barrier (explicitly, or because a party was cancelled while
//! its peer waited) fails current and future arrivals with
//! [`Error::CoordinationBroken`] instead of hanging them.

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct BarrierState {
    /// One party is parked waiting for its peer
    waiter_parked: bool,
    /// Completed rendezvous cycles; waiters watch this to detect release
    generation: u64,
    broken: bool,
}

/// Two-party, two-phase rendezvous primitive
#[derive(Debug, Default)]
pub struct RendezvousBarrier {
    state: Mutex<BarrierState>,
    notify: Notify,
}

impl RendezvousBarrier {
    /// Create a fresh, unbroken barrier
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrive at the barrier and wait for the peer party.
    ///
    /// Completes when both parties have arrived for the current cycle. The
    /// wait is unbounded: a controller that never performs its matching
    /// arrival leaves the peer parked until the barrier is broken.
    pub async fn arrive(&self) -> Result<()> {
        let parked_at = {
            let mut state = self.state.lock();
            if state.broken {
                return Err(Self::broken_error());
            }
            if state.waiter_parked {
                // Peer is parked: this arrival completes the cycle
                state.waiter_parked = false;
                state.generation = state.generation.wrapping_add(1);
                drop(state);
                self.notify.notify_waiters();
                trace!("rendezvous cycle completed");
                return Ok(());
            }
            state.waiter_parked = true;
            state.generation
        };

        trace!("parked at rendezvous, waiting for peer");
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            {
                let state = self.state.lock();
                if state.broken {
                    return Err(Self::broken_error());
                }
                if state.generation != parked_at {
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Break the barrier: every parked and future arrival fails with
    /// [`Error::CoordinationBroken`] until [`RendezvousBarrier::reset`].
    pub fn break_barrier(&self) {
        let mut state = self.state.lock();
        if !state.broken {
            state.broken = true;
            state.waiter_parked = false;
            drop(state);
            self.notify.notify_waiters();
            trace!("rendezvous barrier broken");
        }
    }

    /// Whether the barrier is currently broken
    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }

    /// True while one party is parked waiting for its peer
    pub fn has_parked_party(&self) -> bool {
        self.state.lock().waiter_parked
    }

    /// Restore a broken barrier for reuse
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.broken = false;
        state.waiter_parked = false;
        state.generation = state.generation.wrapping_add(1);
    }

    fn broken_error() -> Error {
        Error::CoordinationBroken("rendezvous barrier is broken".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn test_two_parties_rendezvous() {
        let barrier = Arc::new(RendezvousBarrier::new());
        let peer = Arc::clone(&barrier);
        let parked = tokio::spawn(async move { peer.arrive().await });

        // Give the first party time to park, then release it
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(barrier.has_parked_party());
        barrier.arrive().await.unwrap();

        parked.await.unwrap().unwrap();
        assert!(!barrier.has_parked_party());
    }

    #[tokio::test]
    async fn test_barrier_is_reusable_across_cycles() {
        let barrier = Arc::new(RendezvousBarrier::new());
        for _ in 0..3 {
            let peer = Arc::clone(&barrier);
            let parked = tokio::spawn(async move { peer.arrive().await });
            tokio::time::sleep(Duration::from_millis(10)).await;
            barrier.arrive().await.unwrap();
            parked.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_break_unblocks_parked_party() {
        let barrier = Arc::new(RendezvousBarrier::new());
        let peer = Arc::clone(&barrier);
        let parked = tokio::spawn(async move { peer.arrive().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        barrier.break_barrier();

        let result = tokio::time::timeout(Duration::from_secs(1), parked)
            .await
            .expect("parked party must unblock")
            .unwrap();
        assert_matches!(result, Err(Error::CoordinationBroken(_)));
    }

    #[tokio::test]
    async fn test_broken_barrier_fails_fast_until_reset() {
        let barrier = RendezvousBarrier::new();
        barrier.break_barrier();
        assert_matches!(barrier.arrive().await, Err(Error::CoordinationBroken(_)));
        assert!(barrier.is_broken());

        barrier.reset();
        assert!(!barrier.is_broken());
    }
}
