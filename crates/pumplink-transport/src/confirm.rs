//! # Confirmation Registry
//!
//! Correlates the one outstanding write per channel with the device
//! acknowledgement that eventually arrives on the radio's
//! confirmation-delivery context.
//!
//! This is deliberately a single slot per channel, not an event bus: the
//! protocol above never pipelines writes, so the only correlation problem to
//! solve is a *stale* acknowledgement from a previous exchange arriving late.
//! Two things defend against that:
//!
//! 1. callers discard leftovers with [`reset_pending`] between staging and
//!    transmitting a new write, and
//! 2. [`await_confirmation`] matches on an explicit [`WriteIdentity`] and
//!    throws away anything else it finds in the slot.
//!
//! [`reset_pending`]: ConfirmationRegistry::reset_pending
//! [`await_confirmation`]: ConfirmationRegistry::await_confirmation

use bytes::Bytes;
use quanta::Instant;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::channel::{Channel, DescriptorHandle};

// ─── Correlation Key ────────────────────────────────────────────────────────

/// Identity of an outstanding write, paired with its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteIdentity {
    /// A packet write, identified by its exact payload bytes.
    Payload(Bytes),
    /// A configuration write, identified by the descriptor it targeted.
    Descriptor(DescriptorHandle),
}

/// Device acknowledgement of a transmitted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Positive acknowledgement.
    Confirmed,
    /// Negative acknowledgement, with the device's reason.
    Rejected(String),
}

/// Why a confirmation wait did not end in a positive acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmError {
    /// The device acknowledged negatively.
    #[error("device rejected the write: {0}")]
    Rejected(String),
    /// No matching acknowledgement arrived within the deadline.
    #[error("no confirmation within {0:?}")]
    Timeout(Duration),
    /// The registry was closed (session teardown) while waiting.
    #[error("confirmation wait interrupted by session teardown")]
    Interrupted,
}

// ─── Registry ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct SlotState {
    /// The most recently delivered, not yet consumed acknowledgement.
    outcome: Option<(WriteIdentity, ConfirmOutcome)>,
    closed: bool,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    arrived: Condvar,
}

impl Slot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-slot-per-channel write/acknowledgement correlator.
///
/// Shared between the session's caller thread (waits, resets) and the radio
/// confirmation context (resolves). One registry serves both channels of a
/// session and dies with it.
#[derive(Default)]
pub struct ConfirmationRegistry {
    slots: [Slot; 2],
}

impl ConfirmationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, channel: Channel) -> &Slot {
        &self.slots[channel.index()]
    }

    /// Deliver a device acknowledgement. Called from the radio confirmation
    /// context; never blocks beyond the slot lock.
    pub fn resolve(&self, channel: Channel, identity: WriteIdentity, outcome: ConfirmOutcome) {
        let slot = self.slot(channel);
        let mut state = slot.lock();
        if state.closed {
            return;
        }
        if let Some((old, _)) = state.outcome.replace((identity, outcome)) {
            debug!(channel = %channel, ?old, "unconsumed confirmation overwritten");
        }
        slot.arrived.notify_all();
    }

    /// Discard any acknowledgement still sitting in the channel's slot.
    ///
    /// Callers run this between staging and transmitting a new write so a
    /// late acknowledgement of the previous write cannot be mistaken for the
    /// one about to be earned.
    pub fn reset_pending(&self, channel: Channel) {
        let mut state = self.slot(channel).lock();
        if let Some((stale, _)) = state.outcome.take() {
            debug!(channel = %channel, ?stale, "discarded stale confirmation");
        }
    }

    /// Block until the acknowledgement for exactly `identity` arrives on
    /// `channel`, bounded by `timeout`.
    ///
    /// Acknowledgements for any other identity found while waiting are
    /// discarded as stale. Returns [`ConfirmError::Interrupted`] if the
    /// registry is closed before the deadline.
    pub fn await_confirmation(
        &self,
        channel: Channel,
        identity: &WriteIdentity,
        timeout: Duration,
    ) -> Result<(), ConfirmError> {
        let deadline = Instant::now() + timeout;
        let slot = self.slot(channel);
        let mut state = slot.lock();

        loop {
            if state.closed {
                return Err(ConfirmError::Interrupted);
            }
            if let Some((got, outcome)) = state.outcome.take() {
                if &got == identity {
                    return match outcome {
                        ConfirmOutcome::Confirmed => Ok(()),
                        ConfirmOutcome::Rejected(reason) => Err(ConfirmError::Rejected(reason)),
                    };
                }
                // Stale leftover from an earlier exchange; keep waiting.
                debug!(channel = %channel, ?got, "ignored confirmation for a different write");
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ConfirmError::Timeout(timeout));
            }
            state = slot
                .arrived
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Close the registry: wake every waiter with
    /// [`ConfirmError::Interrupted`] and ignore all further resolutions.
    /// Called on session teardown.
    pub fn close(&self) {
        for slot in &self.slots {
            let mut state = slot.lock();
            state.closed = true;
            state.outcome = None;
            slot.arrived.notify_all();
        }
    }
}
