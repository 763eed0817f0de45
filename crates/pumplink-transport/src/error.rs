//! # Failure Taxonomy
//!
//! Three deliberately separate error surfaces, because the caller's recovery
//! differs for each:
//!
//! - [`ReceiveError`] — nothing to read yet, or the session died under the
//!   wait.
//! - [`SendError`] — the sending/confirming split is load-bearing:
//!   [`SendError::Sending`] means the radio never attempted the transmission
//!   (retry immediately if desired), [`SendError::Confirming`] means a real
//!   device round-trip happened with an unknown outcome (re-query device
//!   state before resending).
//! - [`SetupError`] — the notification-enable handshake failed; the session
//!   is unusable and must be reconnected. Kept as its own type so it can
//!   never be pattern-matched as a retryable packet fault.

use crossbeam_channel::RecvTimeoutError;
use std::time::Duration;
use thiserror::Error;

use crate::channel::{Channel, DescriptorHandle};
use crate::confirm::ConfirmError;

// ─── Receive ────────────────────────────────────────────────────────────────

/// A bounded receive ended without a packet.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// No packet arrived within the deadline.
    #[error("timed out after {timeout:?} waiting for a packet on the {channel} channel")]
    Timeout { channel: Channel, timeout: Duration },
    /// The wait was cut short by session teardown, not by the deadline.
    #[error("receive on the {channel} channel interrupted by session teardown")]
    Interrupted {
        channel: Channel,
        #[source]
        source: RecvTimeoutError,
    },
}

impl ReceiveError {
    pub fn channel(&self) -> Channel {
        match self {
            ReceiveError::Timeout { channel, .. } | ReceiveError::Interrupted { channel, .. } => {
                *channel
            }
        }
    }
}

// ─── Send ───────────────────────────────────────────────────────────────────

/// A send-and-confirm handshake failed.
#[derive(Debug, Error)]
pub enum SendError {
    /// The radio refused to stage or transmit; nothing reached the air.
    #[error("{message}")]
    Sending { channel: Channel, message: String },
    /// The transmission was attempted but the device's acknowledgement was
    /// missing or negative; the payload may or may not have been applied.
    #[error("{message}")]
    Confirming {
        channel: Channel,
        message: String,
        #[source]
        source: ConfirmError,
    },
}

impl SendError {
    pub fn channel(&self) -> Channel {
        match self {
            SendError::Sending { channel, .. } | SendError::Confirming { channel, .. } => *channel,
        }
    }

    /// Whether an immediate resend is safe: true only when the radio never
    /// attempted the transmission.
    pub fn retry_safe(&self) -> bool {
        matches!(self, SendError::Sending { .. })
    }
}

// ─── Connection Setup ───────────────────────────────────────────────────────

/// The one-time notification-enable handshake failed.
///
/// None of these are recoverable at the packet level; the caller must tear
/// down and reconnect the whole session.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The stack refused to route indications for the channel.
    #[error("radio refused to enable indication delivery on the {channel} channel")]
    IndicationsRefused { channel: Channel },
    /// The characteristic's GATT layout is not as expected.
    #[error(
        "expected exactly one configuration descriptor on the {channel} characteristic, found {found}"
    )]
    DescriptorLayout { channel: Channel, found: usize },
    /// The radio refused the configuration write outright.
    #[error("radio refused the indication configuration write to {descriptor} on the {channel} channel")]
    DescriptorWriteRefused {
        channel: Channel,
        descriptor: DescriptorHandle,
    },
    /// The configuration write went out but was never positively confirmed.
    #[error("indication configuration write on the {channel} channel was not confirmed")]
    Unconfirmed {
        channel: Channel,
        #[source]
        source: ConfirmError,
    },
}
