//! # Incoming Packet Queue
//!
//! FIFO handoff between the radio's notification-delivery context (producer)
//! and the session's caller thread (consumer). The producer never blocks on
//! this layer; the consumer gets a non-blocking pop for flushing and a
//! bounded-blocking pop for receives.
//!
//! One queue exists per channel, created with the session and dropped with
//! it — a disconnected pop is the teardown signal, kept distinct from a
//! timeout.

use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::trace;

use crate::channel::Channel;

/// Create the producer/consumer pair for one channel's queue.
pub fn packet_queue(channel: Channel) -> (PacketSink, PacketQueue) {
    let (tx, rx) = unbounded();
    (PacketSink { tx, channel }, PacketQueue { rx, channel })
}

// ─── Producer Side ──────────────────────────────────────────────────────────

/// Producer handle, driven by the radio notification callback.
///
/// Clone freely; all clones feed the same queue. Dropping every clone
/// disconnects the consumer, which is how session teardown interrupts a
/// blocked receive.
#[derive(Clone)]
pub struct PacketSink {
    tx: Sender<Bytes>,
    channel: Channel,
}

impl PacketSink {
    /// Enqueue a packet delivered by the radio. Never blocks.
    ///
    /// A packet arriving after the session consumer is gone is dropped;
    /// nothing on the notification context can act on the loss.
    pub fn push(&self, packet: Bytes) {
        let len = packet.len();
        if self.tx.send(packet).is_err() {
            trace!(channel = %self.channel, len, "notification after session teardown, dropped");
        }
    }

    /// Channel this sink feeds.
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

// ─── Consumer Side ──────────────────────────────────────────────────────────

/// Consumer handle, owned by the channel's [`PacketTransport`].
///
/// [`PacketTransport`]: crate::transport::PacketTransport
pub struct PacketQueue {
    rx: Receiver<Bytes>,
    channel: Channel,
}

impl PacketQueue {
    /// Remove and return the head packet if one is already queued.
    pub fn try_pop(&self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Remove and return the head packet, waiting up to `timeout` for one to
    /// arrive.
    ///
    /// `Timeout` means no packet arrived; `Disconnected` means every
    /// [`PacketSink`] is gone (session teardown).
    pub fn pop(&self, timeout: Duration) -> Result<Bytes, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Channel this queue serves.
    pub fn channel(&self) -> Channel {
        self.channel
    }
}
