//! # Packet Transport
//!
//! The synchronous, timeout-bounded face of one channel. Converts the radio's
//! callback-driven delivery into four operations the command protocol above
//! can call from its single worker thread:
//!
//! 1. **`receive`** — bounded wait for the next inbound packet
//! 2. **`send_and_confirm`** — stage → reset pending → transmit → await
//!    acknowledgement, short-circuiting on the first failure
//! 3. **`flush`** — pre-exchange drain of stale inbound packets
//! 4. **`enable_notifications`** — one-time indication arming handshake
//!
//! This layer never interprets packet bytes and never retries; the result
//! taxonomy in [`error`](crate::error) exists so the caller can make the
//! resend/reconnect/abort decision itself.

use bytes::Bytes;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::channel::{Channel, CharacteristicHandle};
use crate::confirm::{ConfirmationRegistry, WriteIdentity};
use crate::error::{ReceiveError, SendError, SetupError};
use crate::queue::PacketQueue;
use crate::radio::{RadioLink, ENABLE_INDICATIONS};

/// Deadline applied to every exchange unless overridden:
/// confirmation waits in [`PacketTransport::send_and_confirm`] and the
/// descriptor confirmation in [`PacketTransport::enable_notifications`].
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_millis(1000);

/// One channel's synchronous packet interface.
///
/// Bound to exactly one channel and characteristic for its whole lifetime.
/// All four operations are meant to be called from a single worker thread
/// per session; overlapping calls on the same channel are not supported and
/// must be serialized upstream.
pub struct PacketTransport<R: RadioLink> {
    channel: Channel,
    characteristic: CharacteristicHandle,
    radio: Arc<R>,
    queue: PacketQueue,
    confirmations: Arc<ConfirmationRegistry>,
    exchange_timeout: Duration,
}

impl<R: RadioLink> PacketTransport<R> {
    pub fn new(
        channel: Channel,
        characteristic: CharacteristicHandle,
        radio: Arc<R>,
        queue: PacketQueue,
        confirmations: Arc<ConfirmationRegistry>,
    ) -> Self {
        PacketTransport {
            channel,
            characteristic,
            radio,
            queue,
            confirmations,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    /// Override the confirmation deadline (tests, slow links).
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn characteristic(&self) -> CharacteristicHandle {
        self.characteristic
    }

    // ─── Receive ────────────────────────────────────────────────────────────

    /// Wait up to `timeout` for the next inbound packet on this channel.
    ///
    /// Removes zero or one packet from the queue; a single bounded wait with
    /// no retries. Teardown of the session while blocked is reported as
    /// [`ReceiveError::Interrupted`], distinct from a plain timeout.
    pub fn receive(&self, timeout: Duration) -> Result<Bytes, ReceiveError> {
        match self.queue.pop(timeout) {
            Ok(packet) => {
                trace!(channel = %self.channel, len = packet.len(), "received packet");
                Ok(packet)
            }
            Err(RecvTimeoutError::Timeout) => Err(ReceiveError::Timeout {
                channel: self.channel,
                timeout,
            }),
            Err(source @ RecvTimeoutError::Disconnected) => Err(ReceiveError::Interrupted {
                channel: self.channel,
                source,
            }),
        }
    }

    // ─── Send ───────────────────────────────────────────────────────────────

    /// Transmit `payload` and wait for the device's acknowledgement.
    ///
    /// Four sequential steps, each failure short-circuiting the rest:
    /// staging refusal and transmit refusal come back as
    /// [`SendError::Sending`] (nothing reached the air); a missing or
    /// negative acknowledgement comes back as [`SendError::Confirming`].
    pub fn send_and_confirm(&self, payload: Bytes) -> Result<(), SendError> {
        if !self.radio.stage_write(self.characteristic, &payload) {
            return Err(SendError::Sending {
                channel: self.channel,
                message: format!(
                    "radio refused to stage {} bytes on the {} channel",
                    payload.len(),
                    self.channel
                ),
            });
        }

        // Between staging and transmitting: a late acknowledgement of the
        // previous write must not be mistaken for the one this write earns.
        self.confirmations.reset_pending(self.channel);

        if !self.radio.transmit(self.characteristic) {
            return Err(SendError::Sending {
                channel: self.channel,
                message: format!(
                    "radio rejected the transmit request on the {} channel",
                    self.channel
                ),
            });
        }

        let identity = WriteIdentity::Payload(payload.clone());
        self.confirmations
            .await_confirmation(self.channel, &identity, self.exchange_timeout)
            .map_err(|source| SendError::Confirming {
                channel: self.channel,
                message: format!(
                    "write of {} bytes on the {} channel was not confirmed: {source}",
                    payload.len(),
                    self.channel
                ),
                source,
            })?;

        trace!(channel = %self.channel, len = payload.len(), "write confirmed");
        Ok(())
    }

    // ─── Flush ──────────────────────────────────────────────────────────────

    /// Drain stale inbound packets before starting a new exchange.
    ///
    /// Non-blocking; returns the number of packets drained. Between
    /// exchanges the queue should be empty, so every drained packet is
    /// reported as a channel-state anomaly rather than silently discarded —
    /// it is evidence of a protocol-timing slip, not of data loss.
    pub fn flush(&self) -> usize {
        let mut drained = 0;
        while let Some(packet) = self.queue.try_pop() {
            drained += 1;
            warn!(
                channel = %self.channel,
                len = packet.len(),
                "flushed stale packet before exchange; channel state out of step"
            );
        }
        drained
    }

    // ─── Notification Enable ────────────────────────────────────────────────

    /// Arm indication delivery for this channel's characteristic.
    ///
    /// Run once per session, before any [`receive`](Self::receive) can be
    /// expected to yield data. Every failure here is a [`SetupError`]: no
    /// packet-level retry makes sense, the caller must reconnect the whole
    /// session.
    pub fn enable_notifications(&self) -> Result<(), SetupError> {
        if !self.radio.enable_notification_delivery(self.characteristic) {
            return Err(SetupError::IndicationsRefused {
                channel: self.channel,
            });
        }

        let descriptors = self.radio.list_descriptors(self.characteristic);
        let descriptor = match descriptors[..] {
            [descriptor] => descriptor,
            _ => {
                return Err(SetupError::DescriptorLayout {
                    channel: self.channel,
                    found: descriptors.len(),
                })
            }
        };

        self.confirmations.reset_pending(self.channel);

        if !self.radio.write_descriptor(descriptor, &ENABLE_INDICATIONS) {
            return Err(SetupError::DescriptorWriteRefused {
                channel: self.channel,
                descriptor,
            });
        }

        self.confirmations
            .await_confirmation(
                self.channel,
                &WriteIdentity::Descriptor(descriptor),
                self.exchange_timeout,
            )
            .map_err(|source| SetupError::Unconfirmed {
                channel: self.channel,
                source,
            })?;

        debug!(channel = %self.channel, descriptor = %descriptor, "indications armed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DescriptorHandle;
    use crate::confirm::ConfirmOutcome;
    use crate::queue::{packet_queue, PacketSink};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;

    /// Records radio calls and answers with configurable refusals.
    #[derive(Default)]
    struct ScriptedRadio {
        refuse_stage: AtomicBool,
        refuse_transmit: AtomicBool,
        refuse_enable: AtomicBool,
        refuse_descriptor_write: AtomicBool,
        descriptors: Mutex<Vec<DescriptorHandle>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRadio {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RadioLink for ScriptedRadio {
        fn stage_write(&self, characteristic: CharacteristicHandle, bytes: &[u8]) -> bool {
            self.record(format!("stage {} {:02x?}", characteristic, bytes));
            !self.refuse_stage.load(Ordering::Relaxed)
        }

        fn transmit(&self, characteristic: CharacteristicHandle) -> bool {
            self.record(format!("transmit {}", characteristic));
            !self.refuse_transmit.load(Ordering::Relaxed)
        }

        fn enable_notification_delivery(&self, characteristic: CharacteristicHandle) -> bool {
            self.record(format!("enable {}", characteristic));
            !self.refuse_enable.load(Ordering::Relaxed)
        }

        fn write_descriptor(&self, descriptor: DescriptorHandle, value: &[u8]) -> bool {
            self.record(format!("write_descriptor {} {:02x?}", descriptor, value));
            !self.refuse_descriptor_write.load(Ordering::Relaxed)
        }

        fn list_descriptors(&self, characteristic: CharacteristicHandle) -> Vec<DescriptorHandle> {
            self.record(format!("list_descriptors {}", characteristic));
            self.descriptors.lock().unwrap().clone()
        }
    }

    const CHR: CharacteristicHandle = CharacteristicHandle(0x0021);

    fn transport(
        radio: Arc<ScriptedRadio>,
    ) -> (PacketTransport<ScriptedRadio>, PacketSink, Arc<ConfirmationRegistry>) {
        let (sink, queue) = packet_queue(Channel::Command);
        let confirmations = Arc::new(ConfirmationRegistry::new());
        let transport = PacketTransport::new(
            Channel::Command,
            CHR,
            radio,
            queue,
            confirmations.clone(),
        )
        .with_exchange_timeout(Duration::from_millis(80));
        (transport, sink, confirmations)
    }

    #[test]
    fn stage_refusal_short_circuits_before_transmit() {
        let radio = Arc::new(ScriptedRadio::default());
        radio.refuse_stage.store(true, Ordering::Relaxed);
        let (transport, _sink, _confirmations) = transport(radio.clone());

        let err = transport
            .send_and_confirm(Bytes::from_static(&[0x01]))
            .unwrap_err();
        assert!(err.retry_safe());
        let calls = radio.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("stage"));
    }

    #[test]
    fn transmit_refusal_skips_confirmation_wait() {
        let radio = Arc::new(ScriptedRadio::default());
        radio.refuse_transmit.store(true, Ordering::Relaxed);
        let (transport, _sink, _confirmations) = transport(radio.clone());

        let start = quanta::Instant::now();
        let err = transport
            .send_and_confirm(Bytes::from_static(&[0x01]))
            .unwrap_err();
        assert!(err.retry_safe());
        // No confirmation wait happened: the call returned well inside the
        // 80ms exchange timeout.
        assert!(start.elapsed() < Duration::from_millis(80));
    }

    #[test]
    fn send_succeeds_only_after_the_confirmation_event() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, _sink, confirmations) = transport(radio.clone());
        let payload = Bytes::from_static(&[0xDE, 0xAD]);

        let resolver = confirmations.clone();
        let confirm_payload = payload.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            resolver.resolve(
                Channel::Command,
                WriteIdentity::Payload(confirm_payload),
                ConfirmOutcome::Confirmed,
            );
        });

        let start = quanta::Instant::now();
        transport.send_and_confirm(payload).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        handle.join().unwrap();

        let calls = radio.calls();
        assert!(calls[0].starts_with("stage"));
        assert!(calls[1].starts_with("transmit"));
    }

    #[test]
    fn unconfirmed_send_times_out_as_confirming() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, _sink, _confirmations) = transport(radio);

        let start = quanta::Instant::now();
        let err = transport
            .send_and_confirm(Bytes::from_static(&[0x01]))
            .unwrap_err();
        let elapsed = start.elapsed();
        assert!(matches!(err, SendError::Confirming { .. }));
        assert!(elapsed >= Duration::from_millis(80));
        assert!(elapsed < Duration::from_millis(80) + Duration::from_millis(250));
    }

    #[test]
    fn stale_confirmation_cannot_satisfy_the_next_write() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, _sink, confirmations) = transport(radio);

        // Leftover acknowledgement from an unrelated earlier exchange.
        confirmations.resolve(
            Channel::Command,
            WriteIdentity::Payload(Bytes::from_static(&[0x99])),
            ConfirmOutcome::Confirmed,
        );

        let err = transport
            .send_and_confirm(Bytes::from_static(&[0x01]))
            .unwrap_err();
        assert!(matches!(
            err,
            SendError::Confirming {
                source: crate::confirm::ConfirmError::Timeout(_),
                ..
            }
        ));
    }

    #[test]
    fn receive_returns_queued_packet_immediately() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, sink, _confirmations) = transport(radio);
        sink.push(Bytes::from_static(&[0x01, 0x02]));

        let start = quanta::Instant::now();
        let packet = transport.receive(Duration::from_millis(1000)).unwrap();
        assert_eq!(packet[..], [0x01, 0x02]);
        assert!(start.elapsed() < Duration::from_millis(100));
        // The packet was removed.
        assert_eq!(transport.flush(), 0);
    }

    #[test]
    fn receive_times_out_on_empty_queue() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, _sink, _confirmations) = transport(radio);

        let start = quanta::Instant::now();
        let err = transport.receive(Duration::from_millis(60)).unwrap_err();
        let elapsed = start.elapsed();
        assert!(matches!(err, ReceiveError::Timeout { .. }));
        assert!(elapsed >= Duration::from_millis(60));
        assert!(elapsed < Duration::from_millis(60) + Duration::from_millis(250));
    }

    #[test]
    fn receive_reports_teardown_as_interrupted() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, sink, _confirmations) = transport(radio);
        drop(sink);

        let err = transport.receive(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ReceiveError::Interrupted { .. }));
    }

    #[test]
    fn flush_drains_and_counts_then_is_idempotent() {
        let radio = Arc::new(ScriptedRadio::default());
        let (transport, sink, _confirmations) = transport(radio);
        sink.push(Bytes::from_static(&[0x01]));
        sink.push(Bytes::from_static(&[0x02, 0x03]));

        assert_eq!(transport.flush(), 2);
        assert_eq!(transport.flush(), 0);
    }

    #[test]
    fn enable_notifications_writes_the_indication_value() {
        let radio = Arc::new(ScriptedRadio::default());
        let descriptor = DescriptorHandle(0x0022);
        radio.descriptors.lock().unwrap().push(descriptor);
        let (transport, _sink, confirmations) = transport(radio.clone());

        let resolver = confirmations.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolver.resolve(
                Channel::Command,
                WriteIdentity::Descriptor(descriptor),
                ConfirmOutcome::Confirmed,
            );
        });

        transport.enable_notifications().unwrap();
        handle.join().unwrap();

        let calls = radio.calls();
        assert!(calls.iter().any(|c| c == "write_descriptor 0x0022 [02, 00]"));
    }

    #[test]
    fn wrong_descriptor_count_fails_without_writing() {
        let radio = Arc::new(ScriptedRadio::default());
        radio
            .descriptors
            .lock()
            .unwrap()
            .extend([DescriptorHandle(0x22), DescriptorHandle(0x23)]);
        let (transport, _sink, _confirmations) = transport(radio.clone());

        let err = transport.enable_notifications().unwrap_err();
        assert!(matches!(err, SetupError::DescriptorLayout { found: 2, .. }));
        assert!(!radio.calls().iter().any(|c| c.starts_with("write_descriptor")));
    }

    #[test]
    fn delivery_refusal_is_a_setup_fault() {
        let radio = Arc::new(ScriptedRadio::default());
        radio.refuse_enable.store(true, Ordering::Relaxed);
        let (transport, _sink, _confirmations) = transport(radio);

        let err = transport.enable_notifications().unwrap_err();
        assert!(matches!(err, SetupError::IndicationsRefused { .. }));
    }

    #[test]
    fn descriptor_write_refusal_is_a_setup_fault() {
        let radio = Arc::new(ScriptedRadio::default());
        radio.descriptors.lock().unwrap().push(DescriptorHandle(0x22));
        radio.refuse_descriptor_write.store(true, Ordering::Relaxed);
        let (transport, _sink, _confirmations) = transport(radio);

        let err = transport.enable_notifications().unwrap_err();
        assert!(matches!(err, SetupError::DescriptorWriteRefused { .. }));
    }

    #[test]
    fn unconfirmed_descriptor_write_is_a_setup_fault() {
        let radio = Arc::new(ScriptedRadio::default());
        radio.descriptors.lock().unwrap().push(DescriptorHandle(0x22));
        let (transport, _sink, _confirmations) = transport(radio);

        let err = transport.enable_notifications().unwrap_err();
        assert!(matches!(err, SetupError::Unconfirmed { .. }));
    }
}
