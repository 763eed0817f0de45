//! # Session Wiring
//!
//! Per-connection construction and teardown of the two channel transports.
//! [`LinkSession::new`] builds one transport + queue pair per channel plus
//! the shared confirmation registry, and hands the producer ends back as
//! [`RadioHooks`] for the radio glue to drive. Everything here is
//! session-scoped: queue contents and pending confirmations die with the
//! session, nothing persists across reconnects.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::{Channel, CharacteristicHandle};
use crate::confirm::ConfirmationRegistry;
use crate::error::SetupError;
use crate::queue::{packet_queue, PacketSink};
use crate::radio::RadioLink;
use crate::transport::{PacketTransport, DEFAULT_EXCHANGE_TIMEOUT};

/// Characteristics and timing for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Characteristic backing the command channel.
    pub command: CharacteristicHandle,
    /// Characteristic backing the data channel.
    pub data: CharacteristicHandle,
    /// Confirmation deadline for every exchange.
    pub exchange_timeout: Duration,
}

impl SessionConfig {
    pub fn new(command: CharacteristicHandle, data: CharacteristicHandle) -> Self {
        SessionConfig {
            command,
            data,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Producer-side handles for the radio glue.
///
/// The notification-delivery context pushes inbound packets into the matching
/// sink; the confirmation-delivery context resolves acknowledgements through
/// the registry. Dropping the hooks disconnects both queues, which is what a
/// blocked [`receive`](PacketTransport::receive) observes as interruption.
pub struct RadioHooks {
    pub command_sink: PacketSink,
    pub data_sink: PacketSink,
    pub confirmations: Arc<ConfirmationRegistry>,
}

impl RadioHooks {
    /// Sink for the given channel.
    pub fn sink(&self, channel: Channel) -> &PacketSink {
        match channel {
            Channel::Command => &self.command_sink,
            Channel::Data => &self.data_sink,
        }
    }
}

/// Both channel transports of one established connection.
pub struct LinkSession<R: RadioLink> {
    command: PacketTransport<R>,
    data: PacketTransport<R>,
    confirmations: Arc<ConfirmationRegistry>,
}

impl<R: RadioLink> LinkSession<R> {
    /// Build the per-channel transports and the hooks the radio glue drives.
    pub fn new(radio: Arc<R>, config: SessionConfig) -> (Self, RadioHooks) {
        let confirmations = Arc::new(ConfirmationRegistry::new());

        let (command_sink, command_queue) = packet_queue(Channel::Command);
        let (data_sink, data_queue) = packet_queue(Channel::Data);

        let command = PacketTransport::new(
            Channel::Command,
            config.command,
            radio.clone(),
            command_queue,
            confirmations.clone(),
        )
        .with_exchange_timeout(config.exchange_timeout);
        let data = PacketTransport::new(
            Channel::Data,
            config.data,
            radio,
            data_queue,
            confirmations.clone(),
        )
        .with_exchange_timeout(config.exchange_timeout);

        let hooks = RadioHooks {
            command_sink,
            data_sink,
            confirmations: confirmations.clone(),
        };

        (
            LinkSession {
                command,
                data,
                confirmations,
            },
            hooks,
        )
    }

    /// Transport bound to `channel`.
    pub fn transport(&self, channel: Channel) -> &PacketTransport<R> {
        match channel {
            Channel::Command => &self.command,
            Channel::Data => &self.data,
        }
    }

    /// Arm indications on both channels, command first.
    pub fn enable_notifications(&self) -> Result<(), SetupError> {
        for channel in Channel::ALL {
            self.transport(channel).enable_notifications()?;
        }
        Ok(())
    }

    /// Tear the session down: wake every blocked confirmation wait with an
    /// interruption. Queue consumers disconnect when the session and hooks
    /// are dropped.
    pub fn close(&self) {
        self.confirmations.close();
    }
}

impl<R: RadioLink> Drop for LinkSession<R> {
    fn drop(&mut self) {
        self.close();
    }
}
