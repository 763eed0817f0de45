//! # Channel Identities
//!
//! The pump exposes exactly two logical packet paths, each bound to its own
//! GATT characteristic: `Command` carries the request/response control
//! traffic, `Data` carries bulk transfers (history, bolus logs). A
//! [`PacketTransport`](crate::transport::PacketTransport) instance is bound
//! to one channel for its whole lifetime.

use std::fmt;

// ─── Channel ────────────────────────────────────────────────────────────────

/// One of the two logical packet paths to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Request/response control traffic.
    Command,
    /// Bulk data transfers.
    Data,
}

impl Channel {
    /// Both channels, in arming order (Command first).
    pub const ALL: [Channel; 2] = [Channel::Command, Channel::Data];

    /// Stable per-channel slot index (0 or 1).
    pub fn index(self) -> usize {
        match self {
            Channel::Command => 0,
            Channel::Data => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Command => write!(f, "command"),
            Channel::Data => write!(f, "data"),
        }
    }
}

// ─── Radio Endpoint Handles ─────────────────────────────────────────────────

/// Opaque ATT handle of the characteristic backing a channel.
///
/// Assigned during service discovery (outside this layer); this layer never
/// interprets it, only passes it back to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u16);

/// Opaque ATT handle of a configuration descriptor attached to a
/// characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle(pub u16);

impl fmt::Display for CharacteristicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl fmt::Display for DescriptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}
