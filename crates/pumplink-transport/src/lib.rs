//! # pumplink-transport
//!
//! Packet-level transport synchronization layer for the BLE link to an
//! insulin-delivery device.
//!
//! The radio stack is callback-driven: notifications and write
//! acknowledgements arrive on its own delivery contexts. The command
//! protocol above wants the opposite — a synchronous, timeout-bounded,
//! per-packet request/response API it can drive from a single worker thread
//! per session. This crate is the reconciliation between the two: it turns
//! three independently scheduled event sources (notification delivery,
//! acknowledgement delivery, the caller's own deadline) into four blocking
//! operations with a precise failure taxonomy, and nothing more. It never
//! interprets packet bytes, never retries, and never pipelines — those
//! decisions belong to the layer above, where a resend against an infusion
//! device has physical consequences.
//!
//! ## Crate structure
//!
//! - [`channel`] — the two logical channels and their radio endpoint handles
//! - [`queue`] — FIFO handoff from the notification callback to the caller
//! - [`confirm`] — single-slot write/acknowledgement correlation
//! - [`radio`] — the consumed boundary to the platform BLE stack
//! - [`transport`] — receive, send-and-confirm, flush, notification enable
//! - [`session`] — per-connection wiring of the two channel transports
//! - [`error`] — the retry-safe / ambiguous / session-fatal failure split

pub mod channel;
pub mod confirm;
pub mod error;
pub mod queue;
pub mod radio;
pub mod session;
pub mod transport;

pub use channel::{Channel, CharacteristicHandle, DescriptorHandle};
pub use confirm::{ConfirmError, ConfirmOutcome, ConfirmationRegistry, WriteIdentity};
pub use error::{ReceiveError, SendError, SetupError};
pub use queue::{packet_queue, PacketQueue, PacketSink};
pub use radio::{RadioLink, ENABLE_INDICATIONS};
pub use session::{LinkSession, RadioHooks, SessionConfig};
pub use transport::{PacketTransport, DEFAULT_EXCHANGE_TIMEOUT};
