//! # Radio Boundary
//!
//! The seam between this layer and the platform BLE stack. Connection
//! establishment, service discovery, and pairing all happen on the other
//! side of this trait; this layer only stages bytes, requests transmissions,
//! and arms indication delivery.
//!
//! Every method reports refusal synchronously as `false` — a refusal means
//! the radio never attempted the operation, which is exactly the distinction
//! the [`SendError`](crate::error::SendError) taxonomy is built on.

use crate::channel::{CharacteristicHandle, DescriptorHandle};

/// Client Characteristic Configuration value that arms indications.
pub const ENABLE_INDICATIONS: [u8; 2] = [0x02, 0x00];

/// Synchronous interface to the platform radio stack.
///
/// Implementations are expected to complete every call without blocking on a
/// device round-trip: staging and transmit requests are accepted or refused
/// locally, and their device-side outcomes arrive later through the
/// [`ConfirmationRegistry`](crate::confirm::ConfirmationRegistry).
pub trait RadioLink: Send + Sync {
    /// Hand `bytes` to the radio's local write buffer for `characteristic`.
    ///
    /// Returns `false` if the radio refuses the bytes (nothing was sent).
    fn stage_write(&self, characteristic: CharacteristicHandle, bytes: &[u8]) -> bool;

    /// Request transmission of the previously staged buffer.
    ///
    /// Returns `false` if the radio rejects the request synchronously
    /// (nothing was sent).
    fn transmit(&self, characteristic: CharacteristicHandle) -> bool;

    /// Ask the stack to deliver notifications/indications for
    /// `characteristic` to the session's packet sink.
    fn enable_notification_delivery(&self, characteristic: CharacteristicHandle) -> bool;

    /// Write a configuration `value` to `descriptor`.
    fn write_descriptor(&self, descriptor: DescriptorHandle, value: &[u8]) -> bool;

    /// All descriptors attached to `characteristic`, as discovered by the
    /// stack.
    fn list_descriptors(&self, characteristic: CharacteristicHandle) -> Vec<DescriptorHandle>;
}
