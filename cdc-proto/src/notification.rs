//! Interrupt-endpoint notification framing.
//!
//! Notifications reuse the 8-byte setup-packet layout followed by the
//! notification payload. The only notification this device emits is
//! SERIAL_STATE with its 2-byte bitmask.

use crate::serial_state::SerialState;

/// bmRequestType of a class notification (device-to-host, class, interface).
pub const NOTIFICATION_REQUEST_TYPE: u8 = 0xa1;

/// bNotificationType for SERIAL_STATE.
pub const NOTIFICATION_SERIAL_STATE: u8 = 0x20;

/// Total size of a SERIAL_STATE notification: 8-byte header + 2-byte state.
pub const SERIAL_STATE_SIZE: usize = 10;

/// Build a SERIAL_STATE notification addressed to a communication interface.
#[must_use]
pub fn serial_state(interface: u8, state: SerialState) -> [u8; SERIAL_STATE_SIZE] {
    let payload = state.raw().to_le_bytes();
    [
        NOTIFICATION_REQUEST_TYPE,
        NOTIFICATION_SERIAL_STATE,
        0, // wValue
        0,
        interface, // wIndex
        0,
        2, // wLength
        0,
        payload[0],
        payload[1],
    ]
}
