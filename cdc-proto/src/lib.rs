//! USB CDC-ACM wire protocol types.
//!
//! This crate holds the host-visible protocol vocabulary of a CDC-ACM
//! (Abstract Control Model) serial device, without any notion of the
//! hardware behind it:
//!
//! - [`line_coding`]: the 7-byte line coding structure
//!   ([`LineCoding`], [`CharFormat`], [`Parity`], [`DataBits`])
//! - [`serial_state`]: the SERIAL_STATE bitmask ([`SerialState`]) and the
//!   control line state word ([`ControlLineState`])
//! - [`notification`]: interrupt-endpoint notification framing
//! - [`descriptor`]: class codes and functional descriptor subtypes needed
//!   to assemble CDC interface descriptors
//!
//! # Features
//!
//! - **`std`**: standard library support (host testing)
//! - **`defmt`**: derive `defmt::Format` on public types
//!
//! The crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod descriptor;
pub mod line_coding;
pub mod notification;
pub mod serial_state;

pub use line_coding::{CharFormat, CodingError, DataBits, LineCoding, Parity};
pub use serial_state::{ControlLineState, SerialState};

/// CDC class-specific requests carried over the control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Request {
    SetLineCoding = 0x20,
    GetLineCoding = 0x21,
    SetControlLineState = 0x22,
    SendBreak = 0x23,
}

impl Request {
    /// Decode a bRequest value, `None` for requests this device does not speak.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x20 => Some(Self::SetLineCoding),
            0x21 => Some(Self::GetLineCoding),
            0x22 => Some(Self::SetControlLineState),
            0x23 => Some(Self::SendBreak),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_u8() {
        assert_eq!(Request::from_u8(0x20), Some(Request::SetLineCoding));
        assert_eq!(Request::from_u8(0x21), Some(Request::GetLineCoding));
        assert_eq!(Request::from_u8(0x22), Some(Request::SetControlLineState));
        assert_eq!(Request::from_u8(0x00), None);
        assert_eq!(Request::from_u8(0xff), None);
    }
}
