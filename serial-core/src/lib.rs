//! Platform-agnostic core of a 3-port USB CDC-ACM serial adapter.
//!
//! This crate holds everything that does not need real hardware:
//!
//! - [`ring`]: the SPSC circular buffer between receivers, transmitters
//!   and USB endpoints
//! - [`pin`]: logical pin identifiers, electrical configuration and the
//!   safe-dereference indirection that makes runtime pin reassignment
//!   possible
//! - [`config`]: the device configuration, factory defaults and the
//!   two-page flash persistence contract
//! - [`hal`]: the trait seams the engine drives hardware through
//! - [`engine`]: the per-port CDC bridge state machine (data paths,
//!   line coding, serial-state notifications, config-mode arbiter)
//! - [`shell`] and [`commands`]: the interactive configuration shell that
//!   takes over port 0 in config mode
//! - [`device`]: the top-level context object tying the above together
//!
//! Hardware enters exclusively through the [`hal`] traits, so the whole
//! stack runs against mocks on the host.
//!
//! # Features
//!
//! - **`std`**: standard library support (host testing)
//! - **`defmt`**: derive `defmt::Format` on public types

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod commands;
pub mod config;
pub mod device;
pub mod engine;
pub mod hal;
pub mod pin;
pub mod ring;
pub mod shell;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{ConfigFlash, DeviceConfig, FlashError, LoadSource};
pub use device::{Device, PinStatusError, StatusChange};
pub use engine::{
    CdcEngine, ConfigModeEdge, DmaDirection, DmaEvent, EndpointEvent, UsartEvent, CDC_BUF_SIZE,
    CONFIG_PORT, PORT_COUNT,
};
pub use hal::{DmaOps, Hal, PinOps, UsartOps, UsbOps};
pub use pin::{PinConfig, PinId, PinRole, PinStatus};
pub use ring::RingBuffer;
pub use shell::Shell;

/// Firmware version reported by the shell.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
