//! STM32F103 adapter for the 3-port USB CDC-ACM serial bridge.
//!
//! The bridge logic itself lives in `serial-core`; this crate only wires
//! it to real peripherals:
//!
//! - [`board`]: [`BoardHal`], the [`serial_core::Hal`] implementation over
//!   embassy-stm32 GPIO, USART and USB endpoints
//! - [`flash`]: the persisted-configuration pages at the top of flash
//! - [`usb`]: CDC-ACM interface/endpoint assembly and the control-request
//!   handler
//!
//! Interrupt and async plumbing stays in the binary; everything it shares
//! with the core state machine sits in one [`Shared`] cell.

#![no_std]

pub mod board;
pub mod flash;
pub mod usb;

pub use board::BoardHal;
pub use flash::BoardFlash;
pub use usb::{add_cdc_port, CdcPort, UsbControl};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use serial_core::Device;

/// Everything the event sources (USB pumps, UART pumps, the poll ticker,
/// the control handler) act on. Held in one blocking mutex; every lock
/// section is short and never awaits.
pub struct Shared {
    pub device: Device,
    pub hal: BoardHal,
    pub flash: BoardFlash,
}

pub type SharedCell = Mutex<CriticalSectionRawMutex, RefCell<Shared>>;

/// Run a closure over the shared state.
pub fn with_shared<R>(cell: &SharedCell, f: impl FnOnce(&mut Shared) -> R) -> R {
    cell.lock(|shared| f(&mut shared.borrow_mut()))
}
