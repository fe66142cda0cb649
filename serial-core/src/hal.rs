//! Hardware abstraction seams.
//!
//! The engine only ever touches hardware through these traits, so the whole
//! bridge runs against mocks on the host. The firmware implements them as
//! thin adapters over the real peripherals; the interrupt/async plumbing on
//! the hardware side stays outside the core.

use cdc_proto::LineCoding;

use crate::engine::CDC_BUF_SIZE;
use crate::pin::{PinConfig, PinId};
use crate::ring::RingBuffer;

/// Per-pin hardware operations. `write`/`read` work in electrical levels;
/// polarity translation happens in the pin layer above.
pub trait PinOps {
    /// Apply a pin's electrical configuration.
    fn configure(&mut self, pin: PinId, cfg: &PinConfig);

    /// Drive an output pin to a level.
    fn write(&mut self, pin: PinId, level: bool);

    /// Sample a pin's level.
    fn read(&mut self, pin: PinId) -> bool;

    /// Return a pin to its reset state (high-impedance input).
    fn release(&mut self, pin: PinId);
}

/// Per-port USART control.
pub trait UsartOps {
    fn apply_line_coding(&mut self, port: usize, coding: &LineCoding);

    /// Gate the receiver without stopping the transmitter.
    fn set_receiver(&mut self, port: usize, on: bool);

    /// Start or suspend the whole peripheral.
    fn set_running(&mut self, port: usize, on: bool);

    /// IrDA SIR encoding.
    fn set_irda(&mut self, port: usize, on: bool);
}

/// Receive/transmit data movement for one port.
pub trait DmaOps {
    /// Deposit freshly received bytes into the RX ring at the hardware
    /// write position and return that absolute position.
    ///
    /// The engine compares successive positions against the ring's consumer
    /// index; a position that implies fewer unread bytes than before means
    /// the producer lapped the consumer and data was lost. Implementations
    /// must keep advancing the position even when bytes had to be dropped,
    /// so that lap is visible.
    fn rx_sync(&mut self, port: usize, ring: &mut RingBuffer<CDC_BUF_SIZE>) -> usize;

    /// Restart reception with the position counter at `pos`.
    fn rx_restart(&mut self, port: usize, pos: usize);

    /// A transmit transfer is still in flight.
    fn tx_busy(&mut self, port: usize) -> bool;

    /// Begin transmitting a contiguous span. Returns the number of bytes
    /// accepted; completion is reported later as a TX-complete event.
    fn tx_start(&mut self, port: usize, data: &[u8]) -> usize;
}

/// Packet-level endpoint access, the narrow waist over the USB stack.
pub trait UsbOps {
    /// Free space on an IN endpoint (0 while a transmission is pending).
    fn in_space(&mut self, ep: u8) -> usize;

    /// Bytes waiting on an OUT endpoint.
    fn out_len(&mut self, ep: u8) -> usize;

    /// Queue a packet on an IN endpoint. An empty slice queues a ZLP.
    fn write(&mut self, ep: u8, data: &[u8]) -> usize;

    /// Drain the packet waiting on an OUT endpoint.
    fn read(&mut self, ep: u8, buf: &mut [u8]) -> usize;
}

/// Umbrella over all four seams, what the engine's entry points take.
pub trait Hal: PinOps + UsartOps + DmaOps + UsbOps {}

impl<T: PinOps + UsartOps + DmaOps + UsbOps> Hal for T {}
