//! [`BoardHal`]: the hardware side of the core's trait seams.
//!
//! The core engine runs synchronously under the shared-state lock; the
//! async peripheral drivers run in their own tasks. This module is the
//! membrane between the two:
//!
//! - GPIO is immediate: a bank of [`Flex`] pins indexed by [`PinId`].
//!   Pins owned by a peripheral (USB D+/D-, the fixed USART pins, SWD,
//!   BOOT1) have no entry and fall through to no-ops, which is exactly
//!   the contract the pin indirection layer expects for them.
//! - USART RX arrives through a per-port SPSC byte queue filled by the
//!   RX pump task. [`DmaOps::rx_sync`] drains the queue into the RX ring
//!   at a running write position; bytes the queue could not hold still
//!   advance the position, so a lapped consumer shows up as a position
//!   regression in the core and is reported as overrun.
//! - USART TX goes through a small staging buffer handed to the TX pump
//!   task with a [`Signal`]. Line-coding changes ride the same signal and
//!   are applied by the pump before its next write.
//! - USB endpoints are one-packet mailboxes. The pump tasks move packets
//!   between the mailboxes and the real endpoints and feed the resulting
//!   events back into the core.

use cdc_proto::{CharFormat, LineCoding, Parity};
use embassy_stm32::gpio::{Flex, Level, Pull as HwPull, Speed};
use embassy_stm32::usart;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::spsc::Consumer;
use heapless::Vec;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use serial_core::engine::{DATA_ENDPOINTS, MAX_PACKET, NOTIFY_ENDPOINTS};
use serial_core::pin::{Direction, OutputDrive, PinConfig, Pull, Slew};
use serial_core::{DmaOps, PinId, PinOps, RingBuffer, UsartOps, UsbOps};
use serial_core::{CDC_BUF_SIZE, PORT_COUNT};

/// Capacity of the per-port RX byte queue between the pump task and
/// `rx_sync`. The queue only bridges the gap between two lock sections;
/// at maximum baud it holds many milliseconds of traffic.
pub const RX_QUEUE_LEN: usize = 512;

/// Transmit staging size. The engine treats a short acceptance as a
/// partial transfer and re-arms from the ring on completion.
pub const TX_CHUNK: usize = 256;

/// Interrupt (notification) endpoint max packet size. Must hold a full
/// 10-byte SERIAL_STATE notification.
pub const NOTIFY_PACKET: usize = 16;

/// Mailbox slots, indexed by `ep - 1` for endpoints 0x01..=0x06.
pub const EP_SLOTS: usize = 2 * PORT_COUNT;

const NEW_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Kick for the per-port TX pump: staging or a pending config is waiting.
pub static TX_KICK: [Signal<CriticalSectionRawMutex, ()>; PORT_COUNT] = [NEW_SIGNAL; PORT_COUNT];

/// A packet is waiting in an IN mailbox.
pub static IN_READY: [Signal<CriticalSectionRawMutex, ()>; EP_SLOTS] = [NEW_SIGNAL; EP_SLOTS];

/// The core consumed an OUT mailbox packet; the pump may stash the next.
pub static OUT_FREE: [Signal<CriticalSectionRawMutex, ()>; PORT_COUNT] = [NEW_SIGNAL; PORT_COUNT];

const ATOMIC_FALSE: AtomicBool = AtomicBool::new(false);
const ATOMIC_ZERO: AtomicUsize = AtomicUsize::new(0);

/// Receiver gate, read by the RX pump outside the lock.
static RX_OPEN: [AtomicBool; PORT_COUNT] = [ATOMIC_FALSE; PORT_COUNT];

/// Whole-port run gate.
static RUNNING: [AtomicBool; PORT_COUNT] = [ATOMIC_FALSE; PORT_COUNT];

/// Bytes the RX pump had to drop because the queue was full.
static RX_DROPPED: [AtomicUsize; PORT_COUNT] = [ATOMIC_ZERO; PORT_COUNT];

/// The RX pump delivers bytes here only while both gates are open.
pub fn receiver_open(port: usize) -> bool {
    RUNNING[port].load(Ordering::Relaxed) && RX_OPEN[port].load(Ordering::Relaxed)
}

/// Record bytes lost between the DMA ring and the byte queue.
pub fn note_rx_dropped(port: usize, n: usize) {
    RX_DROPPED[port].fetch_add(n, Ordering::Relaxed);
}

/// Translate a CDC line coding into a USART configuration.
///
/// 7-bit frames ride an 8-bit word; the engine masks the high bit on the
/// way to the host. Mark/space parity never reaches this point, the
/// engine rejects it at the control request.
pub fn usart_config(coding: &LineCoding) -> usart::Config {
    let mut config = usart::Config::default();
    config.baudrate = coding.rate;
    config.data_bits = usart::DataBits::DataBits8;
    config.stop_bits = match coding.format {
        CharFormat::Stop1 => usart::StopBits::STOP1,
        CharFormat::Stop1p5 => usart::StopBits::STOP1P5,
        CharFormat::Stop2 => usart::StopBits::STOP2,
    };
    config.parity = match coding.parity {
        Parity::None | Parity::Mark | Parity::Space => usart::Parity::ParityNone,
        Parity::Odd => usart::Parity::ParityOdd,
        Parity::Even => usart::Parity::ParityEven,
    };
    config
}

fn hw_pull(pull: Pull) -> HwPull {
    match pull {
        Pull::Floating => HwPull::None,
        Pull::Up => HwPull::Up,
        Pull::Down => HwPull::Down,
    }
}

fn hw_speed(speed: Slew) -> Speed {
    match speed {
        Slew::Low => Speed::Low,
        Slew::Medium => Speed::Medium,
        Slew::High => Speed::VeryHigh,
    }
}

/// The GPIO bank. `None` where a peripheral owns the pin.
pub type PinBank = [Option<Flex<'static>>; PinId::COUNT];

/// Sync-side view of one USART's data plumbing.
struct UartPlumbing {
    /// Consumer half of the RX byte queue; the pump task owns the producer.
    rx_queue: Consumer<'static, u8, RX_QUEUE_LEN>,
    /// Running receive write position, in RX-ring coordinates.
    rx_pos: usize,
    /// Line coding waiting for the TX pump to apply.
    pending_config: Option<usart::Config>,
    /// Bytes handed to the TX pump but not yet on the wire.
    staging: Vec<u8, TX_CHUNK>,
    busy: bool,
}

impl UartPlumbing {
    fn new(rx_queue: Consumer<'static, u8, RX_QUEUE_LEN>) -> Self {
        Self {
            rx_queue,
            rx_pos: 0,
            pending_config: None,
            staging: Vec::new(),
            busy: false,
        }
    }
}

fn ep_slot(ep: u8) -> usize {
    debug_assert!((1..=EP_SLOTS as u8).contains(&ep));
    usize::from(ep) - 1
}

fn ep_capacity(ep: u8) -> usize {
    if NOTIFY_ENDPOINTS.contains(&ep) {
        NOTIFY_PACKET
    } else {
        MAX_PACKET
    }
}

/// The whole hardware surface the core drives, behind one lock.
pub struct BoardHal {
    pins: PinBank,
    uarts: [UartPlumbing; PORT_COUNT],
    /// IN mailboxes for endpoints 0x01..=0x06. `None` + not in flight
    /// means the endpoint has room for one packet.
    in_slots: [Option<Vec<u8, MAX_PACKET>>; EP_SLOTS],
    in_flight: [bool; EP_SLOTS],
    /// One OUT packet per data endpoint, held until the core drains it.
    out_slots: [Option<Vec<u8, MAX_PACKET>>; PORT_COUNT],
}

impl BoardHal {
    pub fn new(pins: PinBank, rx_queues: [Consumer<'static, u8, RX_QUEUE_LEN>; PORT_COUNT]) -> Self {
        let [q0, q1, q2] = rx_queues;
        Self {
            pins,
            uarts: [
                UartPlumbing::new(q0),
                UartPlumbing::new(q1),
                UartPlumbing::new(q2),
            ],
            in_slots: [const { None }; EP_SLOTS],
            in_flight: [false; EP_SLOTS],
            out_slots: [const { None }; PORT_COUNT],
        }
    }

    /* Pump-task side of the mailboxes and staging */

    /// Take the packet waiting for an IN endpoint; the endpoint stays
    /// busy until [`BoardHal::in_done`].
    pub fn take_in(&mut self, ep: u8) -> Option<Vec<u8, MAX_PACKET>> {
        let slot = ep_slot(ep);
        let packet = self.in_slots[slot].take();
        if packet.is_some() {
            self.in_flight[slot] = true;
        }
        packet
    }

    /// The IN transfer finished (or was abandoned on a disabled endpoint).
    pub fn in_done(&mut self, ep: u8) {
        self.in_flight[ep_slot(ep)] = false;
    }

    /// Room for the next OUT packet?
    pub fn out_free(&mut self, ep: u8) -> bool {
        let port = DATA_ENDPOINTS
            .iter()
            .position(|&e| e == ep)
            .unwrap_or_default();
        self.out_slots[port].is_none()
    }

    /// Park a received OUT packet for the core.
    pub fn stash_out(&mut self, ep: u8, data: &[u8]) {
        let port = DATA_ENDPOINTS
            .iter()
            .position(|&e| e == ep)
            .unwrap_or_default();
        let mut packet = Vec::new();
        let n = data.len().min(packet.capacity());
        let _ = packet.extend_from_slice(&data[..n]);
        self.out_slots[port] = Some(packet);
    }

    /// Line coding waiting to be programmed, taken by the TX pump.
    pub fn take_pending_config(&mut self, port: usize) -> Option<usart::Config> {
        self.uarts[port].pending_config.take()
    }

    /// Staged transmit bytes, taken by the TX pump.
    pub fn take_tx(&mut self, port: usize) -> Option<Vec<u8, TX_CHUNK>> {
        let u = &mut self.uarts[port];
        if u.staging.is_empty() {
            None
        } else {
            Some(core::mem::take(&mut u.staging))
        }
    }

    /// The TX pump put the staged bytes on the wire.
    pub fn tx_done(&mut self, port: usize) {
        self.uarts[port].busy = false;
    }
}

impl PinOps for BoardHal {
    fn configure(&mut self, pin: PinId, cfg: &PinConfig) {
        let Some(flex) = self.pins[pin.index()].as_mut() else {
            return;
        };
        match cfg.dir {
            Direction::Input => flex.set_as_input(hw_pull(cfg.pull)),
            Direction::Output => match cfg.output {
                OutputDrive::PushPull => flex.set_as_output(hw_speed(cfg.speed)),
                OutputDrive::OpenDrain => flex.set_as_input_output(hw_speed(cfg.speed)),
            },
        }
    }

    fn write(&mut self, pin: PinId, level: bool) {
        if let Some(flex) = self.pins[pin.index()].as_mut() {
            flex.set_level(if level { Level::High } else { Level::Low });
        }
    }

    fn read(&mut self, pin: PinId) -> bool {
        self.pins[pin.index()]
            .as_mut()
            .is_some_and(|flex| flex.is_high())
    }

    fn release(&mut self, pin: PinId) {
        if let Some(flex) = self.pins[pin.index()].as_mut() {
            flex.set_as_analog();
        }
    }
}

impl UsartOps for BoardHal {
    fn apply_line_coding(&mut self, port: usize, coding: &LineCoding) {
        self.uarts[port].pending_config = Some(usart_config(coding));
        TX_KICK[port].signal(());
    }

    fn set_receiver(&mut self, port: usize, on: bool) {
        RX_OPEN[port].store(on, Ordering::Relaxed);
    }

    fn set_running(&mut self, port: usize, on: bool) {
        RUNNING[port].store(on, Ordering::Relaxed);
    }

    fn set_irda(&mut self, port: usize, on: bool) {
        if on {
            // The HAL exposes no IrDA mode; the setting is persisted but
            // has no electrical effect on this board.
            defmt::warn!("usart{}: irda requested but not supported", port);
        }
    }
}

impl DmaOps for BoardHal {
    fn rx_sync(&mut self, port: usize, ring: &mut RingBuffer<CDC_BUF_SIZE>) -> usize {
        let u = &mut self.uarts[port];
        let mut pos = u.rx_pos;
        let mut chunk = [0u8; MAX_PACKET];
        loop {
            let mut n = 0;
            while n < chunk.len() {
                match u.rx_queue.dequeue() {
                    Some(byte) => {
                        chunk[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            if n == 0 {
                break;
            }
            ring.deposit(pos, &chunk[..n]);
            pos = (pos + n) & (CDC_BUF_SIZE - 1);
        }
        // Dropped bytes still move the position so the core sees the lap.
        let dropped = RX_DROPPED[port].swap(0, Ordering::Relaxed);
        pos = (pos + dropped) & (CDC_BUF_SIZE - 1);
        u.rx_pos = pos;
        pos
    }

    fn rx_restart(&mut self, port: usize, pos: usize) {
        let u = &mut self.uarts[port];
        while u.rx_queue.dequeue().is_some() {}
        RX_DROPPED[port].store(0, Ordering::Relaxed);
        u.rx_pos = pos & (CDC_BUF_SIZE - 1);
    }

    fn tx_busy(&mut self, port: usize) -> bool {
        self.uarts[port].busy
    }

    fn tx_start(&mut self, port: usize, data: &[u8]) -> usize {
        let u = &mut self.uarts[port];
        let n = data.len().min(TX_CHUNK);
        u.staging.clear();
        let _ = u.staging.extend_from_slice(&data[..n]);
        u.busy = true;
        TX_KICK[port].signal(());
        n
    }
}

impl UsbOps for BoardHal {
    fn in_space(&mut self, ep: u8) -> usize {
        let slot = ep_slot(ep);
        if self.in_slots[slot].is_none() && !self.in_flight[slot] {
            ep_capacity(ep)
        } else {
            0
        }
    }

    fn out_len(&mut self, ep: u8) -> usize {
        let port = DATA_ENDPOINTS
            .iter()
            .position(|&e| e == ep)
            .unwrap_or_default();
        self.out_slots[port].as_ref().map_or(0, Vec::len)
    }

    fn write(&mut self, ep: u8, data: &[u8]) -> usize {
        let slot = ep_slot(ep);
        let mut packet = Vec::new();
        let n = data.len().min(ep_capacity(ep)).min(packet.capacity());
        let _ = packet.extend_from_slice(&data[..n]);
        self.in_slots[slot] = Some(packet);
        IN_READY[slot].signal(());
        n
    }

    fn read(&mut self, ep: u8, buf: &mut [u8]) -> usize {
        let Some(port) = DATA_ENDPOINTS.iter().position(|&e| e == ep) else {
            return 0;
        };
        let Some(packet) = self.out_slots[port].take() else {
            return 0;
        };
        let n = packet.len().min(buf.len());
        buf[..n].copy_from_slice(&packet[..n]);
        OUT_FREE[port].signal(());
        n
    }
}
