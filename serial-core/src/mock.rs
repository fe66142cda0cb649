//! In-memory hardware doubles for host tests.

extern crate std;

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use cdc_proto::LineCoding;

use crate::config::{ConfigFlash, FlashError, CONFIG_BLOB_SIZE, CONFIG_PAGES};
use crate::engine::{CDC_BUF_SIZE, MAX_PACKET, PORT_COUNT};
use crate::hal::{DmaOps, PinOps, UsartOps, UsbOps};
use crate::pin::{PinConfig, PinId};
use crate::ring::RingBuffer;

/// Scriptable stand-in for the whole hardware surface.
///
/// Pins default to a high level (external pull-ups idle); IN endpoints hold
/// one packet and stay busy until [`MockHal::complete_in`].
pub struct MockHal {
    pub pin_levels: [bool; PinId::COUNT],
    pub pin_written: [Option<bool>; PinId::COUNT],
    pub configured_pins: Vec<PinId>,
    pub released_pins: Vec<PinId>,

    pub applied_codings: Vec<(usize, LineCoding)>,
    pub receiver_on: [bool; PORT_COUNT],
    pub running: [bool; PORT_COUNT],
    pub irda: [bool; PORT_COUNT],

    rx_pos: [usize; PORT_COUNT],
    rx_pending: [Vec<u8>; PORT_COUNT],
    forced_pos: [Option<usize>; PORT_COUNT],
    pub tx_active: [Option<Vec<u8>>; PORT_COUNT],
    pub tx_sent: [Vec<u8>; PORT_COUNT],

    in_space: BTreeMap<u8, usize>,
    /// Log of every packet queued on an IN endpoint.
    pub in_packets: Vec<(u8, Vec<u8>)>,
    out_queues: BTreeMap<u8, VecDeque<Vec<u8>>>,
}

impl MockHal {
    pub fn new() -> Self {
        Self {
            pin_levels: [true; PinId::COUNT],
            pin_written: [None; PinId::COUNT],
            configured_pins: Vec::new(),
            released_pins: Vec::new(),
            applied_codings: Vec::new(),
            receiver_on: [false; PORT_COUNT],
            running: [false; PORT_COUNT],
            irda: [false; PORT_COUNT],
            rx_pos: [0; PORT_COUNT],
            rx_pending: [Vec::new(), Vec::new(), Vec::new()],
            forced_pos: [None; PORT_COUNT],
            tx_active: [None, None, None],
            tx_sent: [Vec::new(), Vec::new(), Vec::new()],
            in_space: BTreeMap::new(),
            in_packets: Vec::new(),
            out_queues: BTreeMap::new(),
        }
    }

    /// Forget recorded interactions, keep hardware state.
    pub fn clear_records(&mut self) {
        self.pin_written = [None; PinId::COUNT];
        self.configured_pins.clear();
        self.released_pins.clear();
        self.applied_codings.clear();
        self.in_packets.clear();
    }

    /// Bytes arriving on a port's receiver, delivered at the next sync.
    pub fn feed_rx(&mut self, port: usize, bytes: &[u8]) {
        self.rx_pending[port].extend_from_slice(bytes);
    }

    /// Script the next sync to report an arbitrary write position without
    /// delivering data, as a lapped receiver would.
    pub fn force_rx_pos(&mut self, port: usize, pos: usize) {
        self.forced_pos[port] = Some(pos);
    }

    /// Host collected the packet; the endpoint is free again.
    pub fn complete_in(&mut self, ep: u8) {
        self.in_space.insert(ep, MAX_PACKET);
    }

    pub fn set_in_space(&mut self, ep: u8, space: usize) {
        self.in_space.insert(ep, space);
    }

    /// A packet from the host waiting on an OUT endpoint.
    pub fn queue_out(&mut self, ep: u8, bytes: &[u8]) {
        self.out_queues
            .entry(ep)
            .or_default()
            .push_back(Vec::from(bytes));
    }

    /// Packets still waiting on an OUT endpoint.
    pub fn out_queued(&self, ep: u8) -> usize {
        self.out_queues.get(&ep).map_or(0, VecDeque::len)
    }

    /// The transmitter finished its transfer.
    pub fn finish_tx(&mut self, port: usize) {
        if let Some(data) = self.tx_active[port].take() {
            self.tx_sent[port].extend_from_slice(&data);
        }
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl PinOps for MockHal {
    fn configure(&mut self, pin: PinId, _cfg: &PinConfig) {
        self.configured_pins.push(pin);
    }

    fn write(&mut self, pin: PinId, level: bool) {
        self.pin_written[pin.index()] = Some(level);
    }

    fn read(&mut self, pin: PinId) -> bool {
        self.pin_levels[pin.index()]
    }

    fn release(&mut self, pin: PinId) {
        self.released_pins.push(pin);
    }
}

impl UsartOps for MockHal {
    fn apply_line_coding(&mut self, port: usize, coding: &LineCoding) {
        self.applied_codings.push((port, *coding));
    }

    fn set_receiver(&mut self, port: usize, on: bool) {
        self.receiver_on[port] = on;
    }

    fn set_running(&mut self, port: usize, on: bool) {
        self.running[port] = on;
    }

    fn set_irda(&mut self, port: usize, on: bool) {
        self.irda[port] = on;
    }
}

impl DmaOps for MockHal {
    fn rx_sync(&mut self, port: usize, ring: &mut RingBuffer<CDC_BUF_SIZE>) -> usize {
        if let Some(pos) = self.forced_pos[port].take() {
            self.rx_pos[port] = pos;
            return pos;
        }
        let bytes = core::mem::take(&mut self.rx_pending[port]);
        if self.receiver_on[port] {
            ring.deposit(self.rx_pos[port], &bytes);
            self.rx_pos[port] = (self.rx_pos[port] + bytes.len()) & (CDC_BUF_SIZE - 1);
        }
        self.rx_pos[port]
    }

    fn rx_restart(&mut self, port: usize, pos: usize) {
        self.rx_pos[port] = pos & (CDC_BUF_SIZE - 1);
        self.rx_pending[port].clear();
    }

    fn tx_busy(&mut self, port: usize) -> bool {
        self.tx_active[port].is_some()
    }

    fn tx_start(&mut self, port: usize, data: &[u8]) -> usize {
        assert!(
            self.tx_active[port].is_none(),
            "tx started while a transfer is in flight"
        );
        self.tx_active[port] = Some(Vec::from(data));
        data.len()
    }
}

impl UsbOps for MockHal {
    fn in_space(&mut self, ep: u8) -> usize {
        *self.in_space.get(&ep).unwrap_or(&MAX_PACKET)
    }

    fn out_len(&mut self, ep: u8) -> usize {
        self.out_queues
            .get(&ep)
            .and_then(VecDeque::front)
            .map_or(0, Vec::len)
    }

    fn write(&mut self, ep: u8, data: &[u8]) -> usize {
        self.in_packets.push((ep, Vec::from(data)));
        // the endpoint holds this packet until the host collects it
        self.in_space.insert(ep, 0);
        data.len()
    }

    fn read(&mut self, ep: u8, buf: &mut [u8]) -> usize {
        let Some(packet) = self.out_queues.get_mut(&ep).and_then(VecDeque::pop_front) else {
            return 0;
        };
        let n = packet.len().min(buf.len());
        buf[..n].copy_from_slice(&packet[..n]);
        n
    }
}

/// Two in-memory erased flash pages.
pub struct MockFlash {
    pages: [[u8; CONFIG_BLOB_SIZE]; CONFIG_PAGES],
    pub writes: usize,
    /// Script the next write to fail.
    pub fail_next_write: bool,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            pages: [[0xff; CONFIG_BLOB_SIZE]; CONFIG_PAGES],
            writes: 0,
            fail_next_write: false,
        }
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFlash for MockFlash {
    fn read(&mut self, page: usize, buf: &mut [u8; CONFIG_BLOB_SIZE]) {
        buf.copy_from_slice(&self.pages[page]);
    }

    fn write(&mut self, page: usize, blob: &[u8; CONFIG_BLOB_SIZE]) -> Result<(), FlashError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(FlashError);
        }
        self.pages[page].copy_from_slice(blob);
        self.writes += 1;
        Ok(())
    }

    fn invalidate(&mut self, page: usize) -> Result<(), FlashError> {
        self.pages[page][..4].fill(0);
        Ok(())
    }
}
