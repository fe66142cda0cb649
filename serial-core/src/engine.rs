//! Per-port CDC bridge engine.
//!
//! Orchestrates the full-duplex data path of three serial ports:
//! receiver → RX ring → USB bulk IN, and USB bulk OUT → TX ring →
//! transmitter, plus SERIAL_STATE notifications and the line-coding and
//! control-line protocol. The engine is a plain state machine over
//! [`Hal`]; hardware interrupts and USB events enter through the
//! `handle_*` methods, the foreground loop enters through [`CdcEngine::poll`].
//!
//! Producer/consumer roles per port:
//!
//! ```text
//! receiver (rx_sync) --> rx ring --> bulk IN endpoint
//! bulk OUT endpoint  --> tx ring --> transmitter (tx_start)
//! ```
//!
//! Each ring has exactly one producer context and one consumer context;
//! flow control (RTS gating, endpoint NAK backpressure) bounds production
//! so the data path never overruns by construction.

use cdc_proto::{notification, ControlLineState, DataBits, LineCoding, Parity, SerialState};
use portable_atomic::{AtomicU16, Ordering};

use crate::config::DeviceConfig;
use crate::hal::{Hal, UsbOps};
use crate::pin::PinRole;
use crate::ring::RingBuffer;

/// Number of CDC ports.
pub const PORT_COUNT: usize = 3;

/// Per-direction ring buffer size in bytes. Power of two.
pub const CDC_BUF_SIZE: usize = 1024;

/// The port whose data path is diverted to the shell in config mode.
pub const CONFIG_PORT: usize = 0;

/// Bulk endpoint max packet size.
pub const MAX_PACKET: usize = 64;

/// Modem-line polling interval in poll ticks (1 ms each).
pub const LINE_POLL_INTERVAL: u32 = 20;

/// Bulk data endpoint of each port.
pub const DATA_ENDPOINTS: [u8; PORT_COUNT] = [0x02, 0x04, 0x06];

/// Interrupt (notification) endpoint of each port.
pub const NOTIFY_ENDPOINTS: [u8; PORT_COUNT] = [0x01, 0x03, 0x05];

/// Communication interface number of each port.
pub const COMM_INTERFACES: [u8; PORT_COUNT] = [0, 2, 4];

/// Map a bulk data endpoint back to its port.
#[must_use]
pub fn data_endpoint_port(ep: u8) -> Option<usize> {
    DATA_ENDPOINTS.iter().position(|&e| e == ep)
}

/// Map a notification endpoint back to its port.
#[must_use]
pub fn notify_endpoint_port(ep: u8) -> Option<usize> {
    NOTIFY_ENDPOINTS.iter().position(|&e| e == ep)
}

/// Map a communication interface number back to its port.
#[must_use]
pub fn interface_port(interface: u8) -> Option<usize> {
    COMM_INTERFACES.iter().position(|&i| i == interface)
}

/// USART interrupt causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsartEvent {
    /// Idle line detected: the receive position should be resynced.
    Idle,
    ParityError,
    Overrun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaDirection {
    Rx,
    Tx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaEvent {
    HalfTransfer,
    TransferComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointEvent {
    DataReceived,
    DataSent,
}

/// A SET_LINE_CODING request the hardware cannot honor; maps to a STALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodingRejected;

/// Config-pin level change detected by the poll scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigModeEdge {
    Enter,
    Leave,
}

/// Runtime state of one CDC port.
pub struct PortState {
    rx: RingBuffer<CDC_BUF_SIZE>,
    tx: RingBuffer<CDC_BUF_SIZE>,
    coding: LineCoding,
    /// A new line coding waits for the TX ring to drain.
    coding_change_pending: bool,
    /// OUT endpoint holding a packet the TX ring had no room for.
    pending_rx_ep: Option<u8>,
    /// Length of the transfer the transmitter is working on.
    last_dma_tx: usize,
    /// A flush exactly filled the endpoint; a ZLP still owes the host.
    rx_zlp_pending: bool,
    /// Live serial state, shared between interrupt and poll contexts.
    serial_state: AtomicU16,
    /// Last state the host was told about (poll context only).
    reported_state: u16,
    /// A state change is waiting for the notification endpoint.
    notify_pending: bool,
    /// Host requested RTS flow control.
    rts_requested: bool,
    dtr_active: bool,
    enabled: bool,
}

impl PortState {
    const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            coding: LineCoding::DEFAULT,
            coding_change_pending: false,
            pending_rx_ep: None,
            last_dma_tx: 0,
            rx_zlp_pending: false,
            serial_state: AtomicU16::new(0),
            reported_state: 0,
            notify_pending: false,
            rts_requested: false,
            dtr_active: false,
            enabled: false,
        }
    }

    fn clear(&mut self) {
        self.rx.clear();
        self.tx.clear();
        self.coding_change_pending = false;
        self.pending_rx_ep = None;
        self.last_dma_tx = 0;
        self.rx_zlp_pending = false;
        self.serial_state.store(0, Ordering::Relaxed);
        self.reported_state = 0;
        self.notify_pending = false;
    }

    #[inline]
    #[must_use]
    pub fn line_coding(&self) -> LineCoding {
        self.coding
    }

    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn coding_change_pending(&self) -> bool {
        self.coding_change_pending
    }

    #[inline]
    #[must_use]
    pub fn serial_state(&self) -> SerialState {
        SerialState(self.serial_state.load(Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    #[must_use]
    pub fn tx_len(&self) -> usize {
        self.tx.len()
    }
}

/// Merge bits into the shared state word with a compare-and-swap retry
/// loop; three contexts race on this field.
fn merge_state(state: &AtomicU16, clear: u16, set: u16) -> u16 {
    let mut current = state.load(Ordering::Relaxed);
    loop {
        let merged = (current & !clear) | set;
        match state.compare_exchange_weak(current, merged, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return merged,
            Err(observed) => current = observed,
        }
    }
}

/// Move one waiting OUT packet into the TX ring. The caller has already
/// checked the space; failing here is a protocol-state corruption.
fn drain_out_ep<H: Hal>(st: &mut PortState, hal: &mut H, ep: u8) {
    let mut buf = [0u8; MAX_PACKET];
    let n = UsbOps::read(hal, ep, &mut buf);
    let pushed = st.tx.push(&buf[..n]);
    if pushed != n {
        panic!("tx ring overflow");
    }
}

/// The 3-port bridge state machine.
pub struct CdcEngine {
    ports: [PortState; PORT_COUNT],
    config_mode: bool,
    started: bool,
    poll_ticks: u32,
}

impl CdcEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ports: [PortState::new(), PortState::new(), PortState::new()],
            config_mode: false,
            started: false,
            poll_ticks: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn port(&self, port: usize) -> &PortState {
        &self.ports[port]
    }

    #[inline]
    #[must_use]
    pub fn config_mode(&self) -> bool {
        self.config_mode
    }

    /* Lifecycle */

    /// USB bus reset: drop all runtime state.
    pub fn reset(&mut self) {
        for st in self.ports.iter_mut() {
            st.clear();
            st.enabled = false;
            st.rts_requested = false;
            st.dtr_active = false;
        }
        self.config_mode = false;
        self.started = false;
        self.poll_ticks = 0;
    }

    /// Host configured the device: bring up every port whose RX and TX
    /// pins are both occupied.
    pub fn configured<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig) {
        self.started = true;
        for port in 0..PORT_COUNT {
            if Self::port_pins_ready(cfg, port) {
                self.enable_port(hal, cfg, port);
            }
        }
    }

    /// USB suspend: stop the serial side, keep the configuration.
    pub fn suspend<H: Hal>(&mut self, hal: &mut H) {
        self.started = false;
        for port in 0..PORT_COUNT {
            hal.set_running(port, false);
        }
    }

    /// A port may run iff both its RX and TX pins are occupied.
    #[must_use]
    pub fn port_pins_ready(cfg: &DeviceConfig, port: usize) -> bool {
        use crate::pin::PinStatus;
        let pins = &cfg.cdc[port];
        let occupied = |role| {
            pins.get(role)
                .is_some_and(|pin| cfg.status(pin) == PinStatus::Occupied)
        };
        occupied(PinRole::Rx) && occupied(PinRole::Tx)
    }

    /// Bring one port up: hardware pins, USART, reception from position 0.
    pub fn enable_port<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        let st = &mut self.ports[port];
        st.clear();
        st.enabled = true;
        for role in PinRole::ALL {
            cfg.pin_init(hal, cfg.cdc[port].get(role));
        }
        hal.set_running(port, true);
        hal.set_irda(port, cfg.cdc[port].irda);
        let coding = self.ports[port].coding;
        hal.apply_line_coding(port, &coding);
        cfg.role_write(hal, port, PinRole::Dtr, self.ports[port].dtr_active);
        cfg.role_write(hal, port, PinRole::Txa, false);
        hal.rx_restart(port, 0);
        hal.set_receiver(port, true);
        self.update_rts(hal, cfg, port);
    }

    /// Take one port down: suspend the USART, drop buffered data.
    pub fn disable_port<H: Hal>(&mut self, hal: &mut H, port: usize) {
        hal.set_receiver(port, false);
        hal.set_running(port, false);
        let st = &mut self.ports[port];
        st.clear();
        st.enabled = false;
    }

    /* Control requests */

    /// SET_CONTROL_LINE_STATE: DTR and RTS are asynchronous out-of-band
    /// signals, written through immediately.
    pub fn set_control_line_state<H: Hal>(
        &mut self,
        hal: &mut H,
        cfg: &DeviceConfig,
        port: usize,
        state: ControlLineState,
    ) {
        let st = &mut self.ports[port];
        st.dtr_active = state.dtr();
        st.rts_requested = state.rts();
        let dtr = st.dtr_active;
        cfg.role_write(hal, port, PinRole::Dtr, dtr);
        self.update_rts(hal, cfg, port);
    }

    /// SET_LINE_CODING. A rate of 0 keeps the current rate (the host is
    /// probing). Reprogramming is deferred while transmit data is in
    /// flight so an in-progress frame is not corrupted; the shell-owned
    /// config port skips the deferral since no transmitter is driving it.
    pub fn set_line_coding<H: Hal>(
        &mut self,
        hal: &mut H,
        port: usize,
        requested: &LineCoding,
    ) -> Result<(), CodingRejected> {
        match requested.parity {
            Parity::None => {
                if requested.data_bits != DataBits::Seven && requested.data_bits != DataBits::Eight
                {
                    return Err(CodingRejected);
                }
            }
            Parity::Odd | Parity::Even => {
                if requested.data_bits != DataBits::Eight {
                    return Err(CodingRejected);
                }
            }
            Parity::Mark | Parity::Space => return Err(CodingRejected),
        }
        let st = &mut self.ports[port];
        let mut coding = *requested;
        if coding.rate == 0 {
            coding.rate = st.coding.rate;
        }
        st.coding = coding;
        let shell_owned = port == CONFIG_PORT && self.config_mode;
        if !st.tx.is_empty() && !shell_owned {
            st.coding_change_pending = true;
        } else {
            hal.apply_line_coding(port, &coding);
        }
        Ok(())
    }

    /// GET_LINE_CODING.
    #[must_use]
    pub fn line_coding(&self, port: usize) -> LineCoding {
        self.ports[port].coding
    }

    /* Event entry points */

    pub fn handle_usart_event<H: Hal>(
        &mut self,
        hal: &mut H,
        cfg: &DeviceConfig,
        port: usize,
        event: UsartEvent,
    ) {
        if !self.started {
            return;
        }
        match event {
            UsartEvent::Idle => self.rx_resync(hal, cfg, port),
            UsartEvent::ParityError => self.note_error(hal, port, SerialState::PARITY),
            UsartEvent::Overrun => self.note_error(hal, port, SerialState::OVERRUN),
        }
    }

    pub fn handle_dma_event<H: Hal>(
        &mut self,
        hal: &mut H,
        cfg: &DeviceConfig,
        port: usize,
        direction: DmaDirection,
        _event: DmaEvent,
    ) {
        if !self.started {
            return;
        }
        match direction {
            DmaDirection::Rx => self.rx_resync(hal, cfg, port),
            DmaDirection::Tx => self.tx_complete(hal, cfg, port),
        }
    }

    /// Bulk OUT data arrived for a bridged port.
    pub fn usb_data_received<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        let ep = DATA_ENDPOINTS[port];
        let st = &mut self.ports[port];
        let waiting = hal.out_len(ep);
        // Do not accept data until a pending line-coding change completes.
        if st.tx.space() < waiting || st.coding_change_pending {
            st.pending_rx_ep = Some(ep);
        } else {
            drain_out_ep(st, hal, ep);
            self.start_tx(hal, port);
            self.update_txa(hal, cfg, port);
        }
    }

    /// Bulk IN transmission finished; opportunistically refill.
    pub fn usb_data_sent<H: Hal>(&mut self, hal: &mut H, port: usize) {
        self.flush_rx_to_usb(hal, port);
    }

    /// Notification endpoint events. Anything but a completed send is a
    /// protocol violation with no recovery path.
    pub fn handle_interrupt_endpoint_event<H: Hal>(
        &mut self,
        hal: &mut H,
        ep: u8,
        event: EndpointEvent,
    ) {
        let Some(port) = notify_endpoint_port(ep) else {
            return;
        };
        match event {
            EndpointEvent::DataSent => {
                if self.ports[port].notify_pending {
                    self.dispatch_notification(hal, port);
                }
            }
            EndpointEvent::DataReceived => panic!("OUT data on a notification endpoint"),
        }
    }

    /* Foreground poll */

    /// One 1 ms tick of the foreground loop: flush retries, the 20 ms
    /// modem-line and config-pin scan, and notification dispatch.
    /// Returns a detected config-pin edge for the caller to act on.
    pub fn poll<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig) -> Option<ConfigModeEdge> {
        if !self.started {
            return None;
        }
        for port in 0..PORT_COUNT {
            if self.ports[port].enabled || (port == CONFIG_PORT && self.config_mode) {
                self.flush_rx_to_usb(hal, port);
            }
        }
        self.poll_ticks += 1;
        if self.poll_ticks < LINE_POLL_INTERVAL {
            return None;
        }
        self.poll_ticks = 0;
        self.scan_control_lines(hal, cfg);
        let config_active = cfg.pin_read(hal, cfg.config_pin, false);
        if config_active != self.config_mode {
            Some(if config_active {
                ConfigModeEdge::Enter
            } else {
                ConfigModeEdge::Leave
            })
        } else {
            None
        }
    }

    fn scan_control_lines<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig) {
        for port in 0..PORT_COUNT {
            if !self.ports[port].enabled {
                continue;
            }
            let mut lines = SerialState::NONE;
            lines.set(
                SerialState::DSR,
                cfg.role_read(hal, port, PinRole::Dsr, false),
            );
            lines.set(
                SerialState::DCD,
                cfg.role_read(hal, port, PinRole::Dcd, false),
            );
            lines.set(
                SerialState::RI,
                cfg.role_read(hal, port, PinRole::Ri, false),
            );
            merge_state(
                &self.ports[port].serial_state,
                SerialState::LINES.raw(),
                lines.raw(),
            );
            self.dispatch_notification(hal, port);
        }
    }

    /* Serial state notifications */

    fn note_error<H: Hal>(&mut self, hal: &mut H, port: usize, bits: SerialState) {
        merge_state(&self.ports[port].serial_state, 0, bits.raw());
        self.dispatch_notification(hal, port);
    }

    /// Send the live state if it differs from what the host last saw.
    /// Coalesced: while the endpoint is busy the newest state wins and a
    /// single send happens once the endpoint frees. Transient error bits
    /// are cleared from both views after a successful send.
    fn dispatch_notification<H: Hal>(&mut self, hal: &mut H, port: usize) {
        let st = &mut self.ports[port];
        let live = st.serial_state.load(Ordering::Relaxed);
        if live == st.reported_state {
            st.notify_pending = false;
            return;
        }
        let ep = NOTIFY_ENDPOINTS[port];
        if hal.in_space(ep) < notification::SERIAL_STATE_SIZE {
            st.notify_pending = true;
            return;
        }
        let note = notification::serial_state(COMM_INTERFACES[port], SerialState(live));
        let sent = UsbOps::write(hal, ep, &note);
        if sent != notification::SERIAL_STATE_SIZE {
            panic!("short serial-state notification");
        }
        st.reported_state = live & !SerialState::IRREGULAR.raw();
        merge_state(&st.serial_state, SerialState::IRREGULAR.raw(), 0);
        st.notify_pending = false;
    }

    /* RX direction: receiver -> rx ring -> bulk IN */

    /// Resynchronize the RX ring head with the receiver's write position.
    /// The position is authoritative; a position implying fewer unread
    /// bytes than the ring already held means the receiver lapped the
    /// consumer, which is data loss.
    fn rx_resync<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        if !self.ports[port].enabled {
            return;
        }
        let pos = {
            let st = &mut self.ports[port];
            hal.rx_sync(port, &mut st.rx)
        };
        let st = &mut self.ports[port];
        let held = st.rx.len();
        let fresh = RingBuffer::<CDC_BUF_SIZE>::count_between(pos, st.rx.tail());
        if fresh >= held {
            st.rx.set_head(pos);
            self.update_rts(hal, cfg, port);
            self.flush_rx_to_usb(hal, port);
        } else {
            st.rx.reset_to(pos);
            self.update_rts(hal, cfg, port);
            self.note_error(hal, port, SerialState::OVERRUN);
        }
    }

    /// RTS asserts only while more than half the RX ring is free and the
    /// host asked for flow control.
    fn update_rts<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        let st = &self.ports[port];
        let active = st.rts_requested && st.rx.space() > CDC_BUF_SIZE / 2;
        cfg.role_write(hal, port, PinRole::Rts, active);
    }

    /// Push buffered RX bytes to the IN endpoint whenever it has room.
    /// A transfer that exactly fills the endpoint leaves a ZLP owing, sent
    /// once the ring is empty.
    fn flush_rx_to_usb<H: Hal>(&mut self, hal: &mut H, port: usize) {
        let ep = DATA_ENDPOINTS[port];
        let st = &mut self.ports[port];
        let available = st.rx.len();
        if available > 0 {
            let space = hal.in_space(ep);
            if space == 0 {
                return;
            }
            let n = available.min(space).min(MAX_PACKET);
            let mut buf = [0u8; MAX_PACKET];
            st.rx.peek(&mut buf[..n]);
            if st.coding.data_bits == DataBits::Seven {
                for byte in &mut buf[..n] {
                    *byte &= 0x7f;
                }
            }
            let sent = UsbOps::write(hal, ep, &buf[..n]);
            st.rx.advance_tail(sent);
            st.rx_zlp_pending = sent == space;
        } else if st.rx_zlp_pending {
            st.rx_zlp_pending = false;
            UsbOps::write(hal, ep, &[]);
        }
    }

    /* TX direction: bulk OUT -> tx ring -> transmitter */

    /// Kick the transmitter if it is idle and data is queued.
    fn start_tx<H: Hal>(&mut self, hal: &mut H, port: usize) {
        if hal.tx_busy(port) {
            return;
        }
        let st = &mut self.ports[port];
        let span = st.tx.read_span();
        if span.is_empty() {
            return;
        }
        let accepted = hal.tx_start(port, span);
        st.last_dma_tx = accepted;
    }

    /// Transmit-activity indicator: on while data is queued or in flight.
    fn update_txa<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        let st = &self.ports[port];
        let active = st.last_dma_tx > 0 || !st.tx.is_empty();
        cfg.role_write(hal, port, PinRole::Txa, active);
    }

    /// Transmit transfer finished: consume it, apply a deferred line
    /// coding once drained, then refill from a pending endpoint and re-arm.
    fn tx_complete<H: Hal>(&mut self, hal: &mut H, cfg: &DeviceConfig, port: usize) {
        {
            let st = &mut self.ports[port];
            let done = st.last_dma_tx;
            st.tx.advance_tail(done);
            st.last_dma_tx = 0;
        }
        if self.ports[port].coding_change_pending {
            if !self.ports[port].tx.is_empty() {
                self.start_tx(hal, port);
                return;
            }
            let coding = self.ports[port].coding;
            hal.apply_line_coding(port, &coding);
            self.ports[port].coding_change_pending = false;
        }
        if let Some(ep) = self.ports[port].pending_rx_ep {
            let st = &mut self.ports[port];
            if st.tx.space() >= hal.out_len(ep) {
                drain_out_ep(st, hal, ep);
                st.pending_rx_ep = None;
            }
        }
        if !(port == CONFIG_PORT && self.config_mode) {
            self.start_tx(hal, port);
        }
        self.update_txa(hal, cfg, port);
    }

    /* Configuration mode */

    /// Divert the config port to the shell: both rings become the shell's
    /// pipe, the receiver stops.
    pub fn enter_config_mode<H: Hal>(&mut self, hal: &mut H) {
        let st = &mut self.ports[CONFIG_PORT];
        st.rx.clear();
        st.tx.clear();
        hal.set_receiver(CONFIG_PORT, false);
        self.config_mode = true;
    }

    /// Hand the config port back to the bridge. The RX ring resumes at the
    /// receiver's current position so bytes arriving right after the
    /// switch are kept.
    pub fn leave_config_mode<H: Hal>(&mut self, hal: &mut H) {
        let pos = {
            let st = &mut self.ports[CONFIG_PORT];
            hal.rx_sync(CONFIG_PORT, &mut st.rx)
        };
        let st = &mut self.ports[CONFIG_PORT];
        st.rx.reset_to(pos);
        st.tx.clear();
        hal.set_receiver(CONFIG_PORT, true);
        self.config_mode = false;
    }

    /* Shell funnel (config port only) */

    /// Pull waiting USB OUT data into the shell's input pipe. The shell
    /// consumes the pipe before the next packet can arrive; running out of
    /// room here is a protocol-state corruption.
    pub fn shell_ingest_usb<H: Hal>(&mut self, hal: &mut H) {
        let ep = DATA_ENDPOINTS[CONFIG_PORT];
        let st = &mut self.ports[CONFIG_PORT];
        if hal.out_len(ep) <= st.tx.space() {
            drain_out_ep(st, hal, ep);
        } else {
            panic!("shell input overflow");
        }
    }

    /// Drain buffered shell input.
    pub fn shell_take_input(&mut self, buf: &mut [u8]) -> usize {
        self.ports[CONFIG_PORT].tx.pop(buf)
    }

    /// Shell output rides the normal RX flush path to the host; oldest
    /// output is overwritten if the host is not draining.
    pub fn shell_write<H: Hal>(&mut self, hal: &mut H, bytes: &[u8]) {
        self.ports[CONFIG_PORT].rx.push_overwrite(bytes);
        self.flush_rx_to_usb(hal, CONFIG_PORT);
    }
}

impl Default for CdcEngine {
    fn default() -> Self {
        Self::new()
    }
}
