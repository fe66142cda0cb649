//! Top-level device context: configuration, bridge engine and shell,
//! explicitly passed everywhere so nothing hides in statics.

use cdc_proto::{CodingError, ControlLineState, LineCoding};

use crate::commands;
use crate::commands::Response;
use crate::config::{ConfigFlash, DeviceConfig, LoadSource};
use crate::engine::{
    data_endpoint_port, notify_endpoint_port, CdcEngine, ConfigModeEdge, DmaDirection, DmaEvent,
    EndpointEvent, UsartEvent, CONFIG_PORT,
};
use crate::hal::Hal;
use crate::pin::{PinId, PinRole, PinStatus};
use crate::shell::{Echo, Shell, ShellEvent, PROMPT, SHELL_LINE_MAX};

/// Result of a pin status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusChange {
    /// Already at the requested status.
    Unchanged,
    Applied,
    /// The change completed a port's RX/TX pair; the port came up.
    PortEnabled(usize),
    /// The change broke a port's RX/TX pair; the port went down and all of
    /// its pins were freed.
    PortDisabled(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinStatusError {
    /// Blocked pins never change status.
    Blocked,
    /// Only `free` and `occupied` are reachable at runtime.
    InvalidTarget,
}

/// A control request the device cannot honor; the caller answers STALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRejected;

impl From<CodingError> for ControlRejected {
    fn from(_: CodingError) -> Self {
        ControlRejected
    }
}

/// Change a pin's status, cascading into port enablement.
///
/// The load-bearing invariant: a port is enabled iff both its RX and TX
/// pins are occupied. Occupying one of the pair arms it; freeing either
/// while the port runs takes the whole port down and frees every pin it
/// owned.
pub fn set_pin_status<H: Hal>(
    config: &mut DeviceConfig,
    engine: &mut CdcEngine,
    hal: &mut H,
    pin: PinId,
    status: PinStatus,
) -> Result<StatusChange, PinStatusError> {
    let current = config.status(pin);
    if current == PinStatus::Blocked {
        return Err(PinStatusError::Blocked);
    }
    if status == PinStatus::Blocked {
        return Err(PinStatusError::InvalidTarget);
    }
    if status == current {
        return Ok(StatusChange::Unchanged);
    }
    config.pin_mut(pin).status = status;
    let data_role = match config.find_role(pin) {
        Some((port, PinRole::Rx | PinRole::Tx)) => Some(port),
        Some(_) | None => None,
    };
    if let Some(port) = data_role {
        if status == PinStatus::Occupied {
            config.pin_init(hal, Some(pin));
            if CdcEngine::port_pins_ready(config, port) {
                engine.enable_port(hal, config, port);
                return Ok(StatusChange::PortEnabled(port));
            }
        } else if engine.port(port).enabled() {
            engine.disable_port(hal, port);
            for role in PinRole::ALL {
                if let Some(owned) = config.cdc[port].get(role) {
                    if config.status(owned) == PinStatus::Occupied {
                        config.pin_mut(owned).status = PinStatus::Free;
                        hal.release(owned);
                    }
                }
            }
            return Ok(StatusChange::PortDisabled(port));
        }
        return Ok(StatusChange::Applied);
    }
    if status == PinStatus::Occupied {
        config.pin_init(hal, Some(pin));
    } else {
        hal.release(pin);
    }
    Ok(StatusChange::Applied)
}

/// The device: everything the firmware's event sources act on.
pub struct Device {
    pub config: DeviceConfig,
    pub engine: CdcEngine,
    shell: Shell,
    response: Response,
}

impl Device {
    #[must_use]
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            engine: CdcEngine::new(),
            shell: Shell::new(),
            response: Response::new(),
        }
    }

    /// Boot path: configuration from flash or factory defaults.
    pub fn from_flash<F: ConfigFlash>(flash: &mut F) -> (Self, LoadSource) {
        let (config, source) = DeviceConfig::load(flash);
        (Self::new(config), source)
    }

    /// Apply the loaded configuration to every occupied pin. Ports come up
    /// later, when the host configures the USB device.
    pub fn init_hardware<H: Hal>(&mut self, hal: &mut H) {
        for pin in PinId::ALL {
            if self.config.status(pin) == PinStatus::Occupied {
                self.config.pin_init(hal, Some(pin));
            }
        }
        self.config.pin_write(hal, self.config.status_led, false);
    }

    pub fn set_status_led<H: Hal>(&mut self, hal: &mut H, on: bool) {
        self.config.pin_write(hal, self.config.status_led, on);
    }

    /* USB device lifecycle */

    pub fn usb_reset(&mut self) {
        self.engine.reset();
    }

    pub fn usb_configured<H: Hal>(&mut self, hal: &mut H) {
        self.engine.configured(hal, &self.config);
        self.config.pin_write(hal, self.config.status_led, true);
    }

    pub fn usb_suspend<H: Hal>(&mut self, hal: &mut H) {
        self.engine.suspend(hal);
        self.config.pin_write(hal, self.config.status_led, false);
    }

    /* Interrupt-context event entry points */

    pub fn handle_usart_event<H: Hal>(&mut self, hal: &mut H, port: usize, event: UsartEvent) {
        self.engine.handle_usart_event(hal, &self.config, port, event);
    }

    pub fn handle_dma_event<H: Hal>(
        &mut self,
        hal: &mut H,
        port: usize,
        direction: DmaDirection,
        event: DmaEvent,
    ) {
        self.engine
            .handle_dma_event(hal, &self.config, port, direction, event);
    }

    /// Endpoint events, with the config port's shell diversion.
    pub fn handle_endpoint_event<H: Hal, F: ConfigFlash>(
        &mut self,
        hal: &mut H,
        flash: &mut F,
        ep: u8,
        event: EndpointEvent,
    ) {
        if let Some(port) = data_endpoint_port(ep) {
            match event {
                EndpointEvent::DataReceived => {
                    if port == CONFIG_PORT && self.engine.config_mode() {
                        self.shell_pump(hal, flash);
                    } else {
                        self.engine.usb_data_received(hal, &self.config, port);
                    }
                }
                EndpointEvent::DataSent => self.engine.usb_data_sent(hal, port),
            }
        } else if notify_endpoint_port(ep).is_some() {
            self.engine.handle_interrupt_endpoint_event(hal, ep, event);
        }
    }

    /* Control requests */

    pub fn set_line_coding<H: Hal>(
        &mut self,
        hal: &mut H,
        interface: u8,
        payload: &[u8],
    ) -> Result<(), ControlRejected> {
        let port = crate::engine::interface_port(interface).ok_or(ControlRejected)?;
        let requested = LineCoding::parse(payload)?;
        self.engine
            .set_line_coding(hal, port, &requested)
            .map_err(|_| ControlRejected)
    }

    #[must_use]
    pub fn get_line_coding(&self, interface: u8) -> Option<[u8; 7]> {
        let port = crate::engine::interface_port(interface)?;
        Some(self.engine.line_coding(port).encode())
    }

    pub fn set_control_line_state<H: Hal>(
        &mut self,
        hal: &mut H,
        interface: u8,
        value: u16,
    ) -> Result<(), ControlRejected> {
        let port = crate::engine::interface_port(interface).ok_or(ControlRejected)?;
        self.engine
            .set_control_line_state(hal, &self.config, port, ControlLineState(value));
        Ok(())
    }

    /* Foreground */

    /// One 1 ms foreground tick; acts on config-pin edges.
    pub fn poll<H: Hal>(&mut self, hal: &mut H) {
        match self.engine.poll(hal, &self.config) {
            Some(ConfigModeEdge::Enter) => {
                self.engine.enter_config_mode(hal);
                self.shell.reset();
                self.engine.shell_write(hal, Shell::banner().as_bytes());
            }
            Some(ConfigModeEdge::Leave) => self.engine.leave_config_mode(hal),
            None => {}
        }
    }

    pub fn set_pin_status<H: Hal>(
        &mut self,
        hal: &mut H,
        pin: PinId,
        status: PinStatus,
    ) -> Result<StatusChange, PinStatusError> {
        set_pin_status(&mut self.config, &mut self.engine, hal, pin, status)
    }

    /* Shell plumbing */

    fn shell_pump<H: Hal, F: ConfigFlash>(&mut self, hal: &mut H, flash: &mut F) {
        self.engine.shell_ingest_usb(hal);
        let mut chunk = [0u8; 64];
        loop {
            let n = self.engine.shell_take_input(&mut chunk);
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                let mut echo = Echo::new();
                let event = self.shell.feed(byte, &mut echo);
                if !echo.is_empty() {
                    self.engine.shell_write(hal, &echo);
                }
                if event == ShellEvent::LineReady {
                    let mut line = [0u8; SHELL_LINE_MAX];
                    let len = self.shell.take_line(&mut line);
                    self.run_line(hal, flash, &line[..len]);
                }
            }
        }
    }

    fn run_line<H: Hal, F: ConfigFlash>(&mut self, hal: &mut H, flash: &mut F, line: &[u8]) {
        let Ok(text) = core::str::from_utf8(line) else {
            return;
        };
        self.response.clear();
        commands::execute(
            text,
            &mut self.config,
            &mut self.engine,
            hal,
            flash,
            &mut self.response,
        );
        self.response.push_str(PROMPT);
        let Device {
            engine, response, ..
        } = self;
        engine.shell_write(hal, response.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::engine::{DATA_ENDPOINTS, LINE_POLL_INTERVAL};
    use crate::mock::{MockFlash, MockHal};
    use crate::pin::OutputDrive;

    fn device_up(hal: &mut MockHal) -> Device {
        let mut device = Device::new(DeviceConfig::factory_default());
        device.init_hardware(hal);
        device.usb_configured(hal);
        hal.clear_records();
        device
    }

    #[test]
    fn test_port_enabled_iff_rx_and_tx_occupied() {
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        assert!(device.engine.port(1).enabled());
        // free the RX pin: the whole port comes down
        let change = device
            .set_pin_status(&mut hal, PinId::Pa3, PinStatus::Free)
            .unwrap();
        assert_eq!(change, StatusChange::PortDisabled(1));
        assert!(!device.engine.port(1).enabled());
        // every pin the port owned is free now
        for role in PinRole::ALL {
            let pin = device.config.cdc[1].get(role).unwrap();
            assert_eq!(device.config.status(pin), PinStatus::Free, "{}", pin.as_str());
        }
        // occupying RX alone must not enable the port
        let change = device
            .set_pin_status(&mut hal, PinId::Pa3, PinStatus::Occupied)
            .unwrap();
        assert_eq!(change, StatusChange::Applied);
        assert!(!device.engine.port(1).enabled());
        // completing the pair does
        let change = device
            .set_pin_status(&mut hal, PinId::Pa2, PinStatus::Occupied)
            .unwrap();
        assert_eq!(change, StatusChange::PortEnabled(1));
        assert!(device.engine.port(1).enabled());
    }

    #[test]
    fn test_blocked_pin_status_is_immutable() {
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        assert_eq!(
            device.set_pin_status(&mut hal, PinId::Pa12, PinStatus::Free),
            Err(PinStatusError::Blocked)
        );
        assert_eq!(
            device.set_pin_status(&mut hal, PinId::Pc14, PinStatus::Blocked),
            Err(PinStatusError::InvalidTarget)
        );
    }

    #[test]
    fn test_same_status_is_a_noop() {
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        assert_eq!(
            device.set_pin_status(&mut hal, PinId::Pc14, PinStatus::Free),
            Ok(StatusChange::Unchanged)
        );
    }

    #[test]
    fn test_freeing_non_data_role_keeps_port_running() {
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        let change = device
            .set_pin_status(&mut hal, PinId::Pa1, PinStatus::Free) // uart1 rts
            .unwrap();
        assert_eq!(change, StatusChange::Applied);
        assert!(device.engine.port(1).enabled());
        assert_eq!(hal.released_pins, [PinId::Pa1]);
    }

    #[test]
    fn test_control_requests_route_by_interface() {
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        // interface 2 is port 1's communication interface
        device
            .set_line_coding(&mut hal, 2, &[0x00, 0xc2, 0x01, 0x00, 0, 0, 8])
            .unwrap();
        assert_eq!(device.engine.line_coding(1).rate, 115_200);
        assert_eq!(
            device.get_line_coding(2),
            Some([0x00, 0xc2, 0x01, 0x00, 0, 0, 8])
        );
        // malformed payload stalls
        assert!(device.set_line_coding(&mut hal, 2, &[1, 2, 3]).is_err());
        // unknown interface stalls
        assert!(device.set_line_coding(&mut hal, 9, &[0; 7]).is_err());
        device.set_control_line_state(&mut hal, 2, 0b11).unwrap();
    }

    fn shell_command(device: &mut Device, hal: &mut MockHal, flash: &mut MockFlash, line: &[u8]) {
        hal.queue_out(DATA_ENDPOINTS[CONFIG_PORT], line);
        device.handle_endpoint_event(
            hal,
            flash,
            DATA_ENDPOINTS[CONFIG_PORT],
            EndpointEvent::DataReceived,
        );
    }

    #[test]
    fn test_shell_config_change_survives_reboot() {
        let mut flash = MockFlash::new();
        let mut hal = MockHal::new();
        let (mut device, source) = Device::from_flash(&mut flash);
        assert_eq!(source, LoadSource::Defaults);
        device.init_hardware(&mut hal);
        device.usb_configured(&mut hal);

        // jumper pulls the config pin low; the scan flips to shell mode
        hal.pin_levels[PinId::Pb5.index()] = false;
        for _ in 0..LINE_POLL_INTERVAL {
            device.poll(&mut hal);
        }
        assert!(device.engine.config_mode());

        shell_command(&mut device, &mut hal, &mut flash, b"uart 1 tx output od\r");
        shell_command(&mut device, &mut hal, &mut flash, b"config save\r");
        assert_eq!(flash.writes, 1);

        // simulated reboot
        let (rebooted, source) = Device::from_flash(&mut flash);
        assert_eq!(source, LoadSource::Page(0));
        let tx = rebooted.config.cdc[1].get(PinRole::Tx).unwrap();
        assert_eq!(rebooted.config.pin(tx).output, OutputDrive::OpenDrain);
    }

    #[test]
    fn test_shell_banner_and_echo_reach_the_host() {
        let mut flash = MockFlash::new();
        let mut hal = MockHal::new();
        let mut device = device_up(&mut hal);
        hal.pin_levels[PinId::Pb5.index()] = false;
        for _ in 0..LINE_POLL_INTERVAL {
            device.poll(&mut hal);
        }
        let banner: std::vec::Vec<u8> = hal
            .in_packets
            .iter()
            .filter(|(ep, _)| *ep == DATA_ENDPOINTS[0])
            .flat_map(|(_, data)| data.iter().copied())
            .collect();
        let banner = std::string::String::from_utf8(banner).unwrap();
        assert!(banner.contains("triple-serial"));

        hal.in_packets.clear();
        hal.complete_in(DATA_ENDPOINTS[0]);
        shell_command(&mut device, &mut hal, &mut flash, b"version\r");
        // the host keeps collecting packets until the shell pipe drains
        for _ in 0..64 {
            hal.complete_in(DATA_ENDPOINTS[0]);
            device.handle_endpoint_event(
                &mut hal,
                &mut flash,
                DATA_ENDPOINTS[0],
                EndpointEvent::DataSent,
            );
        }
        let replies: std::vec::Vec<u8> = hal
            .in_packets
            .iter()
            .filter(|(ep, _)| *ep == DATA_ENDPOINTS[0])
            .flat_map(|(_, data)| data.iter().copied())
            .collect();
        let replies = std::string::String::from_utf8(replies).unwrap();
        assert!(replies.contains("version"), "echo: {replies}");
    }
}
