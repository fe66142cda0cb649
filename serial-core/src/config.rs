//! Device configuration: the single source of truth for pin assignment,
//! plus its flash persistence contract.
//!
//! The configuration is loaded once at boot (from a valid flash page, else
//! factory defaults), held in RAM, and written back only on explicit save.
//! Interrupt-context readers tolerate a slightly stale view but never a torn
//! one: updates replace whole values, never patch multi-byte fields in
//! place.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::engine::PORT_COUNT;
use crate::hal::PinOps;
use crate::pin::{
    Direction, Function, OutputDrive, PinConfig, PinId, PinRole, PinStatus, Polarity, PortPins,
    Pull, Slew,
};

/// Runtime pin and port assignment of the whole device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Role-to-pin binding of each CDC port.
    pub cdc: [PortPins; PORT_COUNT],
    /// Electrical configuration and status of every logical pin.
    pub pins: [PinConfig; PinId::COUNT],
    pub status_led: Option<PinId>,
    pub config_pin: Option<PinId>,
}

struct BlockedPin {
    pin: PinId,
    reason: &'static str,
}

/// Pins the hardware itself spoke for.
const BLOCKED_PINS: &[BlockedPin] = &[
    BlockedPin {
        pin: PinId::Pa11,
        reason: "usb dm",
    },
    BlockedPin {
        pin: PinId::Pa12,
        reason: "usb dp",
    },
    BlockedPin {
        pin: PinId::Pa13,
        reason: "debug swdio",
    },
    BlockedPin {
        pin: PinId::Pa14,
        reason: "debug swclk",
    },
    BlockedPin {
        pin: PinId::Pb2,
        reason: "boot control",
    },
];

/// (role, pin, config) rows of the factory port maps.
type RoleRow = (PinRole, PinId, PinConfig);

const fn uart_rx(pin: PinId) -> RoleRow {
    (PinRole::Rx, pin, PinConfig::input(Pull::Up, Polarity::High))
}

const fn uart_tx(pin: PinId) -> RoleRow {
    (
        PinRole::Tx,
        pin,
        PinConfig::output(Function::Alternate, OutputDrive::PushPull, Polarity::High),
    )
}

const fn out_low(role: PinRole, pin: PinId) -> RoleRow {
    (
        role,
        pin,
        PinConfig::output(Function::General, OutputDrive::PushPull, Polarity::Low),
    )
}

const fn in_low(role: PinRole, pin: PinId) -> RoleRow {
    (role, pin, PinConfig::input(Pull::Up, Polarity::Low))
}

const fn cts(pin: PinId) -> RoleRow {
    (
        PinRole::Cts,
        pin,
        PinConfig::input(Pull::Down, Polarity::Low),
    )
}

const fn txa(pin: PinId) -> RoleRow {
    (
        PinRole::Txa,
        pin,
        PinConfig::output(Function::General, OutputDrive::PushPull, Polarity::High),
    )
}

const FACTORY_PORTS: [[RoleRow; 9]; PORT_COUNT] = [
    [
        uart_rx(PinId::Pa10),
        uart_tx(PinId::Pa9),
        out_low(PinRole::Rts, PinId::Pa15),
        cts(PinId::Pa11), // stays blocked: shared with USB D-
        in_low(PinRole::Dsr, PinId::Pb7),
        out_low(PinRole::Dtr, PinId::Pa4),
        in_low(PinRole::Dcd, PinId::Pb15),
        in_low(PinRole::Ri, PinId::Pb3),
        txa(PinId::Pb0),
    ],
    [
        uart_rx(PinId::Pa3),
        uart_tx(PinId::Pa2),
        out_low(PinRole::Rts, PinId::Pa1),
        cts(PinId::Pa0),
        in_low(PinRole::Dsr, PinId::Pb4),
        out_low(PinRole::Dtr, PinId::Pa5),
        in_low(PinRole::Dcd, PinId::Pb8),
        in_low(PinRole::Ri, PinId::Pb12),
        txa(PinId::Pb1),
    ],
    [
        uart_rx(PinId::Pb11),
        uart_tx(PinId::Pb10),
        out_low(PinRole::Rts, PinId::Pb14),
        cts(PinId::Pb13),
        in_low(PinRole::Dsr, PinId::Pb6),
        out_low(PinRole::Dtr, PinId::Pa6),
        in_low(PinRole::Dcd, PinId::Pb9),
        in_low(PinRole::Ri, PinId::Pa8),
        txa(PinId::Pa7),
    ],
];

impl DeviceConfig {
    /// The compiled-in configuration used when no valid flash page exists.
    #[must_use]
    pub fn factory_default() -> Self {
        let mut config = Self {
            cdc: [PortPins::unassigned(); PORT_COUNT],
            pins: [PinConfig::free(); PinId::COUNT],
            status_led: None,
            config_pin: None,
        };
        for blocked in BLOCKED_PINS {
            config.pins[blocked.pin.index()] = PinConfig::blocked();
        }
        let mut led = PinConfig::output(Function::General, OutputDrive::OpenDrain, Polarity::Low);
        led.speed = Slew::Low;
        config.status_led = config.assign(PinId::Pc13, led);
        config.config_pin = config.assign(PinId::Pb5, PinConfig::input(Pull::Up, Polarity::Low));
        for (port, rows) in FACTORY_PORTS.iter().enumerate() {
            for (role, pin, cfg) in rows {
                let assigned = config.assign(*pin, *cfg);
                config.cdc[port].set(*role, assigned);
            }
        }
        config
    }

    /// Bind a pin, unless the hardware already blocked it. Blocked pins keep
    /// their binding (so reverse lookup still names them) but never their
    /// electrical config.
    fn assign(&mut self, pin: PinId, cfg: PinConfig) -> Option<PinId> {
        let slot = &mut self.pins[pin.index()];
        if slot.status != PinStatus::Blocked {
            *slot = cfg;
        }
        Some(pin)
    }

    #[inline]
    #[must_use]
    pub fn pin(&self, pin: PinId) -> &PinConfig {
        &self.pins[pin.index()]
    }

    #[inline]
    pub fn pin_mut(&mut self, pin: PinId) -> &mut PinConfig {
        &mut self.pins[pin.index()]
    }

    #[inline]
    #[must_use]
    pub fn status(&self, pin: PinId) -> PinStatus {
        self.pins[pin.index()].status
    }

    /// Which CDC port and role a pin is bound to, if any.
    #[must_use]
    pub fn find_role(&self, pin: PinId) -> Option<(usize, PinRole)> {
        for (port, pins) in self.cdc.iter().enumerate() {
            for role in PinRole::ALL {
                if pins.get(role) == Some(pin) {
                    return Some((port, role));
                }
            }
        }
        None
    }

    /// Resolve a pin name or one of the device aliases.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Option<PinId> {
        let mut lowered = [0u8; 8];
        let bytes = name.as_bytes();
        if bytes.len() <= lowered.len() {
            for (dst, src) in lowered.iter_mut().zip(bytes) {
                *dst = src.to_ascii_lowercase();
            }
            match &lowered[..bytes.len()] {
                b"led" => return self.status_led,
                b"config" | b"shell" | b"control" => return self.config_pin,
                _ => {}
            }
        }
        PinId::from_name(name)
    }

    /// Why a pin is permanently excluded from reassignment.
    #[must_use]
    pub fn blocked_reason(pin: PinId) -> Option<&'static str> {
        BLOCKED_PINS
            .iter()
            .find(|b| b.pin == pin)
            .map(|b| b.reason)
    }

    /// Apply a pin's electrical configuration to hardware. No-op unless the
    /// pin is assigned and occupied.
    pub fn pin_init<P: PinOps>(&self, hal: &mut P, pin: Option<PinId>) {
        let Some(pin) = pin else { return };
        let cfg = self.pin(pin);
        if cfg.status == PinStatus::Occupied {
            hal.configure(pin, cfg);
        }
    }

    /// Drive an occupied pin by active state; no-op otherwise.
    pub fn pin_write<P: PinOps>(&self, hal: &mut P, pin: Option<PinId>, active: bool) {
        let Some(pin) = pin else { return };
        let cfg = self.pin(pin);
        if cfg.status == PinStatus::Occupied {
            hal.write(pin, cfg.level_for(active));
        }
    }

    /// Sample an occupied pin as an active state; `default` otherwise.
    pub fn pin_read<P: PinOps>(&self, hal: &mut P, pin: Option<PinId>, default: bool) -> bool {
        let Some(pin) = pin else { return default };
        let cfg = self.pin(pin);
        if cfg.status != PinStatus::Occupied {
            return default;
        }
        cfg.active_from(hal.read(pin))
    }

    /// Drive a *free* pin (the GPIO playground path); occupied pins belong
    /// to their function and are not writable here.
    pub fn pin_write_free<P: PinOps>(&self, hal: &mut P, pin: Option<PinId>, active: bool) {
        let Some(pin) = pin else { return };
        let cfg = self.pin(pin);
        if cfg.status == PinStatus::Free {
            hal.write(pin, cfg.level_for(active));
        }
    }

    /// Sample a free or occupied pin; `default` for blocked/unassigned.
    pub fn pin_read_free<P: PinOps>(&self, hal: &mut P, pin: Option<PinId>, default: bool) -> bool {
        let Some(pin) = pin else { return default };
        let cfg = self.pin(pin);
        match cfg.status {
            PinStatus::Free | PinStatus::Occupied => cfg.active_from(hal.read(pin)),
            PinStatus::Blocked => default,
        }
    }

    /// Drive a CDC port signal by role.
    pub fn role_write<P: PinOps>(&self, hal: &mut P, port: usize, role: PinRole, active: bool) {
        self.pin_write(hal, self.cdc[port].get(role), active);
    }

    /// Sample a CDC port signal by role.
    pub fn role_read<P: PinOps>(
        &self,
        hal: &mut P,
        port: usize,
        role: PinRole,
        default: bool,
    ) -> bool {
        self.pin_read(hal, self.cdc[port].get(role), default)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::factory_default()
    }
}

/* Flash persistence */

/// Magic number marking a valid configuration page.
pub const CONFIG_MAGIC: u32 = u32::from_le_bytes(*b"TSP1");

/// Serialized configuration size: magic + distinguished pins + port maps +
/// pin table + CRC-32 trailer, padded to a multiple of 4 for flash
/// programming alignment.
pub const CONFIG_BLOB_SIZE: usize = 288;

const PIN_NONE: u8 = 0xff;
const PIN_CFG_SIZE: usize = 7;
const CRC_OFFSET: usize = CONFIG_BLOB_SIZE - 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Number of flash pages the configuration alternates across.
pub const CONFIG_PAGES: usize = 2;

/// Flash write failure. The implementor owns busy-wait bounds and surfaces
/// a stuck controller here instead of hanging the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashError;

/// Two-page configuration storage contract.
///
/// A page is valid iff its magic matches and the CRC over all preceding
/// bytes matches. Saving writes the *other* page and then zeroes the old
/// page's magic; pages are only erased when rewritten, never in place.
pub trait ConfigFlash {
    fn read(&mut self, page: usize, buf: &mut [u8; CONFIG_BLOB_SIZE]);
    fn write(&mut self, page: usize, blob: &[u8; CONFIG_BLOB_SIZE]) -> Result<(), FlashError>;
    /// Zero the page's magic without erasing the rest.
    fn invalidate(&mut self, page: usize) -> Result<(), FlashError>;
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadSource {
    Page(usize),
    Defaults,
}

/// A blob that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlobError {
    Magic,
    Crc,
    Value,
}

fn encode_pin(pin: Option<PinId>) -> u8 {
    pin.map_or(PIN_NONE, |p| p.index() as u8)
}

fn decode_pin(raw: u8) -> Result<Option<PinId>, BlobError> {
    if raw == PIN_NONE {
        return Ok(None);
    }
    PinId::from_index(raw as usize)
        .map(Some)
        .ok_or(BlobError::Value)
}

fn encode_pin_cfg(cfg: &PinConfig) -> [u8; PIN_CFG_SIZE] {
    [
        cfg.dir as u8,
        cfg.func as u8,
        cfg.output as u8,
        cfg.pull as u8,
        cfg.polarity as u8,
        cfg.speed as u8,
        cfg.status as u8,
    ]
}

fn decode_pin_cfg(raw: &[u8]) -> Result<PinConfig, BlobError> {
    let dir = match raw[0] {
        0 => Direction::Input,
        1 => Direction::Output,
        _ => return Err(BlobError::Value),
    };
    let func = match raw[1] {
        0 => Function::General,
        1 => Function::Alternate,
        _ => return Err(BlobError::Value),
    };
    let output = match raw[2] {
        0 => OutputDrive::PushPull,
        1 => OutputDrive::OpenDrain,
        _ => return Err(BlobError::Value),
    };
    let pull = match raw[3] {
        0 => Pull::Floating,
        1 => Pull::Up,
        2 => Pull::Down,
        _ => return Err(BlobError::Value),
    };
    let polarity = match raw[4] {
        0 => Polarity::High,
        1 => Polarity::Low,
        _ => return Err(BlobError::Value),
    };
    let speed = match raw[5] {
        0 => Slew::Low,
        1 => Slew::Medium,
        2 => Slew::High,
        _ => return Err(BlobError::Value),
    };
    let status = match raw[6] {
        0 => PinStatus::Free,
        1 => PinStatus::Occupied,
        2 => PinStatus::Blocked,
        _ => return Err(BlobError::Value),
    };
    Ok(PinConfig {
        dir,
        func,
        output,
        pull,
        polarity,
        speed,
        status,
    })
}

impl DeviceConfig {
    /// Serialize for flash storage.
    #[must_use]
    pub fn to_blob(&self) -> [u8; CONFIG_BLOB_SIZE] {
        let mut blob = [0u8; CONFIG_BLOB_SIZE];
        blob[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
        blob[4] = encode_pin(self.status_led);
        blob[5] = encode_pin(self.config_pin);
        let mut at = 6;
        for port in &self.cdc {
            for role in PinRole::ALL {
                blob[at] = encode_pin(port.get(role));
                at += 1;
            }
            blob[at] = port.irda as u8;
            at += 1;
        }
        for cfg in &self.pins {
            blob[at..at + PIN_CFG_SIZE].copy_from_slice(&encode_pin_cfg(cfg));
            at += PIN_CFG_SIZE;
        }
        let crc = CRC32.checksum(&blob[..CRC_OFFSET]);
        blob[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        blob
    }

    /// Validate and deserialize a flash page image.
    pub fn from_blob(blob: &[u8; CONFIG_BLOB_SIZE]) -> Result<Self, BlobError> {
        let magic = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]);
        if magic != CONFIG_MAGIC {
            return Err(BlobError::Magic);
        }
        let stored = u32::from_le_bytes([
            blob[CRC_OFFSET],
            blob[CRC_OFFSET + 1],
            blob[CRC_OFFSET + 2],
            blob[CRC_OFFSET + 3],
        ]);
        if CRC32.checksum(&blob[..CRC_OFFSET]) != stored {
            return Err(BlobError::Crc);
        }
        let mut config = Self {
            cdc: [PortPins::unassigned(); PORT_COUNT],
            pins: [PinConfig::free(); PinId::COUNT],
            status_led: decode_pin(blob[4])?,
            config_pin: decode_pin(blob[5])?,
        };
        let mut at = 6;
        for port in config.cdc.iter_mut() {
            for role in PinRole::ALL {
                port.set(role, decode_pin(blob[at])?);
                at += 1;
            }
            port.irda = blob[at] != 0;
            at += 1;
        }
        for cfg in config.pins.iter_mut() {
            *cfg = decode_pin_cfg(&blob[at..at + PIN_CFG_SIZE])?;
            at += PIN_CFG_SIZE;
        }
        Ok(config)
    }

    /// Load from the first valid flash page, falling back to factory
    /// defaults.
    pub fn load<F: ConfigFlash>(flash: &mut F) -> (Self, LoadSource) {
        let mut blob = [0u8; CONFIG_BLOB_SIZE];
        for page in 0..CONFIG_PAGES {
            flash.read(page, &mut blob);
            if let Ok(config) = Self::from_blob(&blob) {
                return (config, LoadSource::Page(page));
            }
        }
        (Self::factory_default(), LoadSource::Defaults)
    }

    /// Persist: write the page the current configuration did *not* come
    /// from, then retire the old page. Returns the page written.
    pub fn save<F: ConfigFlash>(&self, flash: &mut F) -> Result<usize, FlashError> {
        let mut blob = [0u8; CONFIG_BLOB_SIZE];
        let mut active = None;
        for page in 0..CONFIG_PAGES {
            flash.read(page, &mut blob);
            if Self::from_blob(&blob).is_ok() {
                active = Some(page);
                break;
            }
        }
        let target = match active {
            Some(page) => (page + 1) % CONFIG_PAGES,
            None => 0,
        };
        flash.write(target, &self.to_blob())?;
        if let Some(old) = active {
            flash.invalidate(old)?;
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFlash;

    #[test]
    fn test_factory_default_port_map() {
        let config = DeviceConfig::factory_default();
        assert_eq!(config.cdc[0].get(PinRole::Rx), Some(PinId::Pa10));
        assert_eq!(config.cdc[0].get(PinRole::Tx), Some(PinId::Pa9));
        assert_eq!(config.cdc[1].get(PinRole::Rts), Some(PinId::Pa1));
        assert_eq!(config.cdc[2].get(PinRole::Dcd), Some(PinId::Pb9));
        assert_eq!(config.status_led, Some(PinId::Pc13));
        assert_eq!(config.config_pin, Some(PinId::Pb5));
    }

    #[test]
    fn test_factory_default_blocks_system_pins() {
        let config = DeviceConfig::factory_default();
        for pin in [PinId::Pa11, PinId::Pa12, PinId::Pa13, PinId::Pa14, PinId::Pb2] {
            assert_eq!(config.status(pin), PinStatus::Blocked);
        }
        // the blocked CTS binding survives but the pin stays blocked
        assert_eq!(config.cdc[0].get(PinRole::Cts), Some(PinId::Pa11));
        assert_eq!(DeviceConfig::blocked_reason(PinId::Pb2), Some("boot control"));
        assert_eq!(DeviceConfig::blocked_reason(PinId::Pa0), None);
    }

    #[test]
    fn test_find_role() {
        let config = DeviceConfig::factory_default();
        assert_eq!(config.find_role(PinId::Pa3), Some((1, PinRole::Rx)));
        assert_eq!(config.find_role(PinId::Pb10), Some((2, PinRole::Tx)));
        assert_eq!(config.find_role(PinId::Pc14), None);
    }

    #[test]
    fn test_resolve_name_aliases() {
        let config = DeviceConfig::factory_default();
        assert_eq!(config.resolve_name("led"), Some(PinId::Pc13));
        assert_eq!(config.resolve_name("LED"), Some(PinId::Pc13));
        assert_eq!(config.resolve_name("config"), Some(PinId::Pb5));
        assert_eq!(config.resolve_name("shell"), Some(PinId::Pb5));
        assert_eq!(config.resolve_name("pa4"), Some(PinId::Pa4));
        assert_eq!(config.resolve_name("bogus"), None);
    }

    #[test]
    fn test_blob_round_trip() {
        let mut config = DeviceConfig::factory_default();
        config.cdc[1].irda = true;
        config.pin_mut(PinId::Pa2).output = OutputDrive::OpenDrain;
        let restored = DeviceConfig::from_blob(&config.to_blob()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_blob_rejects_corruption() {
        let config = DeviceConfig::factory_default();
        let mut blob = config.to_blob();
        blob[40] ^= 0x5a;
        assert_eq!(DeviceConfig::from_blob(&blob), Err(BlobError::Crc));
        let mut blob = config.to_blob();
        blob[0] = 0;
        assert_eq!(DeviceConfig::from_blob(&blob), Err(BlobError::Magic));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let mut flash = MockFlash::new();
        let (config, source) = DeviceConfig::load(&mut flash);
        assert_eq!(source, LoadSource::Defaults);
        assert_eq!(config, DeviceConfig::factory_default());
    }

    #[test]
    fn test_save_alternates_pages_and_retires_old() {
        let mut flash = MockFlash::new();
        let config = DeviceConfig::factory_default();
        assert_eq!(config.save(&mut flash), Ok(0));
        let (_, source) = DeviceConfig::load(&mut flash);
        assert_eq!(source, LoadSource::Page(0));

        let mut changed = config.clone();
        changed.cdc[0].irda = true;
        assert_eq!(changed.save(&mut flash), Ok(1));
        let (loaded, source) = DeviceConfig::load(&mut flash);
        assert_eq!(source, LoadSource::Page(1));
        assert!(loaded.cdc[0].irda);
        // old page was retired, not erased
        let mut page0 = [0u8; CONFIG_BLOB_SIZE];
        flash.read(0, &mut page0);
        assert_eq!(&page0[0..4], &[0, 0, 0, 0]);
    }
}
