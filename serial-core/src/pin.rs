//! Logical pin identifiers and electrical configuration.
//!
//! A [`PinId`] names one of the 35 usable package pins (ports A and B in
//! full, PC13..PC15). Everything that touches hardware resolves a logical
//! pin through the device configuration first, so reassigning a pin at
//! runtime never leaves a dangling hardware reference: an unassigned or
//! blocked pin simply dereferences to a no-op.

/// Logical pin identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PinId {
    Pa0,
    Pa1,
    Pa2,
    Pa3,
    Pa4,
    Pa5,
    Pa6,
    Pa7,
    Pa8,
    Pa9,
    Pa10,
    Pa11,
    Pa12,
    Pa13,
    Pa14,
    Pa15,
    Pb0,
    Pb1,
    Pb2,
    Pb3,
    Pb4,
    Pb5,
    Pb6,
    Pb7,
    Pb8,
    Pb9,
    Pb10,
    Pb11,
    Pb12,
    Pb13,
    Pb14,
    Pb15,
    Pc13,
    Pc14,
    Pc15,
}

impl PinId {
    /// Number of logical pins.
    pub const COUNT: usize = 35;

    /// Every logical pin, in index order.
    pub const ALL: [PinId; Self::COUNT] = [
        PinId::Pa0,
        PinId::Pa1,
        PinId::Pa2,
        PinId::Pa3,
        PinId::Pa4,
        PinId::Pa5,
        PinId::Pa6,
        PinId::Pa7,
        PinId::Pa8,
        PinId::Pa9,
        PinId::Pa10,
        PinId::Pa11,
        PinId::Pa12,
        PinId::Pa13,
        PinId::Pa14,
        PinId::Pa15,
        PinId::Pb0,
        PinId::Pb1,
        PinId::Pb2,
        PinId::Pb3,
        PinId::Pb4,
        PinId::Pb5,
        PinId::Pb6,
        PinId::Pb7,
        PinId::Pb8,
        PinId::Pb9,
        PinId::Pb10,
        PinId::Pb11,
        PinId::Pb12,
        PinId::Pb13,
        PinId::Pb14,
        PinId::Pb15,
        PinId::Pc13,
        PinId::Pc14,
        PinId::Pc15,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Hardware port letter ('a', 'b' or 'c') and pin number within it.
    #[must_use]
    pub const fn port_and_line(self) -> (char, u8) {
        let idx = self.index();
        if idx < 16 {
            ('a', idx as u8)
        } else if idx < 32 {
            ('b', (idx - 16) as u8)
        } else {
            ('c', (idx - 32 + 13) as u8)
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PinId::Pa0 => "pa0",
            PinId::Pa1 => "pa1",
            PinId::Pa2 => "pa2",
            PinId::Pa3 => "pa3",
            PinId::Pa4 => "pa4",
            PinId::Pa5 => "pa5",
            PinId::Pa6 => "pa6",
            PinId::Pa7 => "pa7",
            PinId::Pa8 => "pa8",
            PinId::Pa9 => "pa9",
            PinId::Pa10 => "pa10",
            PinId::Pa11 => "pa11",
            PinId::Pa12 => "pa12",
            PinId::Pa13 => "pa13",
            PinId::Pa14 => "pa14",
            PinId::Pa15 => "pa15",
            PinId::Pb0 => "pb0",
            PinId::Pb1 => "pb1",
            PinId::Pb2 => "pb2",
            PinId::Pb3 => "pb3",
            PinId::Pb4 => "pb4",
            PinId::Pb5 => "pb5",
            PinId::Pb6 => "pb6",
            PinId::Pb7 => "pb7",
            PinId::Pb8 => "pb8",
            PinId::Pb9 => "pb9",
            PinId::Pb10 => "pb10",
            PinId::Pb11 => "pb11",
            PinId::Pb12 => "pb12",
            PinId::Pb13 => "pb13",
            PinId::Pb14 => "pb14",
            PinId::Pb15 => "pb15",
            PinId::Pc13 => "pc13",
            PinId::Pc14 => "pc14",
            PinId::Pc15 => "pc15",
        }
    }

    /// Resolve a human-readable pin name.
    ///
    /// Case-insensitive; tolerates `gpio_`, `pin_` and `p` prefixes, so
    /// `PA10`, `pin_a10` and `gpio_pa10` all name the same pin. Returns
    /// `None` for anything that does not name a usable pin.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let mut rest = name.as_bytes();
        for prefix in [b"gpio_".as_slice(), b"pin_".as_slice(), b"p".as_slice()] {
            if rest.len() > prefix.len() && rest[..prefix.len()].eq_ignore_ascii_case(prefix) {
                rest = &rest[prefix.len()..];
                break;
            }
        }
        let (&port, digits) = rest.split_first()?;
        if digits.is_empty() || digits.len() > 2 {
            return None;
        }
        let mut line: u8 = 0;
        for &d in digits {
            if !d.is_ascii_digit() {
                return None;
            }
            line = line * 10 + (d - b'0');
        }
        let base = match port.to_ascii_lowercase() {
            b'a' => 0,
            b'b' => 16,
            b'c' => {
                if !(13..=15).contains(&line) {
                    return None;
                }
                line -= 13;
                32
            }
            _ => return None,
        };
        if line > 15 {
            return None;
        }
        Self::from_index(base + line as usize)
    }
}

/// Assignment status of a logical pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PinStatus {
    /// Available for GPIO use or reassignment.
    #[default]
    Free = 0,
    /// Owned by a device function (CDC signal, LED, config pin).
    Occupied = 1,
    /// Permanently excluded from reassignment (debug, boot, USB pins).
    Blocked = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    #[default]
    Input = 0,
    Output = 1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Function {
    #[default]
    General = 0,
    Alternate = 1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputDrive {
    #[default]
    PushPull = 0,
    OpenDrain = 1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Pull {
    #[default]
    Floating = 0,
    Up = 1,
    Down = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Polarity {
    #[default]
    High = 0,
    Low = 1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Slew {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl PinStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PinStatus::Free => "free",
            PinStatus::Occupied => "occupied",
            PinStatus::Blocked => "blocked",
        }
    }
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Direction::Input),
            "out" => Some(Direction::Output),
            _ => None,
        }
    }
}

impl OutputDrive {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputDrive::PushPull => "pp",
            OutputDrive::OpenDrain => "od",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pp" => Some(OutputDrive::PushPull),
            "od" => Some(OutputDrive::OpenDrain),
            _ => None,
        }
    }
}

impl Pull {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Pull::Floating => "floating",
            Pull::Up => "up",
            Pull::Down => "down",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "floating" => Some(Pull::Floating),
            "up" => Some(Pull::Up),
            "down" => Some(Pull::Down),
            _ => None,
        }
    }
}

impl Polarity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Polarity::High => "high",
            Polarity::Low => "low",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Polarity::High),
            "low" => Some(Polarity::Low),
            _ => None,
        }
    }
}

/// Electrical configuration and assignment status of one logical pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub dir: Direction,
    pub func: Function,
    pub output: OutputDrive,
    pub pull: Pull,
    pub polarity: Polarity,
    pub speed: Slew,
    pub status: PinStatus,
}

impl PinConfig {
    /// An input line. `status` starts as `Occupied`; callers adjust.
    #[must_use]
    pub const fn input(pull: Pull, polarity: Polarity) -> Self {
        Self {
            dir: Direction::Input,
            func: Function::General,
            output: OutputDrive::PushPull,
            pull,
            polarity,
            speed: Slew::Low,
            status: PinStatus::Occupied,
        }
    }

    /// An output line.
    #[must_use]
    pub const fn output(func: Function, drive: OutputDrive, polarity: Polarity) -> Self {
        Self {
            dir: Direction::Output,
            func,
            output: drive,
            pull: Pull::Floating,
            polarity,
            speed: Slew::Medium,
            status: PinStatus::Occupied,
        }
    }

    /// A free pin with neutral electrical defaults.
    #[must_use]
    pub const fn free() -> Self {
        Self {
            dir: Direction::Input,
            func: Function::General,
            output: OutputDrive::PushPull,
            pull: Pull::Floating,
            polarity: Polarity::High,
            speed: Slew::Low,
            status: PinStatus::Free,
        }
    }

    /// A blocked pin; electrical fields are never applied.
    #[must_use]
    pub const fn blocked() -> Self {
        Self {
            dir: Direction::Input,
            func: Function::Alternate,
            output: OutputDrive::PushPull,
            pull: Pull::Floating,
            polarity: Polarity::High,
            speed: Slew::Low,
            status: PinStatus::Blocked,
        }
    }

    /// Map an "active" level through this pin's polarity.
    #[inline]
    #[must_use]
    pub const fn level_for(&self, active: bool) -> bool {
        match self.polarity {
            Polarity::High => active,
            Polarity::Low => !active,
        }
    }

    /// Map a sampled level back to an "active" reading.
    #[inline]
    #[must_use]
    pub const fn active_from(&self, level: bool) -> bool {
        self.level_for(level)
    }
}

/// Named signal roles of one CDC port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PinRole {
    Rx = 0,
    Tx = 1,
    Rts = 2,
    Cts = 3,
    Dsr = 4,
    Dtr = 5,
    Dcd = 6,
    Ri = 7,
    /// Transmit-activity indicator.
    Txa = 8,
}

impl PinRole {
    pub const COUNT: usize = 9;

    pub const ALL: [PinRole; Self::COUNT] = [
        PinRole::Rx,
        PinRole::Tx,
        PinRole::Rts,
        PinRole::Cts,
        PinRole::Dsr,
        PinRole::Dtr,
        PinRole::Dcd,
        PinRole::Ri,
        PinRole::Txa,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PinRole::Rx => "rx",
            PinRole::Tx => "tx",
            PinRole::Rts => "rts",
            PinRole::Cts => "cts",
            PinRole::Dsr => "dsr",
            PinRole::Dtr => "dtr",
            PinRole::Dcd => "dcd",
            PinRole::Ri => "ri",
            PinRole::Txa => "txa",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        PinRole::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

/// Role-to-pin binding of one CDC port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortPins {
    pins: [Option<PinId>; PinRole::COUNT],
    /// IrDA SIR encoding on this port's USART.
    pub irda: bool,
}

impl PortPins {
    #[must_use]
    pub const fn unassigned() -> Self {
        Self {
            pins: [None; PinRole::COUNT],
            irda: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, role: PinRole) -> Option<PinId> {
        self.pins[role.index()]
    }

    #[inline]
    pub fn set(&mut self, role: PinRole, pin: Option<PinId>) {
        self.pins[role.index()] = pin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_accepts_prefixes() {
        assert_eq!(PinId::from_name("pa10"), Some(PinId::Pa10));
        assert_eq!(PinId::from_name("PA10"), Some(PinId::Pa10));
        assert_eq!(PinId::from_name("pin_b5"), Some(PinId::Pb5));
        assert_eq!(PinId::from_name("gpio_pc13"), Some(PinId::Pc13));
        assert_eq!(PinId::from_name("b14"), Some(PinId::Pb14));
    }

    #[test]
    fn test_from_name_rejects_nonsense() {
        assert_eq!(PinId::from_name(""), None);
        assert_eq!(PinId::from_name("pd1"), None);
        assert_eq!(PinId::from_name("pa16"), None);
        assert_eq!(PinId::from_name("pa"), None);
        assert_eq!(PinId::from_name("pa1x"), None);
        // PC only exists above line 12 on this package
        assert_eq!(PinId::from_name("pc0"), None);
        assert_eq!(PinId::from_name("pc12"), None);
        assert_eq!(PinId::from_name("pc16"), None);
    }

    #[test]
    fn test_name_round_trip() {
        for pin in PinId::ALL {
            assert_eq!(PinId::from_name(pin.as_str()), Some(pin));
        }
    }

    #[test]
    fn test_index_round_trip() {
        for (i, pin) in PinId::ALL.iter().enumerate() {
            assert_eq!(pin.index(), i);
            assert_eq!(PinId::from_index(i), Some(*pin));
        }
        assert_eq!(PinId::from_index(PinId::COUNT), None);
    }

    #[test]
    fn test_port_and_line() {
        assert_eq!(PinId::Pa0.port_and_line(), ('a', 0));
        assert_eq!(PinId::Pb15.port_and_line(), ('b', 15));
        assert_eq!(PinId::Pc13.port_and_line(), ('c', 13));
        assert_eq!(PinId::Pc15.port_and_line(), ('c', 15));
    }

    #[test]
    fn test_polarity_mapping() {
        let active_low = PinConfig::input(Pull::Up, Polarity::Low);
        assert!(!active_low.level_for(true));
        assert!(active_low.active_from(false));
        let active_high = PinConfig::input(Pull::Up, Polarity::High);
        assert!(active_high.level_for(true));
        assert!(active_high.active_from(true));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(PinRole::parse("rx"), Some(PinRole::Rx));
        assert_eq!(PinRole::parse("txa"), Some(PinRole::Txa));
        assert_eq!(PinRole::parse("dtr"), Some(PinRole::Dtr));
        assert_eq!(PinRole::parse("xyz"), None);
    }
}
