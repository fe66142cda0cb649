//! Shell command interpreter.
//!
//! Line-oriented ASCII protocol over the diverted CDC stream:
//!
//! ```text
//! help
//! version
//! config save|reset
//! uart <port|all> show
//! uart <port> <signal> [output <pp|od>] [active <low|high>]
//!                      [pull <floating|up|down>] [irda <yes|no>]
//! gpio [<pin>|all|free|blocked|occupied|uart<N>]
//!      [show|free|occupy|get|up|down|set <params>]
//! ```
//!
//! Errors are textual messages terminated with `\r\n`; there are no exit
//! codes. Output is accumulated in a fixed [`Response`] buffer (truncated,
//! not grown, when a listing exceeds it).

use core::fmt::{self, Write as _};

use heapless::Vec;

use crate::config::{ConfigFlash, DeviceConfig};
use crate::device::{set_pin_status, StatusChange};
use crate::engine::{CdcEngine, PORT_COUNT};
use crate::hal::Hal;
use crate::pin::{Direction, Function, OutputDrive, PinId, PinRole, PinStatus, Polarity, Pull};

/// Response buffer capacity.
pub const RESPONSE_MAX: usize = 2048;

/// Fixed-capacity command output accumulator. Overflow truncates.
pub struct Response {
    buf: Vec<u8, RESPONSE_MAX>,
}

impl Response {
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn push_str(&mut self, s: &str) {
        let _ = self.buf.extend_from_slice(s.as_bytes());
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for Response {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// Pin selection groups for the `gpio` command. A plain predicate over the
/// configuration; iteration stays separate and trivially testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFilter {
    All,
    Free,
    Blocked,
    Occupied,
    Uart(usize),
    Single(PinId),
}

impl PinFilter {
    /// Parse a group name or pin name.
    #[must_use]
    pub fn parse(config: &DeviceConfig, token: &str) -> Option<Self> {
        let mut buf = [0u8; 12];
        let lowered = lower_token(token, &mut buf)?;
        match lowered {
            "all" => Some(Self::All),
            "free" => Some(Self::Free),
            "blocked" => Some(Self::Blocked),
            "occupied" => Some(Self::Occupied),
            "uart0" => Some(Self::Uart(0)),
            "uart1" => Some(Self::Uart(1)),
            "uart2" => Some(Self::Uart(2)),
            _ => config.resolve_name(lowered).map(Self::Single),
        }
    }

    /// Does `pin` belong to this group?
    #[must_use]
    pub fn matches(&self, config: &DeviceConfig, pin: PinId) -> bool {
        match *self {
            Self::All => true,
            Self::Free => config.status(pin) == PinStatus::Free,
            Self::Blocked => config.status(pin) == PinStatus::Blocked,
            Self::Occupied => config.status(pin) == PinStatus::Occupied,
            Self::Uart(port) => PinRole::ALL
                .iter()
                .any(|&role| config.cdc[port].get(role) == Some(pin)),
            Self::Single(p) => p == pin,
        }
    }

    /// Matching pins in index order.
    pub fn iter<'a>(&'a self, config: &'a DeviceConfig) -> impl Iterator<Item = PinId> + 'a {
        PinId::ALL
            .iter()
            .copied()
            .filter(move |&pin| self.matches(config, pin))
    }
}

/// Execute one command line against the device context.
pub fn execute<H: Hal, F: ConfigFlash>(
    line: &str,
    config: &mut DeviceConfig,
    engine: &mut CdcEngine,
    hal: &mut H,
    flash: &mut F,
    out: &mut Response,
) {
    let mut tokens = line.split_ascii_whitespace();
    let Some(command) = tokens.next() else {
        return;
    };
    if eq(command, "help") {
        help(out);
    } else if eq(command, "version") {
        let _ = write!(out, "triple-serial v{}\r\n", env!("CARGO_PKG_VERSION"));
    } else if eq(command, "config") {
        cmd_config(&mut tokens, config, engine, hal, flash, out);
    } else if eq(command, "uart") {
        cmd_uart(&mut tokens, config, engine, hal, out);
    } else if eq(command, "gpio") {
        cmd_gpio(&mut tokens, config, engine, hal, out);
    } else {
        let _ = write!(out, "error: unknown command '{command}'\r\n");
    }
}

fn help(out: &mut Response) {
    out.push_str(
        "commands:\r\n\
           help\r\n\
           version\r\n\
           config save|reset\r\n\
           uart <port|all> show\r\n\
           uart <port> <signal> [output <pp|od>] [active <low|high>] [pull <floating|up|down>] [irda <yes|no>]\r\n\
           gpio [<pin>|all|free|blocked|occupied|uart<N>] [show|free|occupy|get|up|down|set <params>]\r\n\
         signals: rx tx rts cts dsr dtr dcd ri txa\r\n",
    );
}

fn cmd_config<'a, H: Hal, F: ConfigFlash>(
    tokens: &mut impl Iterator<Item = &'a str>,
    config: &mut DeviceConfig,
    engine: &mut CdcEngine,
    hal: &mut H,
    flash: &mut F,
    out: &mut Response,
) {
    match tokens.next() {
        Some(sub) if eq(sub, "save") => match config.save(flash) {
            Ok(page) => {
                let _ = write!(out, "configuration saved (page {page})\r\n");
            }
            Err(_) => out.push_str("error: flash write failed\r\n"),
        },
        Some(sub) if eq(sub, "reset") => {
            *config = DeviceConfig::factory_default();
            reapply_config(config, engine, hal);
            out.push_str("configuration reset to defaults (use 'config save' to persist)\r\n");
        }
        _ => out.push_str("usage: config save|reset\r\n"),
    }
}

/// Push the in-RAM configuration back onto the hardware after a wholesale
/// replacement.
fn reapply_config<H: Hal>(config: &DeviceConfig, engine: &mut CdcEngine, hal: &mut H) {
    for pin in PinId::ALL {
        match config.status(pin) {
            PinStatus::Occupied => config.pin_init(hal, Some(pin)),
            PinStatus::Free => hal.release(pin),
            PinStatus::Blocked => {}
        }
    }
    for port in 0..PORT_COUNT {
        let ready = CdcEngine::port_pins_ready(config, port);
        if ready && !engine.port(port).enabled() {
            engine.enable_port(hal, config, port);
        } else if !ready && engine.port(port).enabled() {
            engine.disable_port(hal, port);
        }
    }
}

fn cmd_uart<'a, H: Hal>(
    tokens: &mut impl Iterator<Item = &'a str>,
    config: &mut DeviceConfig,
    engine: &mut CdcEngine,
    hal: &mut H,
    out: &mut Response,
) {
    let Some(port_token) = tokens.next() else {
        out.push_str("usage: uart <port|all> show|<signal> [...]\r\n");
        return;
    };
    let Some(action) = tokens.next() else {
        out.push_str("usage: uart <port|all> show|<signal> [...]\r\n");
        return;
    };
    if eq(action, "show") {
        if eq(port_token, "all") {
            for port in 0..PORT_COUNT {
                show_port(config, engine, out, port);
            }
        } else if let Some(port) = parse_port(port_token) {
            show_port(config, engine, out, port);
        } else {
            let _ = write!(out, "error: no such port '{port_token}'\r\n");
        }
        return;
    }
    let Some(port) = parse_port(port_token) else {
        let _ = write!(out, "error: no such port '{port_token}'\r\n");
        return;
    };
    let mut buf = [0u8; 12];
    let Some(role) = lower_token(action, &mut buf).and_then(PinRole::parse) else {
        let _ = write!(out, "error: no such signal '{action}'\r\n");
        return;
    };
    let mut touched = false;
    while let Some(key) = tokens.next() {
        let Some(value) = tokens.next() else {
            let _ = write!(out, "error: missing value for '{key}'\r\n");
            return;
        };
        let mut vbuf = [0u8; 12];
        let Some(value) = lower_token(value, &mut vbuf) else {
            let _ = write!(out, "error: bad value for '{key}'\r\n");
            return;
        };
        if eq(key, "irda") {
            let on = match value {
                "yes" => true,
                "no" => false,
                _ => {
                    out.push_str("error: irda takes yes|no\r\n");
                    return;
                }
            };
            config.cdc[port].irda = on;
            hal.set_irda(port, on);
            continue;
        }
        let Some(pin) = config.cdc[port].get(role) else {
            let _ = write!(out, "error: no pin assigned to {} {}\r\n", port, role.as_str());
            return;
        };
        if eq(key, "output") {
            let Some(drive) = OutputDrive::parse(value) else {
                out.push_str("error: output takes pp|od\r\n");
                return;
            };
            config.pin_mut(pin).output = drive;
        } else if eq(key, "active") {
            let Some(polarity) = Polarity::parse(value) else {
                out.push_str("error: active takes low|high\r\n");
                return;
            };
            config.pin_mut(pin).polarity = polarity;
        } else if eq(key, "pull") {
            let Some(pull) = Pull::parse(value) else {
                out.push_str("error: pull takes floating|up|down\r\n");
                return;
            };
            config.pin_mut(pin).pull = pull;
        } else {
            let _ = write!(out, "error: unknown parameter '{key}'\r\n");
            return;
        }
        touched = true;
    }
    if touched {
        // push the new electrical config onto the wire
        config.pin_init(hal, config.cdc[port].get(role));
    }
    let _ = write!(out, "uart {} {} updated\r\n", port, role.as_str());
}

fn show_port(config: &DeviceConfig, engine: &CdcEngine, out: &mut Response, port: usize) {
    let _ = write!(
        out,
        "uart {port}: {}\r\n",
        if engine.port(port).enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    for role in PinRole::ALL {
        match config.cdc[port].get(role) {
            Some(pin) => {
                let _ = write!(
                    out,
                    "  {:<4} {:<5} {}\r\n",
                    role.as_str(),
                    pin.as_str(),
                    config.status(pin).as_str()
                );
            }
            None => {
                let _ = write!(out, "  {:<4} -\r\n", role.as_str());
            }
        }
    }
    let _ = write!(
        out,
        "  irda {}\r\n",
        if config.cdc[port].irda { "yes" } else { "no" }
    );
}

fn cmd_gpio<'a, H: Hal>(
    tokens: &mut impl Iterator<Item = &'a str>,
    config: &mut DeviceConfig,
    engine: &mut CdcEngine,
    hal: &mut H,
    out: &mut Response,
) {
    let filter_token = tokens.next().unwrap_or("all");
    let Some(filter) = PinFilter::parse(config, filter_token) else {
        let _ = write!(out, "error: no such pin or group '{filter_token}'\r\n");
        return;
    };
    let op = tokens.next().unwrap_or("show");
    let mut buf = [0u8; 12];
    let Some(op) = lower_token(op, &mut buf) else {
        let _ = write!(out, "error: unknown operation\r\n");
        return;
    };
    match op {
        "show" => {
            for pin in filter.iter(config) {
                show_pin(config, out, pin);
            }
        }
        "free" | "occupy" => {
            let target = if op == "free" {
                PinStatus::Free
            } else {
                PinStatus::Occupied
            };
            let pins: Vec<PinId, { PinId::COUNT }> = filter.iter(config).collect();
            for pin in pins {
                match set_pin_status(config, engine, hal, pin, target) {
                    Ok(StatusChange::PortEnabled(port)) => {
                        let _ = write!(out, "{}: {} (uart {port} enabled)\r\n", pin.as_str(), op);
                    }
                    Ok(StatusChange::PortDisabled(port)) => {
                        let _ = write!(out, "{}: {} (uart {port} disabled)\r\n", pin.as_str(), op);
                    }
                    Ok(_) => {
                        let _ = write!(out, "{}: {}\r\n", pin.as_str(), op);
                    }
                    Err(_) => {
                        let _ = write!(out, "error: {} is blocked\r\n", pin.as_str());
                    }
                }
            }
        }
        "get" => {
            for pin in filter.iter(config) {
                if config.status(pin) == PinStatus::Blocked {
                    let _ = write!(out, "{}: blocked\r\n", pin.as_str());
                } else {
                    let active = config.pin_read_free(hal, Some(pin), false);
                    let _ = write!(out, "{} = {}\r\n", pin.as_str(), u8::from(active));
                }
            }
        }
        "up" | "down" => {
            let active = op == "up";
            for pin in filter.iter(config) {
                if config.status(pin) == PinStatus::Free {
                    config.pin_write_free(hal, Some(pin), active);
                    let _ = write!(out, "{} -> {}\r\n", pin.as_str(), u8::from(active));
                } else {
                    let _ = write!(out, "error: {} is not free\r\n", pin.as_str());
                }
            }
        }
        "set" => cmd_gpio_set(tokens, config, hal, filter, out),
        _ => {
            let _ = write!(out, "error: unknown operation '{op}'\r\n");
        }
    }
}

fn cmd_gpio_set<'a, H: Hal>(
    tokens: &mut impl Iterator<Item = &'a str>,
    config: &mut DeviceConfig,
    hal: &mut H,
    filter: PinFilter,
    out: &mut Response,
) {
    // collect the delta first so one bad token changes nothing
    let mut dir = None;
    let mut output = None;
    let mut pull = None;
    let mut polarity = None;
    while let Some(key) = tokens.next() {
        let Some(value) = tokens.next() else {
            let _ = write!(out, "error: missing value for '{key}'\r\n");
            return;
        };
        let mut vbuf = [0u8; 12];
        let Some(value) = lower_token(value, &mut vbuf) else {
            let _ = write!(out, "error: bad value for '{key}'\r\n");
            return;
        };
        if eq(key, "dir") {
            dir = Direction::parse(value);
            if dir.is_none() {
                out.push_str("error: dir takes in|out\r\n");
                return;
            }
        } else if eq(key, "output") {
            output = OutputDrive::parse(value);
            if output.is_none() {
                out.push_str("error: output takes pp|od\r\n");
                return;
            }
        } else if eq(key, "pull") {
            pull = Pull::parse(value);
            if pull.is_none() {
                out.push_str("error: pull takes floating|up|down\r\n");
                return;
            }
        } else if eq(key, "active") {
            polarity = Polarity::parse(value);
            if polarity.is_none() {
                out.push_str("error: active takes low|high\r\n");
                return;
            }
        } else {
            let _ = write!(out, "error: unknown parameter '{key}'\r\n");
            return;
        }
    }
    let pins: Vec<PinId, { PinId::COUNT }> = filter.iter(config).collect();
    for pin in pins {
        if config.status(pin) != PinStatus::Free {
            let _ = write!(out, "error: {} is not free\r\n", pin.as_str());
            continue;
        }
        let cfg = config.pin_mut(pin);
        if let Some(dir) = dir {
            cfg.dir = dir;
        }
        if let Some(output) = output {
            cfg.output = output;
        }
        if let Some(pull) = pull {
            cfg.pull = pull;
        }
        if let Some(polarity) = polarity {
            cfg.polarity = polarity;
        }
        hal.configure(pin, config.pin(pin));
        let _ = write!(out, "{}: set\r\n", pin.as_str());
    }
}

fn show_pin(config: &DeviceConfig, out: &mut Response, pin: PinId) {
    let cfg = config.pin(pin);
    match cfg.status {
        PinStatus::Blocked => {
            let reason = DeviceConfig::blocked_reason(pin).unwrap_or("reserved");
            let _ = write!(out, "{}: blocked ({reason})\r\n", pin.as_str());
        }
        PinStatus::Free => {
            let _ = write!(out, "{}: free\r\n", pin.as_str());
        }
        PinStatus::Occupied => {
            let _ = write!(out, "{}: occupied", pin.as_str());
            if config.status_led == Some(pin) {
                out.push_str(", led");
            } else if config.config_pin == Some(pin) {
                out.push_str(", config");
            } else if let Some((port, role)) = config.find_role(pin) {
                let _ = write!(out, ", uart{port} {}", role.as_str());
            }
            match cfg.dir {
                Direction::Input => {
                    let _ = write!(out, ", in, pull {}", cfg.pull.as_str());
                }
                Direction::Output => {
                    let _ = write!(out, ", out, {}", cfg.output.as_str());
                    if cfg.func == Function::Alternate {
                        out.push_str(", alt");
                    }
                }
            }
            let _ = write!(out, ", active {}\r\n", cfg.polarity.as_str());
        }
    }
}

fn parse_port(token: &str) -> Option<usize> {
    match token {
        "0" => Some(0),
        "1" => Some(1),
        "2" => Some(2),
        _ => None,
    }
}

fn eq(token: &str, word: &str) -> bool {
    token.eq_ignore_ascii_case(word)
}

/// Lowercase a token into a stack buffer; `None` if it does not fit (and
/// thus cannot match any keyword).
fn lower_token<'a>(token: &str, buf: &'a mut [u8; 12]) -> Option<&'a str> {
    let bytes = token.as_bytes();
    if bytes.len() > buf.len() {
        return None;
    }
    for (dst, src) in buf.iter_mut().zip(bytes) {
        *dst = src.to_ascii_lowercase();
    }
    core::str::from_utf8(&buf[..bytes.len()]).ok()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::mock::{MockFlash, MockHal};
    use std::string::String;
    use std::vec::Vec as StdVec;

    fn run(
        line: &str,
        config: &mut DeviceConfig,
        engine: &mut CdcEngine,
        hal: &mut MockHal,
        flash: &mut MockFlash,
    ) -> String {
        let mut out = Response::new();
        execute(line, config, engine, hal, flash, &mut out);
        String::from_utf8(StdVec::from(out.as_bytes())).unwrap()
    }

    fn fixture() -> (DeviceConfig, CdcEngine, MockHal, MockFlash) {
        let cfg = DeviceConfig::factory_default();
        let mut hal = MockHal::new();
        let mut engine = CdcEngine::new();
        engine.configured(&mut hal, &cfg);
        hal.clear_records();
        (cfg, engine, hal, MockFlash::new())
    }

    #[test]
    fn test_version_command() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("version", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains(env!("CARGO_PKG_VERSION")));
        assert!(out.ends_with("\r\n"));
    }

    #[test]
    fn test_help_lists_commands() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("help", &mut cfg, &mut engine, &mut hal, &mut flash);
        for word in ["uart", "gpio", "config", "version"] {
            assert!(out.contains(word), "help should mention {word}");
        }
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("frobnicate", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.starts_with("error:"));
    }

    #[test]
    fn test_uart_show_lists_signals() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("uart 1 show", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("uart 1: enabled"));
        assert!(out.contains("rx"));
        assert!(out.contains("pa3"));
        assert!(out.contains("irda no"));
    }

    #[test]
    fn test_uart_set_output_drive() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run(
            "uart 1 tx output od",
            &mut cfg,
            &mut engine,
            &mut hal,
            &mut flash,
        );
        assert!(out.contains("updated"), "{out}");
        assert_eq!(cfg.pin(PinId::Pa2).output, OutputDrive::OpenDrain);
        // the new electrical config was pushed to hardware
        assert!(hal.configured_pins.contains(&PinId::Pa2));
    }

    #[test]
    fn test_uart_irda_toggle() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        run(
            "uart 2 tx irda yes",
            &mut cfg,
            &mut engine,
            &mut hal,
            &mut flash,
        );
        assert!(cfg.cdc[2].irda);
        assert!(hal.irda[2]);
        run(
            "uart 2 tx irda no",
            &mut cfg,
            &mut engine,
            &mut hal,
            &mut flash,
        );
        assert!(!cfg.cdc[2].irda);
        assert!(!hal.irda[2]);
    }

    #[test]
    fn test_uart_rejects_bad_signal() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("uart 1 blinken", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.starts_with("error:"));
    }

    #[test]
    fn test_gpio_show_single_pin() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("gpio pa3 show", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("pa3: occupied, uart1 rx"));
        let out = run("gpio pa13", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("pa13: blocked (debug swdio)"));
    }

    #[test]
    fn test_gpio_group_filters() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("gpio free show", &mut cfg, &mut engine, &mut hal, &mut flash);
        // the factory map leaves exactly PC14 and PC15 unassigned
        assert_eq!(out, "pc14: free\r\npc15: free\r\n");
        let out = run("gpio blocked", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert_eq!(out.lines().count(), 5);
        let out = run("gpio uart1 show", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert_eq!(out.lines().count(), 9);
    }

    #[test]
    fn test_gpio_set_then_drive() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run(
            "gpio pc14 set dir out output od active high",
            &mut cfg,
            &mut engine,
            &mut hal,
            &mut flash,
        );
        assert!(out.contains("pc14: set"));
        assert_eq!(cfg.pin(PinId::Pc14).dir, Direction::Output);
        assert_eq!(cfg.pin(PinId::Pc14).output, OutputDrive::OpenDrain);
        assert!(hal.configured_pins.contains(&PinId::Pc14));

        let out = run("gpio pc14 up", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("pc14 -> 1"));
        assert_eq!(hal.pin_written[PinId::Pc14.index()], Some(true));
        run("gpio pc14 down", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert_eq!(hal.pin_written[PinId::Pc14.index()], Some(false));
    }

    #[test]
    fn test_gpio_up_refuses_occupied_pin() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("gpio pa9 up", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.starts_with("error:"));
        assert_eq!(hal.pin_written[PinId::Pa9.index()], None);
    }

    #[test]
    fn test_gpio_free_blocked_pin_is_an_error() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("gpio pa12 free", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("blocked"));
        assert_eq!(cfg.status(PinId::Pa12), PinStatus::Blocked);
    }

    #[test]
    fn test_config_save_and_failure_path() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        let out = run("config save", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("saved"));
        flash.fail_next_write = true;
        let out = run("config save", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("error: flash write failed"));
    }

    #[test]
    fn test_config_reset_restores_defaults() {
        let (mut cfg, mut engine, mut hal, mut flash) = fixture();
        run(
            "uart 1 tx output od",
            &mut cfg,
            &mut engine,
            &mut hal,
            &mut flash,
        );
        assert_eq!(cfg.pin(PinId::Pa2).output, OutputDrive::OpenDrain);
        let out = run("config reset", &mut cfg, &mut engine, &mut hal, &mut flash);
        assert!(out.contains("reset"));
        assert_eq!(cfg, DeviceConfig::factory_default());
    }

    #[test]
    fn test_pin_filter_parse() {
        let cfg = DeviceConfig::factory_default();
        assert_eq!(PinFilter::parse(&cfg, "all"), Some(PinFilter::All));
        assert_eq!(PinFilter::parse(&cfg, "UART2"), Some(PinFilter::Uart(2)));
        assert_eq!(
            PinFilter::parse(&cfg, "led"),
            Some(PinFilter::Single(PinId::Pc13))
        );
        assert_eq!(PinFilter::parse(&cfg, "nope"), None);
    }
}
