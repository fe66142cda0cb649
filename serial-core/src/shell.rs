//! Line editor for the configuration shell.
//!
//! Byte-at-a-time input processing with local echo: printable insertion at
//! the cursor, backspace/DEL, left/right cursor movement (CSI `D`/`C`) and
//! single-level history recall (CSI `A`). Completed lines are handed to the
//! command interpreter; everything here is pure buffer editing.

use heapless::Vec;

/// Maximum command line length.
pub const SHELL_LINE_MAX: usize = 256;

/// Upper bound on echo generated by one input byte (a full-line redraw
/// plus cursor repositioning).
pub const ECHO_MAX: usize = 2 * SHELL_LINE_MAX + 8;

/// Echo bytes produced while feeding input.
pub type Echo = Vec<u8, ECHO_MAX>;

/// Shell prompt.
pub const PROMPT: &str = "> ";

const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;
const ESCAPE: u8 = 0x1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscState {
    Idle,
    Escape,
    Csi,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShellEvent {
    None,
    /// A complete line is ready; collect it with [`Shell::take_line`].
    LineReady,
}

/// The line editor state.
pub struct Shell {
    line: Vec<u8, SHELL_LINE_MAX>,
    cursor: usize,
    history: Vec<u8, SHELL_LINE_MAX>,
    esc: EscState,
}

impl Shell {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            cursor: 0,
            history: Vec::new(),
            esc: EscState::Idle,
        }
    }

    /// Drop any half-typed line; history survives.
    pub fn reset(&mut self) {
        self.line.clear();
        self.cursor = 0;
        self.esc = EscState::Idle;
    }

    /// Greeting printed when the shell takes the port over.
    #[must_use]
    pub fn banner() -> &'static str {
        concat!(
            "\r\n",
            "triple-serial v",
            env!("CARGO_PKG_VERSION"),
            " configuration shell\r\n",
            "Type 'help' for the list of commands.\r\n",
            "> ",
        )
    }

    /// Process one input byte, appending local echo to `echo`.
    pub fn feed(&mut self, byte: u8, echo: &mut Echo) -> ShellEvent {
        match self.esc {
            EscState::Idle => self.feed_plain(byte, echo),
            EscState::Escape => {
                self.esc = if byte == b'[' {
                    EscState::Csi
                } else {
                    EscState::Idle
                };
                ShellEvent::None
            }
            EscState::Csi => self.feed_csi(byte, echo),
        }
    }

    fn feed_plain(&mut self, byte: u8, echo: &mut Echo) -> ShellEvent {
        match byte {
            b'\r' | b'\n' => {
                echo_bytes(echo, b"\r\n");
                return ShellEvent::LineReady;
            }
            BACKSPACE | DEL => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.line.remove(self.cursor);
                    echo_bytes(echo, &[BACKSPACE]);
                    echo_bytes(echo, &self.line[self.cursor..]);
                    echo_bytes(echo, b" ");
                    for _ in self.cursor..=self.line.len() {
                        echo_bytes(echo, &[BACKSPACE]);
                    }
                }
            }
            ESCAPE => self.esc = EscState::Escape,
            0x20..=0x7e => {
                if self.line.insert(self.cursor, byte).is_err() {
                    echo_bytes(echo, &[BELL]);
                    return ShellEvent::None;
                }
                echo_bytes(echo, &self.line[self.cursor..]);
                self.cursor += 1;
                for _ in self.cursor..self.line.len() {
                    echo_bytes(echo, &[BACKSPACE]);
                }
            }
            _ => {}
        }
        ShellEvent::None
    }

    fn feed_csi(&mut self, byte: u8, echo: &mut Echo) -> ShellEvent {
        // parameter bytes of sequences this editor does not use
        if byte.is_ascii_digit() || byte == b';' {
            return ShellEvent::None;
        }
        self.esc = EscState::Idle;
        match byte {
            b'C' => {
                if self.cursor < self.line.len() {
                    self.cursor += 1;
                    echo_bytes(echo, b"\x1b[C");
                }
            }
            b'D' => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    echo_bytes(echo, b"\x1b[D");
                }
            }
            b'A' => {
                if !self.history.is_empty() {
                    self.line.clear();
                    let _ = self.line.extend_from_slice(&self.history);
                    self.cursor = self.line.len();
                    echo_bytes(echo, b"\r\x1b[K");
                    echo_bytes(echo, PROMPT.as_bytes());
                    echo_bytes(echo, &self.line);
                }
            }
            _ => {}
        }
        ShellEvent::None
    }

    /// Collect a completed line. Non-empty lines become the history entry.
    pub fn take_line(&mut self, out: &mut [u8]) -> usize {
        let n = self.line.len().min(out.len());
        out[..n].copy_from_slice(&self.line[..n]);
        if !self.line.is_empty() {
            self.history.clear();
            let _ = self.history.extend_from_slice(&self.line);
        }
        self.line.clear();
        self.cursor = 0;
        n
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

fn echo_bytes(echo: &mut Echo, bytes: &[u8]) {
    let _ = echo.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::String;
    use std::vec::Vec as StdVec;

    fn type_bytes(shell: &mut Shell, bytes: &[u8]) -> (StdVec<u8>, Option<StdVec<u8>>) {
        let mut echoed = StdVec::new();
        let mut line = None;
        for &b in bytes {
            let mut echo = Echo::new();
            let event = shell.feed(b, &mut echo);
            echoed.extend_from_slice(&echo);
            if event == ShellEvent::LineReady {
                let mut buf = [0u8; SHELL_LINE_MAX];
                let n = shell.take_line(&mut buf);
                line = Some(StdVec::from(&buf[..n]));
            }
        }
        (echoed, line)
    }

    #[test]
    fn test_plain_line() {
        let mut shell = Shell::new();
        let (echoed, line) = type_bytes(&mut shell, b"help\r");
        assert_eq!(line.as_deref(), Some(&b"help"[..]));
        assert_eq!(echoed, b"help\r\n");
    }

    #[test]
    fn test_backspace_edits_line() {
        let mut shell = Shell::new();
        let (_, line) = type_bytes(&mut shell, b"helq\x7fp\r");
        assert_eq!(line.as_deref(), Some(&b"help"[..]));
    }

    #[test]
    fn test_backspace_on_empty_line_is_silent() {
        let mut shell = Shell::new();
        let (echoed, line) = type_bytes(&mut shell, b"\x08\x08ok\r");
        assert_eq!(line.as_deref(), Some(&b"ok"[..]));
        assert_eq!(echoed, b"ok\r\n");
    }

    #[test]
    fn test_cursor_left_inserts_mid_line() {
        let mut shell = Shell::new();
        // type "hlp", move left twice, insert 'e'
        let (_, line) = type_bytes(&mut shell, b"hlp\x1b[D\x1b[De\r");
        assert_eq!(line.as_deref(), Some(&b"help"[..]));
    }

    #[test]
    fn test_cursor_right_bounded_by_line_end() {
        let mut shell = Shell::new();
        let (_, line) = type_bytes(&mut shell, b"ab\x1b[D\x1b[C\x1b[Cc\r");
        assert_eq!(line.as_deref(), Some(&b"abc"[..]));
    }

    #[test]
    fn test_history_recall() {
        let mut shell = Shell::new();
        let (_, line) = type_bytes(&mut shell, b"version\r");
        assert_eq!(line.as_deref(), Some(&b"version"[..]));
        // up-arrow recalls the previous command
        let (echoed, line) = type_bytes(&mut shell, b"\x1b[A\r");
        assert_eq!(line.as_deref(), Some(&b"version"[..]));
        let echoed = String::from_utf8(echoed).unwrap();
        assert!(echoed.contains("version"));
    }

    #[test]
    fn test_empty_line_does_not_clobber_history() {
        let mut shell = Shell::new();
        type_bytes(&mut shell, b"help\r");
        type_bytes(&mut shell, b"\r");
        let (_, line) = type_bytes(&mut shell, b"\x1b[A\r");
        assert_eq!(line.as_deref(), Some(&b"help"[..]));
    }

    #[test]
    fn test_overlong_line_rings_bell() {
        let mut shell = Shell::new();
        let mut echoed = StdVec::new();
        for _ in 0..SHELL_LINE_MAX + 1 {
            let mut echo = Echo::new();
            shell.feed(b'x', &mut echo);
            echoed.extend_from_slice(&echo);
        }
        assert_eq!(echoed.last(), Some(&BELL));
        let mut buf = [0u8; SHELL_LINE_MAX];
        let mut echo = Echo::new();
        assert_eq!(shell.feed(b'\r', &mut echo), ShellEvent::LineReady);
        assert_eq!(shell.take_line(&mut buf), SHELL_LINE_MAX);
    }
}
