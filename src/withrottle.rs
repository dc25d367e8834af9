//! WiThrottle-compatible text protocol.
//!
//! Throttle apps talk a line-oriented ASCII protocol. [`ThrottleProtocol`]
//! decodes one line at a time against the [`LocoRegistry`] and appends
//! the replies for the sending client to an output string. It knows
//! nothing about sockets; see `services::withrottle_server` for the TCP
//! side.
//!
//! # Verbs
//!
//! | Line | Reply |
//! |------|-------|
//! | `HU<id>` | `VN2.0`, `HTIR-TRAIN`, `RL0`, `HtIR-TRAIN`, `PPA<0\|1>`, `*5` |
//! | `N<name>` | `*5` |
//! | `PPA<0\|1>` | `PPA<0\|1>` |
//! | `M<t>+<L\|S><addr><;><L\|S><addr>` | loco snapshot |
//! | `M<t>A<L\|S><addr>\|*<;><action>` | action echo |
//!
//! Unknown verbs are ignored.
//!
//! # Example
//!
//! ```
//! use ir_trainz::registry::LocoRegistry;
//! use ir_trainz::withrottle::ThrottleProtocol;
//!
//! let mut protocol = ThrottleProtocol::new(LocoRegistry::new());
//! let mut out = String::new();
//!
//! protocol.handle_line(b"PPA1", &mut out);
//! assert_eq!(out, "PPA1\n");
//! assert!(protocol.track_power());
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::Write;

use tracing::{debug, trace};

use crate::registry::{LocoFactory, LocoRecord, LocoRegistry};

/// Per-client receive buffer size.
pub const LINE_BUFFER_SIZE: usize = 64;

/// Highest function index a throttle may address.
pub const MAX_FUNCTION: u8 = 27;

/// Highest throttle speed.
pub const MAX_SPEED: u8 = 126;

/// Server name announced in the handshake.
pub const SERVER_NAME: &str = "IR-TRAIN";

/// One complete or force-flushed line.
pub type Line = heapless::Vec<u8, LINE_BUFFER_SIZE>;

/// Accumulates bytes until a line is complete.
///
/// A line ends at `\n` or when the buffer holds `LINE_BUFFER_SIZE - 1`
/// bytes, whichever comes first; an over-long line is split rather than
/// dropped.
///
/// ```
/// use ir_trainz::withrottle::LineBuffer;
///
/// let mut buf = LineBuffer::new();
/// assert!(buf.push(b'N').is_none());
/// assert_eq!(buf.push(b'\n').as_deref(), Some(&b"N\n"[..]));
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Line,
}

impl LineBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a byte, returning the line once it is complete.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        // Never full here: a flush always happens one byte earlier.
        let _ = self.buf.push(byte);
        if byte == b'\n' || self.buf.len() >= LINE_BUFFER_SIZE - 1 {
            Some(core::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Called with the new track-power state on every `PPA` line.
pub type PowerListener = Box<dyn FnMut(bool) + Send>;

/// Address field of a multithrottle line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AddrSpec {
    /// `*`: every loco.
    All,
    /// `L`/`S` followed by digits; the letter is kept for echoes.
    Loco(u8, i64),
    /// Anything else, matches nothing.
    Invalid,
}

impl AddrSpec {
    fn parse(bytes: &[u8]) -> Self {
        match bytes.first() {
            Some(b'*') => AddrSpec::All,
            Some(&kind) if kind == b'L' || kind == b'S' => {
                AddrSpec::Loco(kind, leading_int(&bytes[1..]))
            }
            _ => AddrSpec::Invalid,
        }
    }
}

/// Leading ASCII digits as an integer; no digits yields 0.
fn leading_int(bytes: &[u8]) -> i64 {
    bytes
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')))
}

/// Text after the first `;` and the `>` following it.
fn action_of(line: &[u8]) -> &[u8] {
    match line.iter().position(|&b| b == b';') {
        Some(i) => line.get(i + 2..).unwrap_or(&[]),
        None => &[],
    }
}

/// Decoder state shared by all throttle clients.
pub struct ThrottleProtocol {
    registry: LocoRegistry,
    factory: Option<Box<dyn LocoFactory + Send>>,
    track_power: bool,
    power_listener: Option<PowerListener>,
}

impl core::fmt::Debug for ThrottleProtocol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThrottleProtocol")
            .field("registry", &self.registry)
            .field("track_power", &self.track_power)
            .finish_non_exhaustive()
    }
}

impl ThrottleProtocol {
    /// Protocol over an existing registry, without a loco factory.
    pub fn new(registry: LocoRegistry) -> Self {
        Self {
            registry,
            factory: None,
            track_power: false,
            power_listener: None,
        }
    }

    /// Builder: create unknown locos with `factory`.
    pub fn with_factory(mut self, factory: Box<dyn LocoFactory + Send>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Notify `listener` on every power command.
    pub fn set_power_listener(&mut self, listener: PowerListener) {
        self.power_listener = Some(listener);
    }

    /// Last power state set by a client.
    pub fn track_power(&self) -> bool {
        self.track_power
    }

    /// The loco registry.
    pub fn registry(&self) -> &LocoRegistry {
        &self.registry
    }

    /// The loco registry, mutably.
    pub fn registry_mut(&mut self) -> &mut LocoRegistry {
        &mut self.registry
    }

    /// Decode one line and append any replies to `out`.
    ///
    /// A trailing `\n` (and `\r`) is ignored.
    pub fn handle_line(&mut self, line: &[u8], out: &mut String) {
        let mut line = line;
        while let Some((&last, rest)) = line.split_last() {
            if last == b'\n' || last == b'\r' {
                line = rest;
            } else {
                break;
            }
        }
        trace!(line = %String::from_utf8_lossy(line), "throttle line");

        match line.first() {
            Some(b'P') => self.power(line, out),
            Some(b'N') => out.push_str("*5\n"),
            Some(b'H') if line.get(1) == Some(&b'U') => self.handshake(out),
            Some(b'M') => self.multithrottle(line, out),
            _ => {}
        }
    }

    fn handshake(&self, out: &mut String) {
        let _ = write!(
            out,
            "VN2.0\nHT{name}\nRL0\nHt{name}\nPPA{}\n*5\n",
            u8::from(self.track_power),
            name = SERVER_NAME
        );
    }

    fn power(&mut self, line: &[u8], out: &mut String) {
        if line.get(1) != Some(&b'P') || line.get(2) != Some(&b'A') {
            return;
        }
        self.track_power = line.get(3) == Some(&b'1');
        debug!(on = self.track_power, "track power");
        let _ = writeln!(out, "PPA{}", u8::from(self.track_power));
        if let Some(listener) = self.power_listener.as_mut() {
            listener(self.track_power);
        }
    }

    fn multithrottle(&mut self, line: &[u8], out: &mut String) {
        let (Some(&throttle), Some(&action)) = (line.get(1), line.get(2)) else {
            return;
        };
        let target = AddrSpec::parse(line.get(3..).unwrap_or(&[]));
        let rest = action_of(line);

        match action {
            b'+' => self.acquire(throttle, target, out),
            b'A' => match target {
                AddrSpec::All => {
                    for loco in self.registry.iter_mut() {
                        apply_action(loco, throttle, rest, out);
                    }
                }
                AddrSpec::Loco(_, address) => {
                    if let Some(loco) = self.registry.find_by_address_mut(address) {
                        apply_action(loco, throttle, rest, out);
                    }
                }
                AddrSpec::Invalid => {}
            },
            _ => {}
        }
    }

    /// `M<t>+`: find or create the loco and send its snapshot.
    fn acquire(&mut self, throttle: u8, target: AddrSpec, out: &mut String) {
        let AddrSpec::Loco(kind, address) = target else {
            return;
        };
        if address == 0 {
            out.push_str("HMAddress '0' not supported!\n");
            return;
        }

        if self.registry.find_by_address(address).is_none() {
            let created = match (self.factory.as_mut(), u32::try_from(address)) {
                (Some(factory), Ok(addr)) => factory.create_loco(addr, kind == b'L'),
                _ => None,
            };
            match created {
                Some(record) => {
                    debug!(address, long = kind == b'L', "loco created");
                    self.registry.add_loco(record);
                }
                None => return,
            }
        }
        let Some(loco) = self.registry.find_by_address(address) else {
            return;
        };

        let t = throttle as char;
        let k = kind as char;
        let _ = writeln!(out, "M{t}+{k}{address}<;>");
        for index in 0..=MAX_FUNCTION {
            let _ = writeln!(
                out,
                "M{t}A{k}{address}<;>F{}{index}",
                u8::from(loco.state.function(index))
            );
        }
        let _ = writeln!(out, "M{t}A{k}{address}<;>V{}", loco.state.speed);
        let _ = writeln!(out, "M{t}A{k}{address}<;>R{}", u8::from(loco.state.forward));
        let _ = writeln!(out, "M{t}A{k}{address}<;>s1");
    }
}

/// Apply one action to `loco` and echo the result.
fn apply_action(loco: &mut LocoRecord, throttle: u8, action: &[u8], out: &mut String) {
    let prefix = |out: &mut String, loco: &LocoRecord| {
        let _ = write!(
            out,
            "M{}A{}{}<;>",
            throttle as char,
            loco.address_kind(),
            loco.address
        );
    };

    match action.first() {
        Some(b'V') => {
            let speed = leading_int(&action[1..]).clamp(0, i64::from(MAX_SPEED)) as u8;
            loco.apply_speed(loco.state.forward, speed);
            prefix(out, loco);
            let _ = writeln!(out, "V{}", loco.state.speed);
        }
        Some(b'R') => {
            let forward = action.get(1) == Some(&b'1');
            loco.apply_speed(forward, loco.state.speed);
            prefix(out, loco);
            let _ = writeln!(out, "R{}", u8::from(loco.state.forward));
        }
        Some(b'X' | b'I' | b'Q') => {
            loco.apply_speed(loco.state.forward, 0);
            prefix(out, loco);
            let _ = writeln!(out, "V{}", loco.state.speed);
        }
        Some(b'F') => {
            let index = leading_int(action.get(2..).unwrap_or(&[]));
            if !(0..=i64::from(MAX_FUNCTION)).contains(&index) {
                return;
            }
            let index = index as u8;
            if action.get(1) == Some(&b'1') {
                loco.press_function(index);
            }
            prefix(out, loco);
            let _ = writeln!(out, "F{}{index}", u8::from(loco.state.function(index)));
        }
        Some(b'q') => match action.get(1) {
            Some(b'V') => {
                prefix(out, loco);
                let _ = writeln!(out, "V{}", loco.state.speed);
            }
            Some(b'R') => {
                prefix(out, loco);
                let _ = writeln!(out, "R{}", u8::from(loco.state.forward));
            }
            _ => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NoopHandler;

    fn protocol_with(addresses: &[u32]) -> ThrottleProtocol {
        let mut registry = LocoRegistry::new();
        for &address in addresses {
            registry.add_loco(LocoRecord::new(address, Box::new(NoopHandler)));
        }
        ThrottleProtocol::new(registry)
    }

    fn reply(protocol: &mut ThrottleProtocol, line: &str) -> String {
        let mut out = String::new();
        protocol.handle_line(line.as_bytes(), &mut out);
        out
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(leading_int(b"123abc"), 123);
        assert_eq!(leading_int(b"abc"), 0);
        assert_eq!(leading_int(b""), 0);
    }

    #[test]
    fn addr_spec_parsing() {
        assert_eq!(AddrSpec::parse(b"*<;>V1"), AddrSpec::All);
        assert_eq!(AddrSpec::parse(b"L3<;>"), AddrSpec::Loco(b'L', 3));
        assert_eq!(AddrSpec::parse(b"S12"), AddrSpec::Loco(b'S', 12));
        assert_eq!(AddrSpec::parse(b"X3"), AddrSpec::Invalid);
        assert_eq!(AddrSpec::parse(b""), AddrSpec::Invalid);
    }

    #[test]
    fn action_after_separator() {
        assert_eq!(action_of(b"MTAS3<;>V10"), b"V10");
        assert_eq!(action_of(b"MTAS3<;>"), b"");
        assert_eq!(action_of(b"MTAS3"), b"");
    }

    #[test]
    fn line_buffer_splits_long_input() {
        let mut buf = LineBuffer::new();
        let mut lines = 0;
        for _ in 0..LINE_BUFFER_SIZE - 2 {
            assert!(buf.push(b'x').is_none());
        }
        if let Some(line) = buf.push(b'x') {
            assert_eq!(line.len(), LINE_BUFFER_SIZE - 1);
            lines += 1;
        }
        assert_eq!(lines, 1);
        assert!(buf.pending().is_empty());
    }

    #[test]
    fn trailing_crlf_ignored() {
        let mut p = protocol_with(&[]);
        assert_eq!(reply(&mut p, "PPA1\r\n"), "PPA1\n");
        assert_eq!(reply(&mut p, "PPA0\n"), "PPA0\n");
        assert!(!p.track_power());
    }

    #[test]
    fn unknown_verbs_ignored() {
        let mut p = protocol_with(&[1]);
        assert_eq!(reply(&mut p, "Zfoo"), "");
        assert_eq!(reply(&mut p, "HX"), "");
        assert_eq!(reply(&mut p, "PXA1"), "");
        assert_eq!(reply(&mut p, "M"), "");
        assert_eq!(reply(&mut p, "MTAS1<;>Z"), "");
        assert_eq!(reply(&mut p, ""), "");
    }

    #[test]
    fn speed_clamped() {
        let mut p = protocol_with(&[2]);
        assert_eq!(reply(&mut p, "MTAS2<;>V999"), "MTAS2<;>V126\n");
    }

    #[test]
    fn function_index_out_of_range_ignored() {
        let mut p = protocol_with(&[2]);
        assert_eq!(reply(&mut p, "MTAS2<;>F128"), "");
        assert_eq!(p.registry().find_by_address(2).unwrap().state.function_mask, 0);
    }

    #[test]
    fn power_listener_notified() {
        use alloc::sync::Arc;
        use core::sync::atomic::{AtomicU8, Ordering};

        let calls = Arc::new(AtomicU8::new(0));
        let seen = calls.clone();
        let mut p = protocol_with(&[]);
        p.set_power_listener(Box::new(move |on| {
            if on {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));
        reply(&mut p, "PPA1");
        reply(&mut p, "PPA0");
        reply(&mut p, "PPA1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
