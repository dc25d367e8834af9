//! Stateful IR encoder with toggle alternation and GH repeat scheduling.
//!
//! The encoder owns the transmitter and a blocking delay. All timing
//! state is explicit in [`EncoderState`]; call [`IrEncoder::update`]
//! from the main loop so queued GH repeats go out on time.

use tracing::{debug, trace};

use super::codes::{CHANNEL_A, CHANNEL_B};
use super::pulse::{ab_frame, cd_frame, gh_frame, gh_payload, PulseSequence};
use super::{Family, IrFunction, LocoAddress, SpeedCode};
use crate::traits::{elapsed_ms, DelayNs, PulseTransmitter, IR_CARRIER_HZ};

/// Settle time after every frame.
pub const SETTLE_MS: u32 = 10;
/// Extra gap after an AB/CD frame.
pub const INTER_COMMAND_GAP_MS: u32 = 200;
/// Repeats queued after a GH function press.
pub const BURST_REPEATS: u8 = 3;
/// Interval between burst repeats.
pub const BURST_INTERVAL_MS: u32 = 20;
/// Repeats queued after a plain GH drive command.
pub const KEEPALIVE_REPEATS: u8 = 10;
/// Interval between keep-alive repeats.
pub const KEEPALIVE_INTERVAL_MS: u32 = 200;
/// Drive-only repeats queued once a burst has finished.
pub const TRAILING_REPEATS: u8 = 2;

/// Toggle bit bookkeeping for AB/CD.
///
/// The bit resets whenever the (address, command) pair changes and flips
/// after every frame actually sent, so a receiver sees a repeated press
/// as a new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToggleState {
    last: Option<(LocoAddress, u8)>,
    toggle: bool,
}

impl ToggleState {
    /// Toggle bit to use for `command` on `address`.
    pub fn select(&mut self, address: LocoAddress, command: u8) -> bool {
        if self.last != Some((address, command)) {
            self.last = Some((address, command));
            self.toggle = false;
        }
        self.toggle
    }

    /// Flip after a successful send.
    pub fn flip(&mut self) {
        self.toggle = !self.toggle;
    }

    /// Current toggle bit.
    pub fn toggle(&self) -> bool {
        self.toggle
    }
}

/// Pending GH repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatState {
    /// Address the repeats belong to.
    pub address: Option<LocoAddress>,
    /// Raw GH byte being repeated.
    pub command: u8,
    /// Repeats still to send.
    pub count: u8,
    /// Spacing between repeats.
    pub interval_ms: u32,
    /// Time of the last frame for this address.
    pub last_fire_ms: u32,
}

impl Default for RepeatState {
    fn default() -> Self {
        Self {
            address: None,
            command: SpeedCode::Stop.raw(),
            count: 0,
            interval_ms: KEEPALIVE_INTERVAL_MS,
            last_fire_ms: 0,
        }
    }
}

impl RepeatState {
    /// True while repeats are queued.
    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    fn arm(&mut self, address: LocoAddress, command: u8, now_ms: u32) {
        let (count, interval_ms) = if command & 0x0f != 0 {
            (BURST_REPEATS, BURST_INTERVAL_MS)
        } else {
            (KEEPALIVE_REPEATS, KEEPALIVE_INTERVAL_MS)
        };
        *self = Self {
            address: Some(address),
            command,
            count,
            interval_ms,
            last_fire_ms: now_ms,
        };
    }
}

/// Everything the encoder remembers between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderState {
    /// AB/CD toggle bit.
    pub toggle: ToggleState,
    /// GH repeat queue.
    pub repeat: RepeatState,
    /// Last GH byte per address, `[G, H]`.
    pub gh_last: [u8; 2],
    /// Latest time passed to [`IrEncoder::update`].
    pub now_ms: u32,
}

impl Default for EncoderState {
    fn default() -> Self {
        Self {
            toggle: ToggleState::default(),
            repeat: RepeatState::default(),
            gh_last: [SpeedCode::Stop.raw(); 2],
            now_ms: 0,
        }
    }
}

impl EncoderState {
    /// Last GH byte sent to `address` (Stop until something was sent).
    pub fn gh_last(&self, address: LocoAddress) -> Option<u8> {
        gh_slot(address).map(|slot| self.gh_last[slot])
    }
}

fn gh_slot(address: LocoAddress) -> Option<usize> {
    match address {
        LocoAddress::G => Some(0),
        LocoAddress::H => Some(1),
        _ => None,
    }
}

/// Validate a raw GH byte and pack its semantic bits.
///
/// Returns `(semantic, normalized)` where `normalized` has a zero speed
/// nibble replaced by Stop.
fn gh_semantic(address: LocoAddress, raw: u8) -> Option<(u8, u8)> {
    let channel_bit = match address {
        LocoAddress::G => 0,
        LocoAddress::H => 1 << 6,
        _ => return None,
    };
    let mut speed = raw >> 4;
    if speed == 0 {
        speed = SpeedCode::Stop.raw() >> 4;
    }
    if speed > 7 {
        return None;
    }
    let function = match IrFunction::from_raw(raw & 0x0f) {
        Some(IrFunction::Stop) => 0,
        Some(IrFunction::Sound1) => 1,
        Some(IrFunction::Sound3) => 2,
        Some(IrFunction::Sound2) => 3,
        Some(IrFunction::Light) => 4,
        _ => return None,
    };
    let semantic = channel_bit | (speed << 3) | function;
    Some((semantic, (speed << 4) | (raw & 0x0f)))
}

/// Encodes commands into pulse trains and drives a [`PulseTransmitter`].
///
/// # Example
///
/// ```
/// use ir_trainz::hal::{MockDelay, MockTransmitter};
/// use ir_trainz::ir::{IrEncoder, IrFunction, LocoAddress};
///
/// let mut encoder = IrEncoder::new(MockTransmitter::new(), MockDelay::new());
/// encoder.send(LocoAddress::A, IrFunction::Forward.raw()).unwrap();
///
/// assert_eq!(encoder.transmitter().frames.len(), 1);
/// assert_eq!(encoder.delay().delays_ms, vec![10, 200]);
/// ```
pub struct IrEncoder<T, D> {
    transmitter: T,
    delay: D,
    state: EncoderState,
    carrier_hz: u32,
}

impl<T, D> IrEncoder<T, D>
where
    T: PulseTransmitter,
    D: DelayNs,
{
    /// Create an encoder with fresh state.
    pub fn new(transmitter: T, delay: D) -> Self {
        Self {
            transmitter,
            delay,
            state: EncoderState::default(),
            carrier_hz: IR_CARRIER_HZ,
        }
    }

    /// Builder: transmit on `hz` instead of the 38 kHz default.
    pub fn with_carrier(mut self, hz: u32) -> Self {
        self.carrier_hz = hz;
        self
    }

    /// Carrier frequency frames are sent on.
    pub fn carrier_hz(&self) -> u32 {
        self.carrier_hz
    }

    /// Encoder state.
    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// The underlying transmitter.
    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    /// Mutable access to the transmitter.
    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.transmitter
    }

    /// The settle delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Mutable access to the delay provider.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Consume the encoder, returning its parts.
    pub fn into_parts(self) -> (T, D) {
        (self.transmitter, self.delay)
    }

    /// Send one raw command byte to `address`.
    ///
    /// For AB/CD the byte is a function value (0..=6). For GH it is a
    /// speed code in the high nibble combined with a function in the low
    /// nibble; a GH send also queues repeats. Unknown addresses or
    /// invalid bytes send nothing and return `Ok`.
    pub fn send(&mut self, address: LocoAddress, command: u8) -> Result<(), T::Error> {
        match address.family() {
            Some(Family::AB) => self.send_ab(address, command),
            Some(Family::CD) => self.send_cd(address, command),
            Some(Family::GH) => {
                if let Some(normalized) = self.transmit_gh(address, command)? {
                    let now = self.state.now_ms;
                    self.state.repeat.arm(address, normalized, now);
                }
                Ok(())
            }
            None => {
                trace!(channel = %address.channel(), "no IR family, dropping command");
                Ok(())
            }
        }
    }

    /// Drive `address` at a signed speed step in `-3..=3`.
    ///
    /// Out-of-range values are treated as 0. AB/CD receivers only know
    /// single steps, so the encoder sends Stop followed by `|speed|`
    /// Forward or Backward commands.
    pub fn set_speed(&mut self, address: LocoAddress, speed: i32) -> Result<(), T::Error> {
        let speed = if (-3..=3).contains(&speed) { speed } else { 0 };
        match address.family() {
            Some(Family::AB) | Some(Family::CD) => {
                self.send(address, IrFunction::Stop.raw())?;
                let step = if speed > 0 {
                    IrFunction::Forward
                } else {
                    IrFunction::Backward
                };
                for _ in 0..speed.unsigned_abs() {
                    self.send(address, step.raw())?;
                }
                Ok(())
            }
            Some(Family::GH) => {
                self.drain_burst(address)?;
                self.send(address, SpeedCode::from_step(speed).raw())
            }
            None => Ok(()),
        }
    }

    /// Trigger a sound or the headlight on `address`.
    ///
    /// GH keeps the current speed nibble and starts a new repeat burst.
    pub fn toggle_sound_light(
        &mut self,
        address: LocoAddress,
        function: IrFunction,
    ) -> Result<(), T::Error> {
        match gh_slot(address) {
            Some(slot) => {
                let command = (self.state.gh_last[slot] & 0xf0) | function.raw();
                self.send(address, command)
            }
            None => self.send(address, function.raw()),
        }
    }

    /// Advance time and emit a queued GH repeat if one is due.
    pub fn update(&mut self, now_ms: u32) -> Result<(), T::Error> {
        self.state.now_ms = now_ms;
        let repeat = self.state.repeat;
        let Some(address) = repeat.address else {
            return Ok(());
        };
        if repeat.count == 0 || elapsed_ms(now_ms, repeat.last_fire_ms) < repeat.interval_ms {
            return Ok(());
        }

        self.transmit_gh(address, repeat.command)?;

        let repeat = &mut self.state.repeat;
        repeat.count -= 1;
        repeat.last_fire_ms = now_ms;
        if repeat.count == 0 && repeat.command & 0x0f != 0 {
            let drive = repeat.command & 0xf0;
            repeat.command = drive;
            repeat.count = TRAILING_REPEATS;
            repeat.interval_ms = BURST_INTERVAL_MS;
            if let Some(slot) = gh_slot(address) {
                self.state.gh_last[slot] = drive;
            }
            debug!(channel = %address.channel(), command = drive, "burst done, trailing drive repeats");
        }
        Ok(())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn send_ab(&mut self, address: LocoAddress, command: u8) -> Result<(), T::Error> {
        let Some(function) = IrFunction::from_raw(command) else {
            trace!(command, "invalid AB function");
            return Ok(());
        };
        let table = match address {
            LocoAddress::A => &CHANNEL_A,
            _ => &CHANNEL_B,
        };
        let toggle = self.state.toggle.select(address, command);
        let code = table.lookup(function).select(toggle);
        debug!(channel = %address.channel(), code, toggle, "AB frame");
        self.emit(&ab_frame(code), INTER_COMMAND_GAP_MS)?;
        self.state.toggle.flip();
        Ok(())
    }

    fn send_cd(&mut self, address: LocoAddress, command: u8) -> Result<(), T::Error> {
        if IrFunction::from_raw(command).is_none() {
            trace!(command, "invalid CD function");
            return Ok(());
        }
        let nibble = match address {
            LocoAddress::C => 0x5,
            _ => 0xa,
        };
        let toggle = self.state.toggle.select(address, command);
        let byte = ((command & 0x7) << 4) | nibble | if toggle { 0x80 } else { 0 };
        debug!(channel = %address.channel(), byte, toggle, "CD frame");
        self.emit(&cd_frame(byte), INTER_COMMAND_GAP_MS)?;
        self.state.toggle.flip();
        Ok(())
    }

    /// Transmit a GH byte without touching the repeat queue.
    ///
    /// Returns the normalized byte, or `None` if it was rejected.
    fn transmit_gh(&mut self, address: LocoAddress, command: u8) -> Result<Option<u8>, T::Error> {
        let Some((semantic, normalized)) = gh_semantic(address, command) else {
            trace!(command, "invalid GH command");
            return Ok(None);
        };
        debug!(channel = %address.channel(), command = normalized, semantic, "GH frame");
        self.emit(&gh_frame(gh_payload(semantic)), 0)?;
        if let Some(slot) = gh_slot(address) {
            self.state.gh_last[slot] = normalized;
        }
        Ok(Some(normalized))
    }

    /// Flush a pending function burst so a speed change cannot cut it short.
    fn drain_burst(&mut self, address: LocoAddress) -> Result<(), T::Error> {
        let repeat = self.state.repeat;
        if repeat.address != Some(address)
            || repeat.interval_ms != BURST_INTERVAL_MS
            || repeat.count == 0
        {
            return Ok(());
        }
        for _ in 0..repeat.count {
            self.delay.delay_ms(BURST_INTERVAL_MS);
            self.transmit_gh(address, repeat.command)?;
        }
        self.state.repeat.count = 0;
        Ok(())
    }

    fn emit(&mut self, frame: &PulseSequence, extra_gap_ms: u32) -> Result<(), T::Error> {
        self.transmitter.transmit(frame, self.carrier_hz)?;
        self.delay.delay_ms(SETTLE_MS);
        if extra_gap_ms > 0 {
            self.delay.delay_ms(extra_gap_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDelay, MockTransmitter};
    use crate::ir::pulse::{decode_ab_frame, decode_cd_frame, decode_gh_frame};

    fn encoder() -> IrEncoder<MockTransmitter, MockDelay> {
        IrEncoder::new(MockTransmitter::new(), MockDelay::new())
    }

    fn gh_semantic_of(frame: &[u16]) -> u8 {
        (decode_gh_frame(frame).unwrap() >> 7) as u8
    }

    #[test]
    fn toggle_alternates_on_repeat_and_resets_on_change() {
        let mut enc = encoder();
        enc.send(LocoAddress::A, IrFunction::Forward.raw()).unwrap();
        enc.send(LocoAddress::A, IrFunction::Forward.raw()).unwrap();
        enc.send(LocoAddress::A, IrFunction::Light.raw()).unwrap();

        let codes: Vec<u16> = enc
            .transmitter()
            .frames
            .iter()
            .map(|f| decode_ab_frame(f).unwrap())
            .collect();
        assert_eq!(codes, vec![0x2121, 0xa1a1, 0x6161]);
    }

    #[test]
    fn frames_use_configured_carrier() {
        let mut enc = encoder();
        assert_eq!(enc.carrier_hz(), IR_CARRIER_HZ);
        enc.send(LocoAddress::A, IrFunction::Stop.raw()).unwrap();

        let mut enc = enc.with_carrier(36_000);
        enc.toggle_sound_light(LocoAddress::G, IrFunction::Light).unwrap();
        assert_eq!(enc.transmitter().carriers, vec![IR_CARRIER_HZ, 36_000]);
    }

    #[test]
    fn cd_byte_layout() {
        let mut enc = encoder();
        enc.send(LocoAddress::D, IrFunction::Sound2.raw()).unwrap();
        enc.send(LocoAddress::D, IrFunction::Sound2.raw()).unwrap();
        let frames = &enc.transmitter().frames;
        assert_eq!(decode_cd_frame(&frames[0]), Some(0x4a));
        assert_eq!(decode_cd_frame(&frames[1]), Some(0xca));
    }

    #[test]
    fn invalid_function_sends_nothing() {
        let mut enc = encoder();
        enc.send(LocoAddress::B, 9).unwrap();
        enc.send(LocoAddress::I, 0).unwrap();
        enc.send(LocoAddress::G, 0x82).unwrap();
        assert!(enc.transmitter().frames.is_empty());
        assert!(enc.delay().delays_ms.is_empty());
    }

    #[test]
    fn ab_speed_is_stop_then_steps() {
        let mut enc = encoder();
        enc.set_speed(LocoAddress::B, -2).unwrap();
        let codes: Vec<u16> = enc
            .transmitter()
            .frames
            .iter()
            .map(|f| decode_ab_frame(f).unwrap())
            .collect();
        assert_eq!(codes, vec![0x0202, 0x1212, 0x9292]);
    }

    #[test]
    fn out_of_range_speed_stops() {
        let mut enc = encoder();
        enc.set_speed(LocoAddress::C, 7).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 1);
        assert_eq!(decode_cd_frame(&enc.transmitter().frames[0]), Some(0x05));
    }

    #[test]
    fn gh_speed_arms_keepalive() {
        let mut enc = encoder();
        enc.update(1_000).unwrap();
        enc.set_speed(LocoAddress::H, 2).unwrap();

        let semantic = gh_semantic_of(&enc.transmitter().frames[0]);
        assert_eq!(semantic, 0x40 | (2 << 3));
        let repeat = enc.state().repeat;
        assert_eq!(repeat.count, KEEPALIVE_REPEATS);
        assert_eq!(repeat.interval_ms, KEEPALIVE_INTERVAL_MS);
        assert_eq!(repeat.last_fire_ms, 1_000);
        assert_eq!(enc.delay().delays_ms, vec![SETTLE_MS]);
    }

    #[test]
    fn gh_zero_speed_nibble_means_stop() {
        let mut enc = encoder();
        enc.send(LocoAddress::G, IrFunction::Light.raw()).unwrap();
        assert_eq!(gh_semantic_of(&enc.transmitter().frames[0]), (7 << 3) | 4);
        assert_eq!(enc.state().gh_last(LocoAddress::G), Some(0x76));
    }

    #[test]
    fn burst_then_trailing_drive() {
        let mut enc = encoder();
        enc.set_speed(LocoAddress::G, 1).unwrap();
        enc.toggle_sound_light(LocoAddress::G, IrFunction::SOUND_HORN)
            .unwrap();
        assert_eq!(enc.state().repeat.count, BURST_REPEATS);

        // not yet due
        enc.update(19).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 2);

        for now in [20, 40, 60] {
            enc.update(now).unwrap();
        }
        assert_eq!(enc.transmitter().frames.len(), 5);
        for frame in &enc.transmitter().frames[1..5] {
            assert_eq!(gh_semantic_of(frame), (1 << 3) | 3);
        }

        let repeat = enc.state().repeat;
        assert_eq!(repeat.command, 0x10);
        assert_eq!(repeat.count, TRAILING_REPEATS);
        assert_eq!(enc.state().gh_last(LocoAddress::G), Some(0x10));

        enc.update(80).unwrap();
        enc.update(100).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 7);
        assert_eq!(gh_semantic_of(&enc.transmitter().frames[6]), 1 << 3);
        assert!(!enc.state().repeat.is_active());

        enc.update(1_000).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 7);
    }

    #[test]
    fn speed_change_drains_pending_burst() {
        let mut enc = encoder();
        enc.toggle_sound_light(LocoAddress::H, IrFunction::Light)
            .unwrap();
        enc.set_speed(LocoAddress::H, -1).unwrap();

        // press + 3 drained repeats + new speed
        let frames = &enc.transmitter().frames;
        assert_eq!(frames.len(), 5);
        assert_eq!(gh_semantic_of(&frames[3]), 0x40 | (7 << 3) | 4);
        assert_eq!(gh_semantic_of(&frames[4]), 0x40 | (4 << 3));
        assert_eq!(
            enc.delay().delays_ms,
            vec![10, 20, 10, 20, 10, 20, 10, 10]
        );
        assert_eq!(enc.state().repeat.count, KEEPALIVE_REPEATS);
    }

    #[test]
    fn repeats_survive_clock_wrap() {
        let mut enc = encoder();
        enc.update(u32::MAX - 100).unwrap();
        enc.set_speed(LocoAddress::G, 3).unwrap();
        enc.update(u32::MAX - 1).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 1);
        enc.update(100).unwrap();
        assert_eq!(enc.transmitter().frames.len(), 2);
    }
}
