//! Infrared command encoding for the three toy-train remote families.
//!
//! Three receiver families share one 38 kHz carrier but differ in framing:
//!
//! | Family | Channels | Frame | Repeat handling |
//! |--------|----------|-------|-----------------|
//! | [`Family::AB`] | A, B | two 8-bit halves of a table code, 35 slots | toggle bit |
//! | [`Family::CD`] | C, D | one 8-bit command sent twice, 35 slots | toggle bit |
//! | [`Family::GH`] | G, H | 14-bit payload with complement check, 29 slots | timed repeats |
//!
//! - `codes`: constant channel tables for the AB family
//! - `pulse`: frame builders and decoders (pure functions)
//! - `encoder`: [`IrEncoder`], the stateful send/repeat scheduler

pub mod codes;
pub mod encoder;
pub mod pulse;

pub use codes::{ChannelSet, CodeSet, IrCode, CHANNEL_A, CHANNEL_B};
pub use encoder::{EncoderState, IrEncoder, RepeatState, ToggleState};
pub use pulse::PulseSequence;

/// Protocol family a [`LocoAddress`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    /// Channels A/B: table-driven 16-bit codes with toggle alternation.
    AB,
    /// Channels C/D: function and fixed address nibble in one byte.
    CD,
    /// Channels G/H: speed/function payload with repeat scheduling.
    GH,
}

/// Receiver channel selected on the handset.
///
/// The discriminant is the numeric loco address used by the throttle
/// protocol and the loco registry.
///
/// # Example
///
/// ```
/// use ir_trainz::ir::{Family, LocoAddress};
///
/// assert_eq!(LocoAddress::from_channel("C"), Some(LocoAddress::C));
/// assert_eq!(LocoAddress::from_number(7), Some(LocoAddress::G));
/// assert_eq!(LocoAddress::G.family(), Some(Family::GH));
/// assert_eq!(LocoAddress::I.family(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LocoAddress {
    /// Channel A.
    A = 0x1,
    /// Channel B.
    B = 0x2,
    /// Channel C.
    C = 0x3,
    /// Channel D.
    D = 0x4,
    /// Channel G.
    G = 0x7,
    /// Channel H.
    H = 0x8,
    /// Channel I (no encoder family).
    I = 0x9,
    /// Channel J (no encoder family).
    J = 0xa,
}

impl LocoAddress {
    /// Every channel, in address order.
    pub const ALL: [LocoAddress; 8] = [
        LocoAddress::A,
        LocoAddress::B,
        LocoAddress::C,
        LocoAddress::D,
        LocoAddress::G,
        LocoAddress::H,
        LocoAddress::I,
        LocoAddress::J,
    ];

    /// Numeric address (1..=10).
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Look up a channel by numeric address.
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            0x1 => Some(LocoAddress::A),
            0x2 => Some(LocoAddress::B),
            0x3 => Some(LocoAddress::C),
            0x4 => Some(LocoAddress::D),
            0x7 => Some(LocoAddress::G),
            0x8 => Some(LocoAddress::H),
            0x9 => Some(LocoAddress::I),
            0xa => Some(LocoAddress::J),
            _ => None,
        }
    }

    /// Look up a channel by its exact upper-case letter.
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "A" => Some(LocoAddress::A),
            "B" => Some(LocoAddress::B),
            "C" => Some(LocoAddress::C),
            "D" => Some(LocoAddress::D),
            "G" => Some(LocoAddress::G),
            "H" => Some(LocoAddress::H),
            "I" => Some(LocoAddress::I),
            "J" => Some(LocoAddress::J),
            _ => None,
        }
    }

    /// Channel letter.
    pub const fn channel(self) -> char {
        match self {
            LocoAddress::A => 'A',
            LocoAddress::B => 'B',
            LocoAddress::C => 'C',
            LocoAddress::D => 'D',
            LocoAddress::G => 'G',
            LocoAddress::H => 'H',
            LocoAddress::I => 'I',
            LocoAddress::J => 'J',
        }
    }

    /// Encoder family, or `None` for channels no encoder can drive.
    pub const fn family(self) -> Option<Family> {
        match self {
            LocoAddress::A | LocoAddress::B => Some(Family::AB),
            LocoAddress::C | LocoAddress::D => Some(Family::CD),
            LocoAddress::G | LocoAddress::H => Some(Family::GH),
            LocoAddress::I | LocoAddress::J => None,
        }
    }
}

/// Discrete handset functions.
///
/// The raw value is the low nibble of a command byte. Several sound
/// names share a value because different loco models assign different
/// samples to the same button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum IrFunction {
    /// Stop.
    Stop = 0,
    /// Drive backward one step.
    Backward = 1,
    /// Drive forward one step.
    Forward = 2,
    /// First sound button.
    Sound1 = 3,
    /// Second sound button.
    Sound2 = 4,
    /// Third sound button.
    Sound3 = 5,
    /// Headlight toggle.
    Light = 6,
}

impl IrFunction {
    /// Door-close sound (alias of [`Sound1`](Self::Sound1)).
    pub const SOUND_DOOR_CLOSE: Self = Self::Sound1;
    /// Coupler sound (alias of [`Sound1`](Self::Sound1)).
    pub const SOUND_COUPLER: Self = Self::Sound1;
    /// Horn (alias of [`Sound2`](Self::Sound2)).
    pub const SOUND_HORN: Self = Self::Sound2;
    /// Motor sound (alias of [`Sound3`](Self::Sound3)).
    pub const SOUND_MOTOR: Self = Self::Sound3;
    /// Station announcement (alias of [`Sound3`](Self::Sound3)).
    pub const SOUND_ANNOUNCEMENT: Self = Self::Sound3;

    /// Raw command nibble.
    #[inline]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Parse a raw command nibble.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(IrFunction::Stop),
            1 => Some(IrFunction::Backward),
            2 => Some(IrFunction::Forward),
            3 => Some(IrFunction::Sound1),
            4 => Some(IrFunction::Sound2),
            5 => Some(IrFunction::Sound3),
            6 => Some(IrFunction::Light),
            _ => None,
        }
    }
}

impl From<IrFunction> for u8 {
    fn from(function: IrFunction) -> Self {
        function.raw()
    }
}

/// GH-family speed codes, carried in the high nibble of a command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SpeedCode {
    /// Forward, step 1.
    Forward1 = 0x10,
    /// Forward, step 2.
    Forward2 = 0x20,
    /// Forward, step 3.
    Forward3 = 0x30,
    /// Backward, step 1.
    Backward1 = 0x40,
    /// Backward, step 2.
    Backward2 = 0x50,
    /// Backward, step 3.
    Backward3 = 0x60,
    /// Stopped.
    Stop = 0x70,
}

impl SpeedCode {
    /// Map a signed speed step to a code. Anything outside `-3..=3` stops.
    ///
    /// ```
    /// use ir_trainz::ir::SpeedCode;
    ///
    /// assert_eq!(SpeedCode::from_step(3), SpeedCode::Forward3);
    /// assert_eq!(SpeedCode::from_step(-1), SpeedCode::Backward1);
    /// assert_eq!(SpeedCode::from_step(9), SpeedCode::Stop);
    /// ```
    pub const fn from_step(step: i32) -> Self {
        match step {
            1 => SpeedCode::Forward1,
            2 => SpeedCode::Forward2,
            3 => SpeedCode::Forward3,
            -1 => SpeedCode::Backward1,
            -2 => SpeedCode::Backward2,
            -3 => SpeedCode::Backward3,
            _ => SpeedCode::Stop,
        }
    }

    /// Raw command byte (function nibble clear).
    #[inline]
    pub const fn raw(self) -> u8 {
        self as u8
    }
}

impl From<SpeedCode> for u8 {
    fn from(code: SpeedCode) -> Self {
        code.raw()
    }
}
