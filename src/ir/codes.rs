//! Constant code tables for the AB family.
//!
//! Each entry holds the primary code and its toggle-bit variant. A code
//! is the command byte `function << 4 | address` sent in both halves of
//! the frame; the variant has bit 7 of each half set.

use super::IrFunction;

/// A 16-bit AB-family code (high byte sent first).
pub type IrCode = u16;

/// The two alternative codes for one function on one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeSet {
    /// `codes[0]` is sent while the toggle bit is clear, `codes[1]` while set.
    pub codes: [IrCode; 2],
}

impl CodeSet {
    /// Code for the given toggle bit.
    #[inline]
    pub const fn select(&self, toggle: bool) -> IrCode {
        self.codes[toggle as usize]
    }
}

/// Function-to-codes table for one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSet {
    /// Stop.
    pub stop: CodeSet,
    /// Backward step.
    pub backward: CodeSet,
    /// Forward step.
    pub forward: CodeSet,
    /// Headlight.
    pub light: CodeSet,
    /// Sound 1 (door close / coupler).
    pub sound1: CodeSet,
    /// Sound 2 (horn).
    pub sound2: CodeSet,
    /// Sound 3 (motor / announcement).
    pub sound3: CodeSet,
}

impl ChannelSet {
    /// Codes for `function`.
    pub const fn lookup(&self, function: IrFunction) -> &CodeSet {
        match function {
            IrFunction::Stop => &self.stop,
            IrFunction::Backward => &self.backward,
            IrFunction::Forward => &self.forward,
            IrFunction::Light => &self.light,
            IrFunction::Sound1 => &self.sound1,
            IrFunction::Sound2 => &self.sound2,
            IrFunction::Sound3 => &self.sound3,
        }
    }
}

/// Channel A.
pub const CHANNEL_A: ChannelSet = ChannelSet {
    stop: CodeSet { codes: [0x0101, 0x8181] },
    backward: CodeSet { codes: [0x1111, 0x9191] },
    forward: CodeSet { codes: [0x2121, 0xa1a1] },
    light: CodeSet { codes: [0x6161, 0xe1e1] },
    sound1: CodeSet { codes: [0x3131, 0xb1b1] },
    sound2: CodeSet { codes: [0x4141, 0xc1c1] },
    sound3: CodeSet { codes: [0x5151, 0xd1d1] },
};

/// Channel B.
pub const CHANNEL_B: ChannelSet = ChannelSet {
    stop: CodeSet { codes: [0x0202, 0x8282] },
    backward: CodeSet { codes: [0x1212, 0x9292] },
    forward: CodeSet { codes: [0x2222, 0xa2a2] },
    light: CodeSet { codes: [0x6262, 0xe2e2] },
    sound1: CodeSet { codes: [0x3232, 0xb2b2] },
    sound2: CodeSet { codes: [0x4242, 0xc2c2] },
    sound3: CodeSet { codes: [0x5252, 0xd2d2] },
};
